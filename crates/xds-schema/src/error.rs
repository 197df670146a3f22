//! # Error Types — Grammar, Compile and Build Failures
//!
//! Every failure in this crate is fatal for the call that raised it and
//! is never retried here. The caller decides whether to fix the input
//! and try again.
//!
//! - [`GrammarError`]: a field spec string is malformed.
//! - [`CompileError`]: a blueprint cannot be compiled; grammar errors
//!   surface here with the offending field qualifier attached.
//! - [`BuildError`]: raw data does not fit its schema, or the schema's
//!   delegate misbehaves. No partial instance is ever returned.

use thiserror::Error;

/// Error parsing a field's modifier string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GrammarError {
    /// Two or more type-category keywords appeared in one spec.
    #[error("only one type allowed, given {keywords:?}")]
    MultipleTypes {
        /// The distinct type keywords found.
        keywords: Vec<String>,
    },

    /// A keyword that requires `=value` appeared bare.
    #[error("{keyword} must have a value")]
    MissingValue {
        /// The offending keyword.
        keyword: String,
    },

    /// A default or allow-list literal does not parse as the field type.
    #[error("{keyword}: cannot coerce {value:?} to {expected}")]
    InvalidLiteral {
        /// The keyword whose value failed to coerce.
        keyword: String,
        /// The literal that failed.
        value: String,
        /// Display name of the target type.
        expected: String,
    },
}

/// Error compiling a blueprint mapping into a schema node.
#[derive(Error, Debug)]
pub enum CompileError {
    /// The field's modifier string is malformed.
    #[error("field '{qualifier}': {source}")]
    Grammar {
        /// Dot-path of the field from the schema root.
        qualifier: String,
        /// The grammar failure.
        #[source]
        source: GrammarError,
    },

    /// A nested mapping has no `kind`; normalization did not run.
    #[error("field '{qualifier}': nested mapping has no kind")]
    MissingKind {
        /// Dot-path of the field holding the mapping.
        qualifier: String,
    },

    /// A `kind` entry is present but is not a string.
    #[error("field '{qualifier}': kind must be a string")]
    KindNotText {
        /// Dot-path of the mapping whose kind is malformed.
        qualifier: String,
    },

    /// An `xref` names a kind that has not been compiled yet.
    #[error("field '{qualifier}': xref target '{target}' has not been compiled")]
    UnresolvedReference {
        /// Dot-path of the referencing field.
        qualifier: String,
        /// The bare kind name that was looked up.
        target: String,
    },
}

/// Error building an instance from raw data.
#[derive(Error, Debug)]
pub enum BuildError {
    /// No schema was ever compiled for the data's kind.
    #[error("class {kind} not found, factory not initialized")]
    UnknownKind {
        /// The kind that was looked up.
        kind: String,
    },

    /// The data carries a key the schema does not declare.
    #[error("{kind}: unexpected field '{field}'")]
    UnexpectedField {
        /// Kind of the schema being structured.
        kind: String,
        /// Dot-path of the rejected key.
        field: String,
    },

    /// A value cannot be coerced to its field's declared type.
    #[error("field '{qualifier}': expected {expected}, found {found}")]
    InvalidValue {
        /// Dot-path of the field.
        qualifier: String,
        /// Display name of the declared type.
        expected: String,
        /// What was found instead.
        found: String,
    },

    /// A delegate attribute shadows a name the schema already declares.
    #[error("{attribute} is not allowed to be used in implementation of {kind}")]
    ReservedAttribute {
        /// Kind whose delegate produced the attribute.
        kind: String,
        /// The colliding attribute name.
        attribute: String,
    },

    /// The delegate failed to construct.
    #[error("delegate for {kind} failed: {source}")]
    Delegate {
        /// Kind whose delegate failed.
        kind: String,
        /// The delegate's own error.
        #[source]
        source: anyhow::Error,
    },
}
