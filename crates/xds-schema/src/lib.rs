//! # xds-schema — Schema Compiler & Instance Builder
//!
//! Compiles declarative blueprints (nested mappings loaded from YAML/JSON)
//! into [`SchemaNode`]s at runtime, then builds and validates concrete
//! [`Instance`]s against them.
//!
//! ## Pipeline
//!
//! raw mapping → [`normalize`] (fill missing `kind` recursively) →
//! [`SchemaCompiler::compile`] → [`SchemaNode`] →
//! [`InstanceBuilder::build`] (raw data + node) → [`Instance`]
//!
//! ## Modifier Grammar (`modifier`)
//!
//! A textual field value such as `int=42#req#gt=45#lt=50` is a field spec:
//! `#`-delimited keywords, each bare or `keyword=value`. [`modifier::parse`]
//! turns it into a [`FieldSpec`] carrying the resolved [`FieldType`], a
//! coerced default, and every recognised keyword. Unknown keywords are
//! dropped silently.
//!
//! ## Closed-World Instances (`instance`)
//!
//! Instance data may only carry keys declared by its schema. Nested
//! mappings recurse into their nested schema, `YYYY-MM-DD` strings become
//! dates, and comma-separated strings become lists where the field is not
//! declared as a plain string. A schema may carry an externally supplied
//! [`Delegate`] whose public attributes are merged onto every instance.
//!
//! ## Crate Policy
//!
//! - Depends only on `xds-core` internally.
//! - Every failure is a typed error; nothing here panics on bad input.
//! - Compiled nodes are immutable and shared as `Arc<SchemaNode>`.

pub mod compiler;
pub mod constraint;
pub mod error;
pub mod instance;
pub mod modifier;
pub mod normalize;
pub mod value;

pub use compiler::{
    DeclaredType, FieldDefinition, FieldOutline, SchemaCompiler, SchemaNode, SchemaOutline,
    DEFAULT_UID, NSID_FIELD, UID_FIELD,
};
pub use constraint::{audit, compare, query, Operator, Query, ValidationViolations, Violation};
pub use error::{BuildError, CompileError, GrammarError};
pub use instance::{Delegate, DelegateObject, Instance, InstanceBuilder};
pub use modifier::{Category, FieldSpec, Modifier, ModifierValue};
pub use normalize::{kind_of, normalize, DYNAMIC_KIND, KIND_KEY};
pub use value::{FieldType, ScalarType, Value, ValueKind};
