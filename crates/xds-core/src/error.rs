//! # Error Types — Input Loading and Date Arithmetic
//!
//! All errors use `thiserror` for derive-based `Display` and `Error`
//! implementations. Each variant carries the offending path, text, or
//! pattern so the caller can report it without re-deriving context.

use thiserror::Error;

/// Error while turning an input source into a nested mapping.
#[derive(Error, Debug)]
pub enum LoadError {
    /// Neither the given path nor its directory-relative fallback exists.
    #[error("file not found: {file} (searched in {dir})")]
    NotFound {
        /// The requested file.
        file: String,
        /// The fallback directory, or `(none)`.
        dir: String,
    },

    /// The file extension is not one of `.yaml`, `.yml`, `.json`.
    #[error("unsupported file format: {path}")]
    UnsupportedFormat {
        /// Path of the rejected file.
        path: String,
    },

    /// The content could not be parsed as YAML or JSON.
    #[error("parse error in {origin}: {reason}")]
    Parse {
        /// Where the content came from (path, `<content>`, `<url>`).
        origin: String,
        /// Parser message.
        reason: String,
    },

    /// The source parsed to nothing (empty file, `~`, empty query).
    #[error("no data returned from {origin}")]
    Empty {
        /// Where the content came from.
        origin: String,
    },

    /// The document root is a scalar or a sequence, not a mapping.
    #[error("expected a mapping at the root of {origin}, found {found}")]
    NotAMapping {
        /// Where the content came from.
        origin: String,
        /// The JSON type name that was found instead.
        found: &'static str,
    },

    /// IO error reading an input file.
    #[error("io error reading {path}: {source}")]
    Io {
        /// Path that failed to read.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Error while evaluating a date shortcut such as `3ME` or `-2B`.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DateShortcutError {
    /// The pattern uses a unit letter with no date meaning (e.g. a lone `B`).
    #[error("invalid date shortcut {pattern:?}: unknown unit {unit:?}")]
    UnknownUnit {
        /// The full pattern.
        pattern: String,
        /// The unit character that was rejected.
        unit: char,
    },

    /// Both month-start `S` and month-end `E` adjustments were requested.
    #[error("invalid date shortcut {pattern:?}: cannot specify both E and S")]
    ConflictingAdjust {
        /// The full pattern.
        pattern: String,
    },

    /// The period count does not fit, or the shifted date is out of range.
    #[error("date shortcut {pattern:?} is out of range")]
    OutOfRange {
        /// The full pattern.
        pattern: String,
    },
}
