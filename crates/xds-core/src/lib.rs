//! # xds-core — Foundational Utilities for xds
//!
//! Leaf crate of the workspace. Everything the schema compiler and the
//! namespace registry need from the outside world flows through here:
//!
//! - [`loader`]: turns a file path, inline YAML/JSON text, a URL query
//!   string, or an in-memory mapping into one ordered nested mapping.
//! - [`naming`]: derives the normalized `var` token and the human `alias`
//!   label for a schema key.
//! - [`temporal`]: ISO date recognition and the date-shortcut grammar
//!   (`T`, `-2B`, `3ME`, `1QE`, ...).
//!
//! ## Crate Policy
//!
//! - No dependencies on other `xds-*` crates (this is the leaf of the DAG).
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod loader;
pub mod naming;
pub mod temporal;

pub use error::{DateShortcutError, LoadError};
pub use loader::{load, resolve_path, Mapping, Source};
pub use naming::xlate;
pub use temporal::{is_iso_date, parse_iso_date, shift_date, shift_today};
