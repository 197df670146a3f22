//! # xds-registry — Namespace Registry for xds
//!
//! Ties the loader and the schema compiler together behind one object:
//!
//! - [`config`]: where the bootstrap finds the environment blueprint and
//!   instance, overridable through `XDS_*` environment variables.
//! - [`registry`]: compiles and registers models at `models/<kind>`,
//!   builds and registers instances at `instances/<kind>/<id>`, and
//!   resolves paths with a unique-suffix fuzzy fallback.
//!
//! There is no process-wide singleton. Callers construct a [`Registry`]
//! (usually through [`Registry::bootstrap`]) and pass it where needed.
//!
//! ## Crate Policy
//!
//! - Depends on `xds-core` and `xds-schema` only.
//! - Lookups return `Option`; only loading, compiling and building fail.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod config;
pub mod error;
pub mod registry;

pub use config::RegistryConfig;
pub use error::RegistryError;
pub use registry::{Entry, Registry, INSTANCES, MODELS};
