//! # Error Types — Registry Failures
//!
//! [`RegistryError`] wraps every failure a registry operation can surface:
//! loading input, compiling a blueprint, building an instance, a missing
//! model, or an environment instance that cannot drive the bootstrap.
//! Path lookups never fail; a miss is `None`.

use thiserror::Error;
use xds_core::LoadError;
use xds_schema::{BuildError, CompileError};

/// Error raised by the namespace registry.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Reading a blueprint or data file failed.
    #[error("load error: {0}")]
    Load(#[from] LoadError),

    /// A blueprint failed to compile.
    #[error("compile error: {0}")]
    Compile(#[from] CompileError),

    /// Instance data failed to build.
    #[error("build error: {0}")]
    Build(#[from] BuildError),

    /// `model(kind)` found nothing.
    #[error("class {kind} not found in registry, registered: {known:?}")]
    ModelNotFound {
        /// The kind that was requested.
        kind: String,
        /// Every registered model key, sorted.
        known: Vec<String>,
    },

    /// The environment instance lacks a setting the bootstrap needs.
    #[error("environment {nsid}: {reason}")]
    InvalidEnvironment {
        /// Namespace path of the environment instance.
        nsid: String,
        /// What is wrong with it.
        reason: String,
    },
}
