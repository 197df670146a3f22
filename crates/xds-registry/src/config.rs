//! Registry bootstrap configuration.
//!
//! Names the fixed locations the bootstrap reads: the blueprint directory
//! holding the environment model, and the configuration directory holding
//! the environment instance file. Defaults match the standard layout;
//! override via environment variables or explicit construction for tests.

use std::path::PathBuf;

/// Default directory of the environment blueprint.
pub const DEFAULT_BLUEPRINTS_DIR: &str = "xds/catalogue/blueprints";

/// Default directory of instance configuration files.
pub const DEFAULT_CONFIG_DIR: &str = "xds/configs";

/// Default model name of the environment blueprint.
pub const DEFAULT_ENV_MODEL: &str = "env";

/// Default file name of the environment instance.
pub const DEFAULT_ENV_FILE: &str = "env.prod.yaml";

/// Locations read by [`Registry::bootstrap`](crate::Registry::bootstrap).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Directory holding `<env_model>.yaml`.
    pub blueprints_dir: PathBuf,
    /// Directory holding `env_file`, and the fallback directory for
    /// instance files that do not exist as given.
    pub config_dir: PathBuf,
    /// Name of the environment blueprint, without extension.
    pub env_model: String,
    /// File name of the environment instance inside `config_dir`.
    pub env_file: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            blueprints_dir: PathBuf::from(DEFAULT_BLUEPRINTS_DIR),
            config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
            env_model: DEFAULT_ENV_MODEL.to_string(),
            env_file: DEFAULT_ENV_FILE.to_string(),
        }
    }
}

impl RegistryConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `XDS_BLUEPRINTS_DIR` (default: `xds/catalogue/blueprints`)
    /// - `XDS_CONFIG_DIR` (default: `xds/configs`)
    /// - `XDS_ENV_MODEL` (default: `env`)
    /// - `XDS_ENV_FILE` (default: `env.prod.yaml`)
    pub fn from_env() -> Self {
        Self {
            blueprints_dir: PathBuf::from(env_or("XDS_BLUEPRINTS_DIR", DEFAULT_BLUEPRINTS_DIR)),
            config_dir: PathBuf::from(env_or("XDS_CONFIG_DIR", DEFAULT_CONFIG_DIR)),
            env_model: env_or("XDS_ENV_MODEL", DEFAULT_ENV_MODEL),
            env_file: env_or("XDS_ENV_FILE", DEFAULT_ENV_FILE),
        }
    }

    /// Configuration rooted at `root`, using the default relative layout
    /// below it.
    pub fn rooted(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            blueprints_dir: root.join(DEFAULT_BLUEPRINTS_DIR),
            config_dir: root.join(DEFAULT_CONFIG_DIR),
            ..Self::default()
        }
    }

    /// Full path of the environment instance file.
    pub fn env_path(&self) -> PathBuf {
        self.config_dir.join(&self.env_file)
    }
}

fn env_or(var: &str, default: &str) -> String {
    std::env::var(var)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}
