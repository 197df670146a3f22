//! # Namespace Registry
//!
//! Owns a [`SchemaCompiler`] and a flat namespace of everything registered
//! through it:
//!
//! - `models/<kind>`: compiled root schemas.
//! - `instances/<kind>/<id>`: built instances. The id is the instance's
//!   `ns` field when it is text (or a date), else its `uid`.
//!
//! Paths are lowercased. Registering an instance writes its path back as
//! the instance's `nsid`.
//!
//! ## Lookup
//!
//! [`Registry::locate`] tries, in order: the exact path; for `models/…`
//! the kind segment against the model table; for `instances/…` the
//! `<kind>/<id>` pair against the instance table, then a fuzzy match on
//! the last segment alone. The fuzzy match is accepted only when exactly
//! one registered path ends with `/<last>`. A miss is `None`, never an
//! error.
//!
//! ## Bootstrap
//!
//! [`Registry::bootstrap`] compiles the environment blueprint, builds the
//! environment instance from the configuration directory, then compiles
//! every model the environment lists (`models`, comma-separated) from the
//! directory it names (`blueprints`).
//!
//! ## Concurrency
//!
//! The namespace sits behind a `parking_lot::RwLock` and everything handed
//! out is an `Arc`, so a registry can be shared across threads once built.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use xds_core::{load, resolve_path, Source};
use xds_schema::{Instance, SchemaCompiler, SchemaNode, Value};

use crate::config::RegistryConfig;
use crate::error::RegistryError;

/// Namespace prefix of compiled models.
pub const MODELS: &str = "models";

/// Namespace prefix of built instances.
pub const INSTANCES: &str = "instances";

/// Environment field listing the models to compile at bootstrap.
const ENV_MODELS: &str = "models";

/// Environment field naming the directory of those models.
const ENV_BLUEPRINTS: &str = "blueprints";

/// Instance field whose text value becomes the registration id.
const NS_FIELD: &str = "ns";

/// Something registered in the namespace.
#[derive(Debug, Clone)]
pub enum Entry {
    /// A compiled schema.
    Model(Arc<SchemaNode>),
    /// A built instance.
    Instance(Arc<Instance>),
}

impl Entry {
    /// The schema, if this is a model entry.
    pub fn as_model(&self) -> Option<&Arc<SchemaNode>> {
        match self {
            Self::Model(node) => Some(node),
            Self::Instance(_) => None,
        }
    }

    /// The instance, if this is an instance entry.
    pub fn as_instance(&self) -> Option<&Arc<Instance>> {
        match self {
            Self::Instance(inst) => Some(inst),
            Self::Model(_) => None,
        }
    }

    /// The kind of the model or instance.
    pub fn kind(&self) -> &str {
        match self {
            Self::Model(node) => node.kind(),
            Self::Instance(inst) => inst.kind(),
        }
    }
}

#[derive(Debug, Default)]
struct Namespace {
    models: BTreeMap<String, Arc<SchemaNode>>,
    instances: BTreeMap<String, Arc<Instance>>,
    ns: BTreeMap<String, Entry>,
}

/// Compiled models and built instances, addressable by path.
#[derive(Debug)]
pub struct Registry {
    config: RegistryConfig,
    compiler: SchemaCompiler,
    namespace: RwLock<Namespace>,
    env: Option<Arc<Instance>>,
}

impl Registry {
    /// An empty registry. Nothing is compiled until asked.
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            compiler: SchemaCompiler::new(),
            namespace: RwLock::new(Namespace::default()),
            env: None,
        }
    }

    /// Build a registry and run the environment bootstrap.
    ///
    /// # Errors
    ///
    /// Fails if the environment blueprint, the environment instance, or
    /// any model it lists cannot be loaded, compiled or built, or if the
    /// environment lists models without naming a blueprint directory.
    pub fn bootstrap(config: RegistryConfig) -> Result<Self, RegistryError> {
        let mut registry = Self::new(config);
        let blueprints_dir = registry.config.blueprints_dir.clone();
        let env_model = registry.config.env_model.clone();
        registry.compile_model(&env_model, &blueprints_dir)?;

        let env_path = registry.config.env_path();
        tracing::info!(file = %env_path.display(), "booting environment");
        let env = registry.instance(Source::File(env_path))?;

        let models = listed_models(&env);
        if !models.is_empty() {
            let dir = blueprints_of(&env).ok_or_else(|| RegistryError::InvalidEnvironment {
                nsid: env.nsid().unwrap_or_default().to_string(),
                reason: format!("'{ENV_BLUEPRINTS}' must name the directory of {models:?}"),
            })?;
            for model in &models {
                tracing::info!(model = %model, "initializing model");
                registry.compile_model(model, &dir)?;
            }
        }
        registry.env = Some(env);
        Ok(registry)
    }

    /// The bootstrap configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// The compiler backing this registry. Attach delegates here.
    pub fn compiler(&self) -> &SchemaCompiler {
        &self.compiler
    }

    /// The environment instance, once bootstrapped.
    pub fn env(&self) -> Option<&Arc<Instance>> {
        self.env.as_ref()
    }

    // ─── Registration ────────────────────────────────────────────────

    /// Store a compiled node at `models/<kind>`. Returns the path.
    pub fn register_model(&self, node: Arc<SchemaNode>) -> String {
        let key = node.kind().to_lowercase();
        let path = format!("{MODELS}/{key}");
        let mut namespace = self.namespace.write();
        namespace.models.insert(key, Arc::clone(&node));
        namespace.ns.insert(path.clone(), Entry::Model(node));
        tracing::info!(nsid = %path, "initialized models namespace");
        path
    }

    /// Assign `instance` its path, store it at `instances/<kind>/<id>`,
    /// and return the shared handle. An instance already stored at that
    /// path is replaced.
    pub fn register_instance(&self, mut instance: Instance) -> Arc<Instance> {
        let id = match instance.get(NS_FIELD) {
            Some(Value::Str(ns)) => ns.clone(),
            Some(date @ Value::Date(_)) => date.to_string(),
            _ => instance.uid().to_string(),
        };
        let key = format!("{}/{}", instance.kind(), id).to_lowercase();
        let path = format!("{INSTANCES}/{key}");
        instance.set_nsid(path.clone());

        let instance = Arc::new(instance);
        let mut namespace = self.namespace.write();
        namespace.instances.insert(key, Arc::clone(&instance));
        let previous = namespace
            .ns
            .insert(path.clone(), Entry::Instance(Arc::clone(&instance)));
        if previous.is_some() {
            tracing::warn!(nsid = %path, "instance path reused, previous instance replaced");
        }
        tracing::info!(nsid = %path, "initialized instances namespace");
        instance
    }

    /// Load `<name>.yaml` from `dir`, compile it, and register it.
    pub fn compile_model(&self, name: &str, dir: &Path) -> Result<Arc<SchemaNode>, RegistryError> {
        let path = resolve_path(format!("{name}.yaml"), Some(dir))?;
        let data = load(Source::File(path))?;
        let node = self.compiler.compile_mapping(data)?;
        self.register_model(Arc::clone(&node));
        Ok(node)
    }

    /// Load, build and register an instance.
    ///
    /// A file source that does not exist as given is looked up in the
    /// configuration directory.
    pub fn instance(&self, source: Source) -> Result<Arc<Instance>, RegistryError> {
        let source = match source {
            Source::File(path) if !path.exists() => {
                let resolved = resolve_path(&path, Some(&self.config.config_dir))?;
                tracing::info!(file = %resolved.display(), "initializing from config directory");
                Source::File(resolved)
            }
            other => other,
        };
        let data = load(source)?;
        let instance = self.compiler.build(data)?;
        Ok(self.register_instance(instance))
    }

    // ─── Lookup ──────────────────────────────────────────────────────

    /// Resolve a namespace path. See the module docs for the fallback
    /// order.
    pub fn locate(&self, path: &str) -> Option<Entry> {
        let path = path.to_lowercase();
        let namespace = self.namespace.read();
        if let Some(entry) = namespace.ns.get(&path) {
            return Some(entry.clone());
        }

        let parts: Vec<&str> = path.split('/').collect();
        match parts.as_slice() {
            [MODELS, kind, ..] => namespace.models.get(*kind).cloned().map(Entry::Model),
            [INSTANCES, rest @ ..] => {
                if let [kind, id, ..] = rest {
                    if let Some(inst) = namespace.instances.get(&format!("{kind}/{id}")) {
                        return Some(Entry::Instance(Arc::clone(inst)));
                    }
                }
                let last = parts.last().filter(|s| !s.is_empty())?;
                let suffix = format!("/{last}");
                let mut found = namespace.ns.iter().filter(|(key, _)| key.ends_with(&suffix));
                match (found.next(), found.next()) {
                    (Some((key, entry)), None) => {
                        tracing::info!(found = %key, requested = %path, "fuzzy namespace match");
                        Some(entry.clone())
                    }
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Same as [`locate`](Self::locate).
    pub fn obj(&self, path: &str) -> Option<Entry> {
        self.locate(path)
    }

    /// The registered model for `kind`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::ModelNotFound`] listing every registered model.
    pub fn model(&self, kind: &str) -> Result<Arc<SchemaNode>, RegistryError> {
        self.locate(&format!("{MODELS}/{kind}"))
            .and_then(|entry| entry.as_model().cloned())
            .ok_or_else(|| RegistryError::ModelNotFound {
                kind: kind.to_string(),
                known: self.models(),
            })
    }

    /// Keys of every registered model, sorted.
    pub fn models(&self) -> Vec<String> {
        self.namespace.read().models.keys().cloned().collect()
    }

    /// Every registered path, sorted.
    pub fn paths(&self) -> Vec<String> {
        self.namespace.read().ns.keys().cloned().collect()
    }
}

/// Model names listed by the environment, as text or as a list.
fn listed_models(env: &Instance) -> Vec<String> {
    let names: Vec<String> = match env.get(ENV_MODELS) {
        Some(Value::Str(text)) => text.split(',').map(str::to_string).collect(),
        Some(Value::List(items)) => items.iter().map(Value::to_string).collect(),
        _ => Vec::new(),
    };
    names
        .into_iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

fn blueprints_of(env: &Instance) -> Option<PathBuf> {
    env.get(ENV_BLUEPRINTS)
        .and_then(Value::as_str)
        .filter(|dir| !dir.trim().is_empty())
        .map(PathBuf::from)
}
