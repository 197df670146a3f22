//! # Input Loader
//!
//! Turns any supported input into one ordered nested mapping of strings,
//! numbers, booleans, lists and mappings. The schema compiler and the
//! instance builder only ever see this shape.
//!
//! ## Sources
//!
//! - [`Source::File`]: `.yaml`/`.yml` via `serde_yaml`, `.json` via
//!   `serde_json`. Any other extension is rejected.
//! - [`Source::Content`]: inline text, tried as YAML first and as JSON
//!   when YAML fails.
//! - [`Source::Url`]: a URL (or bare query string) whose query parameters
//!   become the mapping. Dotted keys nest, comma-bearing values become
//!   lists of strings, and the first occurrence of a repeated key wins.
//! - [`Source::Data`]: an already-built mapping, passed through.
//!
//! YAML documents are converted into `serde_json` values with insertion
//! order preserved, so field order in a blueprint is field order in the
//! compiled schema.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::LoadError;

/// Ordered string-keyed mapping, the unit of exchange for raw input.
pub type Mapping = serde_json::Map<String, Value>;

/// Where raw input comes from.
#[derive(Debug, Clone)]
pub enum Source {
    /// A YAML or JSON file on disk.
    File(PathBuf),
    /// Inline YAML or JSON text.
    Content(String),
    /// A URL or query string.
    Url(String),
    /// An in-memory mapping.
    Data(Mapping),
}

impl Source {
    /// Convenience constructor for [`Source::File`].
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    /// Convenience constructor for [`Source::Content`].
    pub fn content(text: impl Into<String>) -> Self {
        Self::Content(text.into())
    }

    /// Convenience constructor for [`Source::Url`].
    pub fn url(url: impl Into<String>) -> Self {
        Self::Url(url.into())
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Content(_) => f.write_str("<content>"),
            Self::Url(_) => f.write_str("<url>"),
            Self::Data(_) => f.write_str("<data>"),
        }
    }
}

/// Load a source into a nested mapping.
///
/// # Errors
///
/// Returns [`LoadError`] if the file cannot be read, has an unsupported
/// extension, fails to parse, parses to nothing, or does not have a
/// mapping at its root.
pub fn load(source: Source) -> Result<Mapping, LoadError> {
    let origin = source.to_string();
    let value = match source {
        Source::File(path) => read_file(&path)?,
        Source::Content(text) => parse_content(&text, &origin)?,
        Source::Url(url) => Value::Object(parse_url(&url)),
        Source::Data(map) => Value::Object(map),
    };
    tracing::debug!(origin = %origin, "loaded input");
    into_mapping(value, origin)
}

/// Resolve `file` as given, falling back to `dir/file`.
///
/// # Errors
///
/// Returns [`LoadError::NotFound`] when neither candidate exists.
pub fn resolve_path(file: impl AsRef<Path>, dir: Option<&Path>) -> Result<PathBuf, LoadError> {
    let file = file.as_ref();
    if file.exists() {
        return Ok(file.to_path_buf());
    }
    if let Some(dir) = dir {
        let candidate = dir.join(file);
        if candidate.exists() {
            return Ok(candidate);
        }
    }
    Err(LoadError::NotFound {
        file: file.display().to_string(),
        dir: dir
            .map(|d| d.display().to_string())
            .unwrap_or_else(|| "(none)".to_string()),
    })
}

fn read_file(path: &Path) -> Result<Value, LoadError> {
    let display = path.display().to_string();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !matches!(ext.as_str(), "yaml" | "yml" | "json") {
        return Err(LoadError::UnsupportedFormat { path: display });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: display.clone(),
        source,
    })?;

    if ext == "json" {
        serde_json::from_str(&content).map_err(|e| LoadError::Parse {
            origin: display,
            reason: format!("invalid JSON: {e}"),
        })
    } else {
        parse_yaml(&content, &display)
    }
}

fn parse_content(text: &str, origin: &str) -> Result<Value, LoadError> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    match parse_yaml(text, origin) {
        Ok(value) => Ok(value),
        Err(yaml_err) => serde_json::from_str(text).map_err(|_| yaml_err),
    }
}

fn parse_yaml(text: &str, origin: &str) -> Result<Value, LoadError> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(text).map_err(|e| LoadError::Parse {
        origin: origin.to_string(),
        reason: format!("invalid YAML: {e}"),
    })?;
    yaml_to_json(&yaml, "").map_err(|reason| LoadError::Parse {
        origin: origin.to_string(),
        reason: format!("unsupported YAML: {reason}"),
    })
}

fn into_mapping(value: Value, origin: String) -> Result<Mapping, LoadError> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Err(LoadError::Empty { origin }),
        other => Err(LoadError::NotAMapping {
            origin,
            found: json_type_name(&other),
        }),
    }
}

/// Name of a JSON value's type, for diagnostics.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}

/// Decode the query parameters of `url` into a nested mapping.
fn parse_url(url: &str) -> Mapping {
    let query = url.split_once('?').map(|(_, q)| q).unwrap_or(url);
    let query = query.split_once('#').map(|(q, _)| q).unwrap_or(query);

    let mut result = Mapping::new();
    let mut seen = HashSet::new();
    for (key, raw) in url::form_urlencoded::parse(query.as_bytes()) {
        if !seen.insert(key.to_string()) {
            continue;
        }
        let value = if raw.contains(',') {
            Value::Array(raw.split(',').map(|s| Value::String(s.to_string())).collect())
        } else {
            Value::String(raw.into_owned())
        };
        insert_dotted(&mut result, &key, value);
    }
    result
}

fn insert_dotted(root: &mut Mapping, dotted: &str, value: Value) {
    let mut parts: Vec<&str> = dotted.split('.').collect();
    let Some(last) = parts.pop() else {
        return;
    };
    let mut node = root;
    for part in parts {
        let entry = node
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Mapping::new()));
        if !entry.is_object() {
            *entry = Value::Object(Mapping::new());
        }
        node = match entry {
            Value::Object(map) => map,
            _ => return,
        };
    }
    node.insert(last.to_string(), value);
}

/// Convert a YAML document into the ordered JSON shape.
///
/// Blueprints use the JSON-compatible subset of YAML. Scalar keys are
/// rendered as text; tagged values, composite keys and numbers without a
/// JSON form (`.nan`, `.inf`) are rejected with the dotted location of the
/// offending node.
fn yaml_to_json(yaml: &serde_yaml::Value, at: &str) -> Result<Value, String> {
    use serde_yaml::Value as Yaml;

    let here = || {
        if at.is_empty() {
            "<root>".to_string()
        } else {
            at.to_string()
        }
    };
    let value = match yaml {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(*b),
        Yaml::Number(n) => yaml_number(n)
            .ok_or_else(|| format!("{}: number {n} has no JSON form", here()))?,
        Yaml::String(s) => Value::String(s.clone()),
        Yaml::Sequence(items) => Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| yaml_to_json(item, &format!("{at}[{i}]")))
                .collect::<Result<_, _>>()?,
        ),
        Yaml::Mapping(map) => {
            let mut out = Mapping::new();
            for (k, v) in map {
                let key = match k {
                    Yaml::String(s) => s.clone(),
                    Yaml::Number(n) => n.to_string(),
                    Yaml::Bool(b) => b.to_string(),
                    other => {
                        return Err(format!(
                            "{}: keys must be scalars, found {}",
                            here(),
                            yaml_type_name(other)
                        ))
                    }
                };
                let child = if at.is_empty() {
                    key.clone()
                } else {
                    format!("{at}.{key}")
                };
                out.insert(key, yaml_to_json(v, &child)?);
            }
            Value::Object(out)
        }
        Yaml::Tagged(tagged) => {
            return Err(format!("{}: tagged value {} is not supported", here(), tagged.tag))
        }
    };
    Ok(value)
}

fn yaml_number(n: &serde_yaml::Number) -> Option<Value> {
    if let Some(i) = n.as_i64() {
        Some(Value::from(i))
    } else if let Some(u) = n.as_u64() {
        Some(Value::from(u))
    } else {
        n.as_f64()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
    }
}

fn yaml_type_name(yaml: &serde_yaml::Value) -> &'static str {
    match yaml {
        serde_yaml::Value::Null => "null",
        serde_yaml::Value::Bool(_) => "bool",
        serde_yaml::Value::Number(_) => "number",
        serde_yaml::Value::String(_) => "string",
        serde_yaml::Value::Sequence(_) => "sequence",
        serde_yaml::Value::Mapping(_) => "mapping",
        serde_yaml::Value::Tagged(_) => "tagged value",
    }
}
