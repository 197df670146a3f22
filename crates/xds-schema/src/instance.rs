//! # Instance Builder
//!
//! Structures raw data against a compiled [`SchemaNode`] and returns an
//! [`Instance`]: the field values in schema order, plus `nsid`/`uid` and
//! any attributes merged from the kind's [`Delegate`].
//!
//! ## Structuring Rules
//!
//! - Data keys may be a field's blueprint name or its var. Any other key
//!   fails with [`BuildError::UnexpectedField`].
//! - Missing fields take their default, or null.
//! - Explicitly typed fields coerce strictly: a value that does not parse
//!   as the declared type fails with [`BuildError::InvalidValue`].
//! - Fields without a declared scalar type coerce by shape: a
//!   `YYYY-MM-DD` string becomes a date, a string containing `,` becomes
//!   a list of strings.
//! - `str` fields, including text with no type keyword, keep their text
//!   except that a `YYYY-MM-DD` string still becomes a date.
//! - Nested and list-of-nested fields recurse with the same rules.
//! - The `kind` value always reports the schema's kind.
//!
//! ## Delegates
//!
//! A delegate attached to the kind is constructed from the same
//! normalized raw data. Its attributes are merged onto the instance,
//! except names starting with `_`. An attribute whose name the schema
//! already declares fails the build with
//! [`BuildError::ReservedAttribute`].

use std::sync::Arc;

use serde_json::Value as Json;
use xds_core::loader::json_type_name;
use xds_core::{parse_iso_date, Mapping};

use crate::compiler::{
    qualify, DeclaredType, FieldDefinition, SchemaCompiler, SchemaNode, DEFAULT_UID, NSID_FIELD,
    UID_FIELD,
};
use crate::constraint::{audit, ValidationViolations};
use crate::error::BuildError;
use crate::normalize::{normalize, DYNAMIC_KIND, KIND_KEY};
use crate::value::{FieldType, ScalarType, Value};

// ─── Delegates ───────────────────────────────────────────────────────

/// An externally supplied implementation composed into every instance of
/// a kind.
///
/// Closures `Fn(&Mapping) -> anyhow::Result<DelegateObject>` implement
/// this trait.
pub trait Delegate: Send + Sync {
    /// Construct the delegate from the instance's raw data.
    fn construct(&self, raw: &Mapping) -> anyhow::Result<DelegateObject>;
}

impl<F> Delegate for F
where
    F: Fn(&Mapping) -> anyhow::Result<DelegateObject> + Send + Sync,
{
    fn construct(&self, raw: &Mapping) -> anyhow::Result<DelegateObject> {
        self(raw)
    }
}

/// The attributes a delegate exposes, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DelegateObject {
    attributes: Vec<(String, Value)>,
}

impl DelegateObject {
    /// An object with no attributes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Set an attribute, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    /// Read an attribute.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// All attributes, private ones included.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.attributes.iter().map(|(n, v)| (n.as_str(), v))
    }
}

// ─── Instance ────────────────────────────────────────────────────────

/// A realized value of one [`SchemaNode`].
#[derive(Debug, Clone)]
pub struct Instance {
    schema: Arc<SchemaNode>,
    values: Vec<(String, Value)>,
    nsid: Option<String>,
    uid: String,
    attributes: Vec<(String, Value)>,
    delegate: Option<DelegateObject>,
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind()
            && self.values == other.values
            && self.nsid == other.nsid
            && self.uid == other.uid
            && self.attributes == other.attributes
    }
}

impl Instance {
    /// The kind this instance was built for.
    pub fn kind(&self) -> &str {
        self.schema.kind()
    }

    /// The node this instance was built against.
    pub fn schema(&self) -> &Arc<SchemaNode> {
        &self.schema
    }

    /// A field value by blueprint name or var, else a merged delegate
    /// attribute.
    pub fn get(&self, key: &str) -> Option<&Value> {
        let var = self.schema.field(key).map_or(key, |f| f.var.as_str());
        self.values
            .iter()
            .chain(self.attributes.iter())
            .find(|(name, _)| name == var)
            .map(|(_, v)| v)
    }

    /// Field values keyed by var, in schema order. Excludes `nsid`/`uid`.
    pub fn values(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Attributes merged from the delegate.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.attributes.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// The delegate this instance was composed with, if any.
    pub fn delegate(&self) -> Option<&DelegateObject> {
        self.delegate.as_ref()
    }

    /// The namespace path, set once the instance is registered.
    pub fn nsid(&self) -> Option<&str> {
        self.nsid.as_deref()
    }

    /// The instance's unique id.
    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Record the namespace path assigned by a registry.
    pub fn set_nsid(&mut self, nsid: impl Into<String>) {
        self.nsid = Some(nsid.into());
    }

    /// Check the field values against their modifiers.
    pub fn audit(&self) -> ValidationViolations {
        audit(self)
    }

    /// Render as JSON: field values, then `nsid`, `uid` and merged
    /// attributes.
    pub fn to_json(&self) -> Json {
        let mut map = Mapping::new();
        for (name, value) in &self.values {
            map.insert(name.clone(), value.to_json());
        }
        map.insert(
            NSID_FIELD.to_string(),
            self.nsid.clone().map_or(Json::Null, Json::String),
        );
        map.insert(UID_FIELD.to_string(), Json::String(self.uid.clone()));
        for (name, value) in &self.attributes {
            map.insert(name.clone(), value.to_json());
        }
        Json::Object(map)
    }
}

// ─── Builder ─────────────────────────────────────────────────────────

/// Builds instances against the nodes of one [`SchemaCompiler`].
#[derive(Debug, Clone, Copy)]
pub struct InstanceBuilder<'a> {
    compiler: &'a SchemaCompiler,
}

impl<'a> InstanceBuilder<'a> {
    /// A builder reading nodes and delegates from `compiler`.
    pub fn new(compiler: &'a SchemaCompiler) -> Self {
        Self { compiler }
    }

    /// Normalize `raw`, look up the node for its kind, and structure it.
    ///
    /// # Errors
    ///
    /// - [`BuildError::UnknownKind`] when the kind was never compiled.
    /// - [`BuildError::UnexpectedField`] for a key the schema lacks.
    /// - [`BuildError::InvalidValue`] for a value that does not fit its
    ///   declared type.
    /// - [`BuildError::Delegate`] / [`BuildError::ReservedAttribute`] when
    ///   the kind's delegate fails or shadows a declared field.
    pub fn build(&self, mut raw: Mapping) -> Result<Instance, BuildError> {
        normalize(&mut raw);
        let kind = match raw.get(KIND_KEY) {
            Some(Json::String(kind)) => kind.clone(),
            Some(other) => other.to_string(),
            None => DYNAMIC_KIND.to_string(),
        };
        let schema = self
            .compiler
            .get(&kind)
            .ok_or_else(|| BuildError::UnknownKind { kind: kind.clone() })?;

        let mut instance = self.structure(&schema, &raw, "")?;
        if let Some(delegate) = self.compiler.delegate(&kind) {
            let object = delegate
                .construct(&raw)
                .map_err(|source| BuildError::Delegate {
                    kind: kind.clone(),
                    source,
                })?;
            merge(&mut instance, object)?;
        }
        tracing::debug!(kind = %kind, uid = %instance.uid, "built instance");
        Ok(instance)
    }

    fn structure(
        &self,
        schema: &Arc<SchemaNode>,
        raw: &Mapping,
        prefix: &str,
    ) -> Result<Instance, BuildError> {
        let fields = schema.fields();
        let mut slots: Vec<Option<Value>> = vec![None; fields.len()];
        let mut nsid = None;
        let mut uid = None;

        for (key, value) in raw {
            if key == KIND_KEY {
                continue;
            }
            let qualifier = qualify(prefix, key);
            let Some(index) = schema.position(key) else {
                return Err(BuildError::UnexpectedField {
                    kind: schema.kind().to_string(),
                    field: qualifier.to_lowercase(),
                });
            };
            let field = &fields[index];
            match field.var.as_str() {
                NSID_FIELD => nsid = text_of(value),
                UID_FIELD => uid = text_of(value),
                _ => slots[index] = Some(self.coerce(field, value, &qualifier)?),
            }
        }

        let values = fields
            .iter()
            .zip(slots)
            .filter(|(field, _)| !field.is_system())
            .map(|(field, slot)| {
                let value = if field.var == KIND_KEY {
                    Value::Str(schema.kind().to_string())
                } else {
                    slot.or_else(|| field.default.clone()).unwrap_or(Value::Null)
                };
                (field.var.clone(), value)
            })
            .collect();

        Ok(Instance {
            schema: Arc::clone(schema),
            values,
            nsid,
            uid: uid.unwrap_or_else(|| DEFAULT_UID.to_string()),
            attributes: Vec::new(),
            delegate: None,
        })
    }

    fn coerce(&self, field: &FieldDefinition, raw: &Json, qualifier: &str) -> Result<Value, BuildError> {
        if raw.is_null() {
            return Ok(Value::Null);
        }
        if field.is_loosely_typed() {
            return Ok(loose(raw));
        }
        let invalid = || BuildError::InvalidValue {
            qualifier: qualifier.to_lowercase(),
            expected: field.declared_type.to_string(),
            found: describe(raw),
        };

        match &field.declared_type {
            DeclaredType::Nested(node) => match raw {
                Json::Object(map) => self.nested(node, map, qualifier),
                _ => Err(invalid()),
            },
            DeclaredType::NestedList(node) => match raw {
                Json::Array(items) => items
                    .iter()
                    .map(|item| match item {
                        Json::Object(map) => self.nested(node, map, qualifier),
                        Json::Null => Ok(Value::Null),
                        _ => Err(invalid()),
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::List),
                _ => Err(invalid()),
            },
            DeclaredType::Reference(node) => match raw {
                Json::Object(map) => self.nested(node, map, qualifier),
                other => Ok(loose(other)),
            },
            DeclaredType::Primitive(FieldType::Scalar(ScalarType::Str)) => match raw {
                Json::String(text) => Ok(parse_iso_date(text)
                    .map_or_else(|| Value::Str(text.clone()), Value::Date)),
                other => scalar(ScalarType::Str, other).ok_or_else(invalid),
            },
            DeclaredType::Primitive(FieldType::Scalar(t)) => scalar(*t, raw).ok_or_else(invalid),
            DeclaredType::Primitive(FieldType::List(t)) => match raw {
                Json::Array(items) => items
                    .iter()
                    .map(|item| scalar(*t, item))
                    .collect::<Option<Vec<_>>>()
                    .map(Value::List)
                    .ok_or_else(invalid),
                Json::String(text) => FieldType::List(*t).coerce(text).ok_or_else(invalid),
                other => scalar(*t, other)
                    .map(|v| Value::List(vec![v]))
                    .ok_or_else(invalid),
            },
            DeclaredType::List(_) | DeclaredType::Untyped => Ok(loose(raw)),
        }
    }

    fn nested(&self, node: &Arc<SchemaNode>, map: &Mapping, qualifier: &str) -> Result<Value, BuildError> {
        self.structure(node, map, qualifier)
            .map(|inst| Value::Instance(Box::new(inst)))
    }
}

fn merge(instance: &mut Instance, object: DelegateObject) -> Result<(), BuildError> {
    for (name, value) in object.attributes() {
        if instance.schema.declares(name) {
            return Err(BuildError::ReservedAttribute {
                kind: instance.kind().to_string(),
                attribute: name.to_string(),
            });
        }
        if name.starts_with('_') {
            continue;
        }
        instance.attributes.push((name.to_string(), value.clone()));
    }
    instance.delegate = Some(object);
    Ok(())
}

/// Shape-driven coercion for fields without a declared scalar type.
fn loose(raw: &Json) -> Value {
    match raw {
        Json::String(text) => {
            if let Some(date) = parse_iso_date(text) {
                Value::Date(date)
            } else if text.contains(',') {
                Value::List(text.split(',').map(Value::from).collect())
            } else {
                Value::Str(text.clone())
            }
        }
        Json::Array(items) => Value::List(items.iter().map(loose).collect()),
        other => Value::from_json(other),
    }
}

/// Strict coercion to a scalar type.
fn scalar(target: ScalarType, raw: &Json) -> Option<Value> {
    match raw {
        Json::Null => Some(Value::Null),
        Json::String(text) => target.parse(text),
        Json::Bool(b) => match target {
            ScalarType::Bool => Some(Value::Bool(*b)),
            t if t.is_textual() => Some(Value::Str(b.to_string())),
            _ => None,
        },
        Json::Number(n) => match target {
            ScalarType::Int => n.as_i64().map(Value::Int),
            ScalarType::Float => n.as_f64().map(Value::Float),
            t if t.is_textual() => Some(Value::Str(n.to_string())),
            _ => None,
        },
        Json::Object(map) => (target == ScalarType::Kw).then(|| Value::Map(map.clone())),
        Json::Array(_) => None,
    }
}

fn text_of(value: &Json) -> Option<String> {
    match value {
        Json::Null => None,
        Json::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn describe(raw: &Json) -> String {
    match raw {
        Json::String(s) => format!("{s:?}"),
        other => json_type_name(other).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn mapping(value: Json) -> Mapping {
        match value {
            Json::Object(map) => map,
            other => panic!("fixture is not a mapping: {other}"),
        }
    }

    fn compiler() -> SchemaCompiler {
        let compiler = SchemaCompiler::new();
        compiler
            .compile_mapping(mapping(json!({
                "kind": "Student",
                "First Name": "str#req",
                "age": "int=12#ge=5",
                "enrolled": null,
                "tags": "lists",
                "note": "plain text",
                "address": {"kind": "Address", "city": "str", "zip": "int"},
                "courses": [{"kind": "Course", "title": "str", "credits": "int=3"}],
            })))
            .unwrap();
        compiler
    }

    #[test]
    fn test_build_defaults_and_order() {
        let compiler = compiler();
        let inst = compiler
            .build(mapping(json!({"kind": "Student", "first_name": "Ada"})))
            .unwrap();
        assert_eq!(inst.kind(), "Student");
        assert_eq!(inst.uid(), DEFAULT_UID);
        assert_eq!(inst.nsid(), None);
        assert_eq!(inst.get("First Name"), Some(&Value::from("Ada")));
        assert_eq!(inst.get("age"), Some(&Value::Int(12)));
        assert_eq!(inst.get("address"), Some(&Value::Null));
        let vars: Vec<&str> = inst.values().map(|(n, _)| n).collect();
        assert_eq!(
            vars,
            vec!["kind", "first_name", "age", "enrolled", "tags", "note", "address", "courses"]
        );
    }

    #[test]
    fn test_unexpected_field_rejected() {
        let compiler = compiler();
        let err = compiler
            .build(mapping(json!({"kind": "Student", "nickname": "A"})))
            .unwrap_err();
        assert!(matches!(
            err,
            BuildError::UnexpectedField { ref kind, ref field } if kind == "Student" && field == "nickname"
        ));
    }

    #[test]
    fn test_nested_unexpected_field_names_path() {
        let compiler = compiler();
        let err = compiler
            .build(mapping(json!({
                "kind": "Student",
                "address": {"city": "Paris", "street": "Rue"},
            })))
            .unwrap_err();
        assert!(matches!(
            err,
            BuildError::UnexpectedField { ref kind, ref field } if kind == "Address" && field == "address.street"
        ));
    }

    #[test]
    fn test_unknown_kind() {
        let compiler = compiler();
        let err = compiler.build(mapping(json!({"kind": "Teacher"}))).unwrap_err();
        assert_eq!(err.to_string(), "class Teacher not found, factory not initialized");
        let err = compiler.build(mapping(json!({"x": 1}))).unwrap_err();
        assert!(matches!(err, BuildError::UnknownKind { ref kind } if kind == DYNAMIC_KIND));
    }

    #[test]
    fn test_nested_structuring() {
        let compiler = compiler();
        let inst = compiler
            .build(mapping(json!({
                "kind": "Student",
                "address": {"city": "Paris", "zip": "75001"},
                "courses": [{"title": "Math"}, {"title": "Art", "credits": 2}],
            })))
            .unwrap();

        let address = inst.get("address").and_then(Value::as_instance).unwrap();
        assert_eq!(address.kind(), "Address");
        assert_eq!(address.get("zip"), Some(&Value::Int(75001)));
        assert_eq!(address.get("kind"), Some(&Value::from("Address")));

        let courses = inst.get("courses").and_then(Value::as_list).unwrap();
        assert_eq!(courses.len(), 2);
        assert_eq!(courses[0].as_instance().unwrap().get("credits"), Some(&Value::Int(3)));
        assert_eq!(courses[1].as_instance().unwrap().get("credits"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_loose_coercion() {
        let compiler = compiler();
        let inst = compiler
            .build(mapping(json!({
                "kind": "Student",
                "enrolled": "2024-09-01",
                "first_name": "Smith, Ada",
            })))
            .unwrap();
        assert_eq!(
            inst.get("enrolled"),
            Some(&Value::Date(NaiveDate::from_ymd_opt(2024, 9, 1).unwrap()))
        );
        assert_eq!(inst.get("first_name"), Some(&Value::from("Smith, Ada")));

        let inst = compiler
            .build(mapping(json!({"kind": "Student", "enrolled": "math,art"})))
            .unwrap();
        assert_eq!(
            inst.get("enrolled"),
            Some(&Value::List(vec![Value::from("math"), Value::from("art")]))
        );
    }

    #[test]
    fn test_implicit_str_keeps_commas() {
        let compiler = compiler();
        let inst = compiler
            .build(mapping(json!({"kind": "Student", "note": "Smith, Ada"})))
            .unwrap();
        assert_eq!(inst.get("note"), Some(&Value::from("Smith, Ada")));
        let note = inst.schema().field("note").unwrap();
        assert_eq!(note.declared_type.to_string(), "str");
    }

    #[test]
    fn test_str_fields_take_iso_dates() {
        let compiler = compiler();
        let inst = compiler
            .build(mapping(json!({
                "kind": "Student",
                "first_name": "2024-09-01",
                "note": "2023-01-31",
                "address": {"city": "2024-02-29"},
            })))
            .unwrap();
        let date = |y, m, d| Value::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap());
        assert_eq!(inst.get("first_name"), Some(&date(2024, 9, 1)));
        assert_eq!(inst.get("note"), Some(&date(2023, 1, 31)));
        let address = inst.get("address").and_then(Value::as_instance).unwrap();
        assert_eq!(address.get("city"), Some(&date(2024, 2, 29)));

        let inst = compiler
            .build(mapping(json!({"kind": "Student", "note": "2024-13-01", "first_name": 7})))
            .unwrap();
        assert_eq!(inst.get("note"), Some(&Value::from("2024-13-01")));
        assert_eq!(inst.get("first_name"), Some(&Value::from("7")));
    }

    #[test]
    fn test_typed_coercion() {
        let compiler = compiler();
        let inst = compiler
            .build(mapping(json!({"kind": "Student", "age": "14", "tags": "x,y"})))
            .unwrap();
        assert_eq!(inst.get("age"), Some(&Value::Int(14)));
        assert_eq!(
            inst.get("tags"),
            Some(&Value::List(vec![Value::from("x"), Value::from("y")]))
        );

        let err = compiler
            .build(mapping(json!({"kind": "Student", "age": "old"})))
            .unwrap_err();
        assert!(matches!(
            err,
            BuildError::InvalidValue { ref qualifier, ref expected, .. } if qualifier == "age" && expected == "int"
        ));
    }

    #[test]
    fn test_uid_and_nsid_from_data() {
        let compiler = compiler();
        let inst = compiler
            .build(mapping(json!({"kind": "Student", "uid": "s-1"})))
            .unwrap();
        assert_eq!(inst.uid(), "s-1");
        let json = inst.to_json();
        assert_eq!(json["uid"], "s-1");
        assert_eq!(json["nsid"], Json::Null);
    }

    #[test]
    fn test_delegate_merged() {
        let compiler = compiler();
        compiler.attach_delegate("Student", |raw: &Mapping| -> anyhow::Result<DelegateObject> {
            let keys = raw.len() as i64;
            Ok(DelegateObject::new()
                .with("report", "ready")
                .with("key_count", keys)
                .with("_cache", true))
        });
        let inst = compiler
            .build(mapping(json!({"kind": "Student", "first_name": "Ada"})))
            .unwrap();
        assert_eq!(inst.get("report"), Some(&Value::from("ready")));
        assert_eq!(inst.get("key_count"), Some(&Value::Int(2)));
        assert_eq!(inst.get("_cache"), None);
        assert!(inst.delegate().unwrap().get("_cache").is_some());
        assert_eq!(inst.to_json()["report"], "ready");
    }

    #[test]
    fn test_delegate_collision_rejected() {
        let compiler = compiler();
        compiler.attach_delegate("Student", |_: &Mapping| -> anyhow::Result<DelegateObject> {
            Ok(DelegateObject::new().with("age", 3i64))
        });
        let err = compiler.build(mapping(json!({"kind": "Student"}))).unwrap_err();
        assert_eq!(
            err.to_string(),
            "age is not allowed to be used in implementation of Student"
        );
    }

    #[test]
    fn test_delegate_failure_wrapped() {
        let compiler = compiler();
        compiler.attach_delegate("Student", |_: &Mapping| -> anyhow::Result<DelegateObject> {
            anyhow::bail!("backend offline")
        });
        let err = compiler.build(mapping(json!({"kind": "Student"}))).unwrap_err();
        assert!(matches!(err, BuildError::Delegate { ref kind, .. } if kind == "Student"));
    }

    #[test]
    fn test_instances_compare_by_content() {
        let compiler = compiler();
        let a = compiler.build(mapping(json!({"kind": "Student", "age": 9}))).unwrap();
        let b = compiler.build(mapping(json!({"kind": "Student", "age": "9"}))).unwrap();
        assert_eq!(a, b);
    }
}
