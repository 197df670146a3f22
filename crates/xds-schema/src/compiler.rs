//! # Schema Compiler
//!
//! Compiles a normalized blueprint mapping into a [`SchemaNode`]: an
//! ordered list of [`FieldDefinition`]s whose declared types are resolved
//! from the shape of each value.
//!
//! | blueprint value | declared type |
//! |---|---|
//! | mapping (with `kind`) | [`DeclaredType::Nested`], compiled recursively |
//! | list whose first element is a mapping | [`DeclaredType::NestedList`] |
//! | other non-empty list | [`DeclaredType::List`] of the first element's runtime type |
//! | text | parsed as a field spec; its type, or [`DeclaredType::Reference`] for `xref` |
//! | number or bool | [`DeclaredType::Primitive`] of its runtime type |
//! | null | [`DeclaredType::Untyped`] |
//!
//! Every node compiled, nested ones included, is stored in the compiler's
//! schema table under its kind once the whole blueprint has compiled; a
//! failed compile leaves the table untouched. Compiling a kind again
//! replaces the stored node; instances already built keep the node they
//! were built from.
//!
//! ## Cross-References
//!
//! An `xref` must name a kind that is already compiled when the referencing
//! blueprint is compiled. Forward references fail with
//! [`CompileError::UnresolvedReference`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value as Json;
use xds_core::{xlate, Mapping};

use crate::error::{BuildError, CompileError};
use crate::instance::{Delegate, Instance, InstanceBuilder};
use crate::modifier::{self, FieldSpec};
use crate::normalize::{kind_of, normalize, KIND_KEY};
use crate::value::{FieldType, ScalarType, Value, ValueKind};

/// System field holding the namespace path assigned at registration.
pub const NSID_FIELD: &str = "nsid";

/// System field holding the instance's unique id.
pub const UID_FIELD: &str = "uid";

/// Value of [`UID_FIELD`] when the data supplies none.
pub const DEFAULT_UID: &str = "fta";

// ─── Field Definitions ───────────────────────────────────────────────

/// The resolved type of a field.
#[derive(Debug, Clone)]
pub enum DeclaredType {
    /// A scalar or list-of-scalar type.
    Primitive(FieldType),
    /// A list of non-mapping literals, typed by its first element.
    List(ValueKind),
    /// A null literal; any value is accepted.
    Untyped,
    /// A nested mapping compiled into its own node.
    Nested(Arc<SchemaNode>),
    /// A list of nested mappings, typed by its first element.
    NestedList(Arc<SchemaNode>),
    /// A cross-reference to a previously compiled node.
    Reference(Arc<SchemaNode>),
}

impl DeclaredType {
    /// Whether the field holds nested instances of another node.
    pub fn is_nested(&self) -> bool {
        matches!(self, Self::Nested(_) | Self::NestedList(_))
    }

    /// The node a nested or reference type points at.
    pub fn target(&self) -> Option<&Arc<SchemaNode>> {
        match self {
            Self::Nested(node) | Self::NestedList(node) | Self::Reference(node) => Some(node),
            _ => None,
        }
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(t) => write!(f, "{t}"),
            Self::List(kind) => write!(f, "list<{kind}>"),
            Self::Untyped => f.write_str("any"),
            Self::Nested(node) => f.write_str(node.kind()),
            Self::NestedList(node) => write!(f, "list<{}>", node.kind()),
            Self::Reference(node) => write!(f, "ref<{}>", node.kind()),
        }
    }
}

/// One compiled field of a [`SchemaNode`].
#[derive(Debug, Clone)]
pub struct FieldDefinition {
    /// The key as written in the blueprint.
    pub name: String,
    /// Normalized identifier token derived from `name`.
    pub var: String,
    /// Human label derived from `name`.
    pub alias: String,
    /// Lowercased dot-path from the schema root.
    pub qualifier: String,
    /// The resolved type.
    pub declared_type: DeclaredType,
    /// Runtime type of the blueprint literal.
    pub raw_value_type: ValueKind,
    /// Parsed field spec, when the literal was text.
    pub modifiers: Option<FieldSpec>,
    /// Value used when instance data omits the field.
    pub default: Option<Value>,
}

impl FieldDefinition {
    fn system(name: &str, default: Option<Value>) -> Self {
        let (var, alias) = xlate(name);
        Self {
            name: name.to_string(),
            var,
            alias,
            qualifier: name.to_string(),
            declared_type: DeclaredType::Primitive(FieldType::Scalar(ScalarType::Str)),
            raw_value_type: ValueKind::Str,
            modifiers: None,
            default,
        }
    }

    /// Whether this is one of the implicit `nsid`/`uid` fields.
    pub fn is_system(&self) -> bool {
        self.var == NSID_FIELD || self.var == UID_FIELD
    }

    /// Whether the field has no declared scalar type, so data values are
    /// coerced by shape (dates, comma lists).
    pub fn is_loosely_typed(&self) -> bool {
        matches!(self.declared_type, DeclaredType::Untyped | DeclaredType::List(_))
    }

    fn matches(&self, key: &str) -> bool {
        self.name == key || self.var == key
    }
}

// ─── Schema Node ─────────────────────────────────────────────────────

/// The compiled definition of one kind.
#[derive(Debug)]
pub struct SchemaNode {
    kind: String,
    fields: Vec<FieldDefinition>,
}

impl SchemaNode {
    /// The kind name.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// All fields in blueprint order, followed by `nsid` and `uid`.
    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    /// Look up a field by blueprint name or by var.
    pub fn field(&self, key: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.matches(key))
    }

    /// Position of a field by blueprint name or by var.
    pub fn position(&self, key: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.matches(key))
    }

    /// Whether `name` is already taken by a field of this node.
    pub fn declares(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Read-only projection for renderers.
    pub fn outline(&self) -> SchemaOutline {
        SchemaOutline {
            kind: self.kind.clone(),
            fields: self
                .fields
                .iter()
                .map(|f| FieldOutline {
                    name: f.name.clone(),
                    type_name: f.declared_type.to_string(),
                    nested: f.declared_type.is_nested(),
                    default: f.default.clone(),
                })
                .collect(),
        }
    }
}

impl fmt::Display for SchemaNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.kind)?;
        for field in &self.fields {
            write!(f, "  {}: {}", field.var, field.declared_type)?;
            if let Some(default) = &field.default {
                write!(f, " = {default}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Kind name and per-field summary of a [`SchemaNode`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaOutline {
    /// The kind name.
    pub kind: String,
    /// One entry per field, in order.
    pub fields: Vec<FieldOutline>,
}

/// One field of a [`SchemaOutline`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldOutline {
    /// Blueprint key.
    pub name: String,
    /// Display name of the declared type.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Whether the field holds nested instances.
    pub nested: bool,
    /// Default value, if any.
    pub default: Option<Value>,
}

// ─── Compiler ────────────────────────────────────────────────────────

/// Compiles blueprints and owns the table of compiled nodes.
///
/// Shared by reference; the table and the delegate hooks sit behind
/// `RwLock`s so compiling and building may happen from several threads.
#[derive(Default)]
pub struct SchemaCompiler {
    schemas: RwLock<HashMap<String, Arc<SchemaNode>>>,
    delegates: RwLock<HashMap<String, Arc<dyn Delegate>>>,
}

impl fmt::Debug for SchemaCompiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaCompiler")
            .field("kinds", &self.kinds())
            .field("delegates", &self.delegates.read().len())
            .finish()
    }
}

impl SchemaCompiler {
    /// Create a compiler with an empty schema table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize `data` and compile it under its own `kind`.
    pub fn compile_mapping(&self, mut data: Mapping) -> Result<Arc<SchemaNode>, CompileError> {
        normalize(&mut data);
        let kind = kind_of(&data)
            .ok_or_else(|| CompileError::KindNotText {
                qualifier: KIND_KEY.to_string(),
            })?
            .to_string();
        self.compile(&kind, &data)
    }

    /// Compile a normalized mapping under `kind` and store the result.
    ///
    /// # Errors
    ///
    /// - [`CompileError::Grammar`] when a field spec is malformed.
    /// - [`CompileError::MissingKind`] / [`CompileError::KindNotText`] when
    ///   a nested mapping has no usable kind.
    /// - [`CompileError::UnresolvedReference`] when an `xref` target has
    ///   not been compiled.
    ///
    /// Nothing is stored unless the whole blueprint compiles.
    pub fn compile(&self, kind: &str, data: &Mapping) -> Result<Arc<SchemaNode>, CompileError> {
        let mut staged = Vec::new();
        let node = self.compile_node(kind, data, "", &mut staged)?;
        self.publish(staged);
        Ok(node)
    }

    fn publish(&self, staged: Vec<Arc<SchemaNode>>) {
        let mut schemas = self.schemas.write();
        for node in staged {
            let kind = node.kind.clone();
            let fields = node.fields.len();
            if schemas.insert(kind.clone(), node).is_some() {
                tracing::warn!(kind = %kind, "kind recompiled, previous schema replaced");
            }
            tracing::debug!(kind = %kind, fields, "compiled schema");
        }
    }

    fn compile_node(
        &self,
        kind: &str,
        data: &Mapping,
        prefix: &str,
        staged: &mut Vec<Arc<SchemaNode>>,
    ) -> Result<Arc<SchemaNode>, CompileError> {
        let mut fields: Vec<FieldDefinition> = Vec::with_capacity(data.len() + 2);
        for (key, value) in data {
            let qualifier = qualify(prefix, key);
            let field = if key == KIND_KEY {
                kind_field(kind, value, &qualifier)?
            } else {
                self.compile_field(key, value, qualifier, staged)?
            };
            if field.is_system() {
                tracing::debug!(kind = %kind, field = %key, "declared system field ignored");
                continue;
            }
            match fields.iter_mut().find(|f| f.var == field.var) {
                Some(existing) => *existing = field,
                None => fields.push(field),
            }
        }
        fields.push(FieldDefinition::system(NSID_FIELD, None));
        fields.push(FieldDefinition::system(
            UID_FIELD,
            Some(Value::Str(DEFAULT_UID.to_string())),
        ));

        let node = Arc::new(SchemaNode {
            kind: kind.to_string(),
            fields,
        });
        staged.push(Arc::clone(&node));
        Ok(node)
    }

    fn compile_field(
        &self,
        key: &str,
        value: &Json,
        qualifier: String,
        staged: &mut Vec<Arc<SchemaNode>>,
    ) -> Result<FieldDefinition, CompileError> {
        let (var, alias) = xlate(key);
        let raw_value_type = ValueKind::of(value);
        let mut modifiers = None;
        let mut default = None;

        let declared_type = match value {
            Json::Object(map) => DeclaredType::Nested(self.compile_nested(map, &qualifier, staged)?),
            Json::Array(items) => match items.first() {
                Some(Json::Object(map)) => {
                    DeclaredType::NestedList(self.compile_nested(map, &qualifier, staged)?)
                }
                Some(first) => DeclaredType::List(ValueKind::of(first)),
                None => DeclaredType::List(ValueKind::Null),
            },
            Json::String(text) => {
                let spec = modifier::parse(text).map_err(|source| CompileError::Grammar {
                    qualifier: qualifier.to_lowercase(),
                    source,
                })?;
                let declared = match spec.xref_target() {
                    Some(target) => DeclaredType::Reference(self.resolve(target, staged).ok_or_else(|| {
                        CompileError::UnresolvedReference {
                            qualifier: qualifier.to_lowercase(),
                            target: target.to_string(),
                        }
                    })?),
                    None => {
                        default = spec.default.clone();
                        DeclaredType::Primitive(spec.field_type)
                    }
                };
                modifiers = Some(spec);
                declared
            }
            Json::Null => DeclaredType::Untyped,
            _ => DeclaredType::Primitive(FieldType::Scalar(
                raw_value_type.scalar().unwrap_or(ScalarType::Str),
            )),
        };

        Ok(FieldDefinition {
            name: key.to_string(),
            var,
            alias,
            qualifier: qualifier.to_lowercase(),
            declared_type,
            raw_value_type,
            modifiers,
            default,
        })
    }

    fn compile_nested(
        &self,
        map: &Mapping,
        qualifier: &str,
        staged: &mut Vec<Arc<SchemaNode>>,
    ) -> Result<Arc<SchemaNode>, CompileError> {
        match map.get(KIND_KEY) {
            Some(Json::String(kind)) => self.compile_node(kind, map, qualifier, staged),
            Some(_) => Err(CompileError::KindNotText {
                qualifier: qualifier.to_lowercase(),
            }),
            None => Err(CompileError::MissingKind {
                qualifier: qualifier.to_lowercase(),
            }),
        }
    }

    /// An `xref` target: staged in the current compile, else stored.
    fn resolve(&self, kind: &str, staged: &[Arc<SchemaNode>]) -> Option<Arc<SchemaNode>> {
        staged
            .iter()
            .rev()
            .find(|node| node.kind == kind)
            .cloned()
            .or_else(|| self.get(kind))
    }

    /// The node compiled under `kind`, if any.
    pub fn get(&self, kind: &str) -> Option<Arc<SchemaNode>> {
        self.schemas.read().get(kind).cloned()
    }

    /// Whether `kind` has been compiled.
    pub fn contains(&self, kind: &str) -> bool {
        self.schemas.read().contains_key(kind)
    }

    /// Every compiled kind, sorted.
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.schemas.read().keys().cloned().collect();
        kinds.sort();
        kinds
    }

    /// Attach a delegate to `kind`. Every instance built for the kind from
    /// now on merges the delegate's public attributes. The hook outlives
    /// recompilation of the kind.
    pub fn attach_delegate(&self, kind: impl Into<String>, delegate: impl Delegate + 'static) {
        let kind = kind.into();
        tracing::debug!(kind = %kind, "delegate attached");
        self.delegates.write().insert(kind, Arc::new(delegate));
    }

    /// The delegate attached to `kind`, if any.
    pub fn delegate(&self, kind: &str) -> Option<Arc<dyn Delegate>> {
        self.delegates.read().get(kind).cloned()
    }

    /// Build an instance from raw data against this compiler's table.
    pub fn build(&self, data: Mapping) -> Result<Instance, BuildError> {
        InstanceBuilder::new(self).build(data)
    }
}

fn kind_field(kind: &str, value: &Json, qualifier: &str) -> Result<FieldDefinition, CompileError> {
    if !value.is_string() {
        return Err(CompileError::KindNotText {
            qualifier: qualifier.to_lowercase(),
        });
    }
    let mut field = FieldDefinition::system(KIND_KEY, Some(Value::Str(kind.to_string())));
    field.qualifier = qualifier.to_lowercase();
    Ok(field)
}

pub(crate) fn qualify(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GrammarError;
    use crate::modifier::Modifier;
    use crate::normalize::DYNAMIC_KIND;
    use serde_json::json;

    fn mapping(value: Json) -> Mapping {
        match value {
            Json::Object(map) => map,
            other => panic!("fixture is not a mapping: {other}"),
        }
    }

    fn student() -> Mapping {
        mapping(json!({
            "kind": "Student",
            "First Name": "str#req",
            "age": "int=12#ge=5#le=18",
            "grade": 7,
            "notes": null,
            "scores": [1.5, 2.0],
            "address": {"kind": "Address", "city": "str", "zip": "int"},
            "courses": [{"title": "str#key", "credits": "int=3"}],
        }))
    }

    fn names(node: &SchemaNode) -> Vec<&str> {
        node.fields().iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn test_compile_student_fields_in_order() {
        let compiler = SchemaCompiler::new();
        let node = compiler.compile_mapping(student()).unwrap();
        assert_eq!(node.kind(), "Student");
        assert_eq!(
            names(&node),
            vec![
                "kind", "First Name", "age", "grade", "notes", "scores", "address", "courses",
                "nsid", "uid",
            ]
        );
    }

    #[test]
    fn test_field_metadata() {
        let compiler = SchemaCompiler::new();
        let node = compiler.compile_mapping(student()).unwrap();

        let first = node.field("First Name").unwrap();
        assert_eq!(first.var, "first_name");
        assert_eq!(first.alias, "First Name");
        assert_eq!(first.qualifier, "first name");
        assert!(first.modifiers.as_ref().unwrap().flag(Modifier::Req));
        assert!(node.field("first_name").is_some());

        let age = node.field("age").unwrap();
        assert!(matches!(
            age.declared_type,
            DeclaredType::Primitive(FieldType::Scalar(ScalarType::Int))
        ));
        assert_eq!(age.raw_value_type, ValueKind::Str);
        assert_eq!(age.default, Some(Value::Int(12)));

        let grade = node.field("grade").unwrap();
        assert_eq!(grade.raw_value_type, ValueKind::Int);
        assert!(grade.modifiers.is_none());
        assert!(grade.default.is_none());

        assert!(matches!(node.field("notes").unwrap().declared_type, DeclaredType::Untyped));
        assert!(matches!(
            node.field("scores").unwrap().declared_type,
            DeclaredType::List(ValueKind::Float)
        ));
    }

    #[test]
    fn test_nested_nodes_registered() {
        let compiler = SchemaCompiler::new();
        let node = compiler.compile_mapping(student()).unwrap();

        let address = node.field("address").unwrap();
        assert_eq!(address.declared_type.to_string(), "Address");
        assert!(address.declared_type.is_nested());

        let courses = node.field("courses").unwrap();
        assert_eq!(courses.declared_type.to_string(), "list<courses>");
        let course = courses.declared_type.target().unwrap();
        assert_eq!(course.field("credits").unwrap().qualifier, "courses.credits");

        assert_eq!(compiler.kinds(), vec!["Address", "Student", "courses"]);
    }

    #[test]
    fn test_system_fields_appended() {
        let compiler = SchemaCompiler::new();
        let node = compiler
            .compile_mapping(mapping(json!({"kind": "K", "uid": "int", "x": "str"})))
            .unwrap();
        assert_eq!(names(&node), vec!["kind", "x", "nsid", "uid"]);
        let uid = node.field(UID_FIELD).unwrap();
        assert!(uid.is_system());
        assert_eq!(uid.default, Some(Value::Str(DEFAULT_UID.to_string())));
        assert!(node.field(NSID_FIELD).unwrap().default.is_none());
    }

    #[test]
    fn test_root_without_kind_is_dynamic() {
        let compiler = SchemaCompiler::new();
        let node = compiler.compile_mapping(mapping(json!({"x": "int"}))).unwrap();
        assert_eq!(node.kind(), DYNAMIC_KIND);
        assert_eq!(
            node.field(KIND_KEY).unwrap().default,
            Some(Value::Str(DYNAMIC_KIND.to_string()))
        );
    }

    #[test]
    fn test_xref_requires_compiled_target() {
        let compiler = SchemaCompiler::new();
        let err = compiler
            .compile_mapping(mapping(json!({"kind": "B", "other": "xref=A?id=1"})))
            .unwrap_err();
        assert!(matches!(
            err,
            CompileError::UnresolvedReference { ref qualifier, ref target }
                if qualifier == "other" && target == "A"
        ));

        compiler
            .compile_mapping(mapping(json!({"kind": "A", "id": "int#key"})))
            .unwrap();
        let node = compiler
            .compile_mapping(mapping(json!({"kind": "B", "other": "xref=A?id=1"})))
            .unwrap();
        let other = node.field("other").unwrap();
        assert_eq!(other.declared_type.to_string(), "ref<A>");
        assert_eq!(other.modifiers.as_ref().unwrap().xref(), Some("A?id=1"));
        assert!(other.default.is_none());
    }

    #[test]
    fn test_grammar_error_names_qualifier() {
        let compiler = SchemaCompiler::new();
        let err = compiler
            .compile_mapping(mapping(json!({"kind": "K", "Inner": {"Bad": "int#float"}})))
            .unwrap_err();
        match err {
            CompileError::Grammar { qualifier, source } => {
                assert_eq!(qualifier, "inner.bad");
                assert!(matches!(source, GrammarError::MultipleTypes { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unnormalized_nested_mapping_rejected() {
        let compiler = SchemaCompiler::new();
        let data = mapping(json!({"kind": "K", "inner": {"x": "int"}}));
        let err = compiler.compile("K", &data).unwrap_err();
        assert!(matches!(err, CompileError::MissingKind { ref qualifier } if qualifier == "inner"));
    }

    #[test]
    fn test_non_text_kind_rejected() {
        let compiler = SchemaCompiler::new();
        let err = compiler
            .compile_mapping(mapping(json!({"kind": "K", "inner": {"kind": 3}})))
            .unwrap_err();
        assert!(matches!(err, CompileError::KindNotText { .. }));
    }

    #[test]
    fn test_root_kind_must_be_text() {
        let compiler = SchemaCompiler::new();
        let err = compiler
            .compile_mapping(mapping(json!({"kind": 7, "name": "str"})))
            .unwrap_err();
        assert!(matches!(err, CompileError::KindNotText { ref qualifier } if qualifier == "kind"));
        assert!(compiler.kinds().is_empty());
    }

    #[test]
    fn test_recompile_overwrites() {
        let compiler = SchemaCompiler::new();
        let first = compiler
            .compile_mapping(mapping(json!({"kind": "K", "a": "int"})))
            .unwrap();
        compiler
            .compile_mapping(mapping(json!({"kind": "K", "b": "str"})))
            .unwrap();
        let current = compiler.get("K").unwrap();
        assert!(current.declares("b"));
        assert!(!current.declares("a"));
        assert!(first.declares("a"));
    }

    #[test]
    fn test_empty_list_field() {
        let compiler = SchemaCompiler::new();
        let node = compiler
            .compile_mapping(mapping(json!({"kind": "K", "tags": []})))
            .unwrap();
        assert_eq!(node.field("tags").unwrap().declared_type.to_string(), "list<null>");
    }

    #[test]
    fn test_outline_and_display() {
        let compiler = SchemaCompiler::new();
        let node = compiler
            .compile_mapping(mapping(json!({"kind": "K", "n": "int=4", "sub": {"v": "str"}})))
            .unwrap();
        let outline = node.outline();
        assert_eq!(outline.kind, "K");
        assert_eq!(
            serde_json::to_value(&outline.fields[1]).unwrap(),
            json!({"name": "n", "type": "int", "nested": false, "default": 4})
        );
        assert!(outline.fields[2].nested);

        let text = node.to_string();
        assert!(text.starts_with("K\n"));
        assert!(text.contains("  n: int = 4\n"));
        assert!(text.contains("  sub: sub\n"));
        assert!(text.contains("  uid: str = fta\n"));
    }

    #[test]
    fn test_loosely_typed_fields() {
        let compiler = SchemaCompiler::new();
        let node = compiler
            .compile_mapping(mapping(json!({
                "kind": "K", "plain": "Some text", "typed": "str", "n": "int", "any": null,
            })))
            .unwrap();
        assert!(!node.field("plain").unwrap().is_loosely_typed());
        assert_eq!(node.field("plain").unwrap().declared_type.to_string(), "str");
        assert!(!node.field("typed").unwrap().is_loosely_typed());
        assert!(!node.field("n").unwrap().is_loosely_typed());
        assert!(node.field("any").unwrap().is_loosely_typed());
    }

    #[test]
    fn test_failed_compile_stores_nothing() {
        let compiler = SchemaCompiler::new();
        compiler
            .compile_mapping(mapping(json!({"kind": "Address", "street": "str", "city": "str"})))
            .unwrap();

        let err = compiler
            .compile_mapping(mapping(json!({
                "kind": "Student",
                "address": {"kind": "Address", "zip": "int"},
                "bad": "int#float",
            })))
            .unwrap_err();
        assert!(matches!(err, CompileError::Grammar { ref qualifier, .. } if qualifier == "bad"));

        assert_eq!(compiler.kinds(), vec!["Address"]);
        let address = compiler.get("Address").unwrap();
        assert!(address.declares("street"));
        assert!(!address.declares("zip"));
        compiler
            .build(mapping(json!({"kind": "Address", "street": "x"})))
            .unwrap();
    }

    #[test]
    fn test_xref_to_kind_nested_in_same_blueprint() {
        let compiler = SchemaCompiler::new();
        let node = compiler
            .compile_mapping(mapping(json!({
                "kind": "Student",
                "home": {"kind": "Address", "city": "str"},
                "mail_to": "xref=Address",
            })))
            .unwrap();
        let target = node.field("mail_to").unwrap().declared_type.target().unwrap();
        assert_eq!(target.kind(), "Address");
        assert_eq!(compiler.kinds(), vec!["Address", "Student"]);
    }
}
