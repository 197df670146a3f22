//! # Values and Types
//!
//! [`Value`] is the tagged variant every instance field holds: primitives,
//! calendar values, lists, opaque mappings, and nested instances. It
//! replaces per-kind generated record types with one generic shape that a
//! [`SchemaNode`](crate::SchemaNode) interprets.
//!
//! [`ScalarType`] and [`FieldType`] are the types a field spec can declare;
//! [`ValueKind`] is the runtime type of a raw literal, kept as metadata.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Serialize, Serializer};
use serde_json::Value as Json;
use xds_core::Mapping;

use crate::instance::Instance;

const TIME_FORMAT: &str = "%H:%M:%S";
const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A scalar type selectable by a type keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    /// `int`: 64-bit signed integer.
    Int,
    /// `float`: 64-bit float.
    Float,
    /// `bool`.
    Bool,
    /// `str`, also the type of a spec with no type keyword.
    Str,
    /// `kw`: free-form keyword mapping.
    Kw,
    /// `date`: calendar date.
    Date,
    /// `time`: wall-clock time.
    Time,
    /// `dt`: date and time.
    DateTime,
    /// `email`: string-shaped.
    Email,
    /// `href`: string-shaped.
    Href,
}

impl ScalarType {
    /// The keyword that selects this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Str => "str",
            Self::Kw => "kw",
            Self::Date => "date",
            Self::Time => "time",
            Self::DateTime => "dt",
            Self::Email => "email",
            Self::Href => "href",
        }
    }

    /// Whether values of this type are held as plain strings.
    pub fn is_textual(&self) -> bool {
        matches!(self, Self::Str | Self::Email | Self::Href)
    }

    /// Parse a literal of this type. Returns `None` when the text does not
    /// fit. Floats must be finite.
    pub fn parse(&self, text: &str) -> Option<Value> {
        let trimmed = text.trim();
        match self {
            Self::Int => trimmed.parse().ok().map(Value::Int),
            Self::Float => trimmed
                .parse::<f64>()
                .ok()
                .filter(|x| x.is_finite())
                .map(Value::Float),
            Self::Bool => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Some(Value::Bool(true)),
                "false" | "no" | "0" => Some(Value::Bool(false)),
                _ => None,
            },
            Self::Str | Self::Email | Self::Href => Some(Value::Str(text.to_string())),
            Self::Kw => serde_json::from_str::<Mapping>(trimmed).ok().map(Value::Map),
            Self::Date => NaiveDate::parse_from_str(trimmed, xds_core::temporal::ISO_DATE_FORMAT)
                .ok()
                .map(Value::Date),
            Self::Time => NaiveTime::parse_from_str(trimmed, TIME_FORMAT)
                .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M"))
                .ok()
                .map(Value::Time),
            Self::DateTime => NaiveDateTime::parse_from_str(trimmed, DATETIME_FORMAT)
                .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S"))
                .ok()
                .or_else(|| {
                    chrono::DateTime::parse_from_rfc3339(trimmed)
                        .ok()
                        .map(|dt| dt.naive_utc())
                })
                .map(Value::DateTime),
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The resolved type of a field spec: a scalar or a list of scalars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// A single value.
    Scalar(ScalarType),
    /// A homogeneous list (`listi`, `listf`, `listb`, `lists`).
    List(ScalarType),
}

impl FieldType {
    /// The type of a spec that names no type keyword.
    pub const DEFAULT: Self = Self::Scalar(ScalarType::Str);

    /// The scalar type (the element type for lists).
    pub fn element(&self) -> ScalarType {
        match self {
            Self::Scalar(t) | Self::List(t) => *t,
        }
    }

    /// Whether this is a list type.
    pub fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }

    /// Coerce a literal to this type. Lists split on `,` and coerce each
    /// element.
    pub fn coerce(&self, text: &str) -> Option<Value> {
        match self {
            Self::Scalar(t) => t.parse(text),
            Self::List(t) => text
                .split(',')
                .map(|item| t.parse(item))
                .collect::<Option<Vec<_>>>()
                .map(Value::List),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(t) => write!(f, "{t}"),
            Self::List(t) => write!(f, "list<{t}>"),
        }
    }
}

/// Runtime type of a raw literal in a blueprint or in instance data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// `null` / `~`, or the element type of an empty list.
    Null,
    /// Boolean literal.
    Bool,
    /// Integer literal.
    Int,
    /// Float literal.
    Float,
    /// String literal.
    Str,
    /// Sequence.
    List,
    /// Mapping.
    Map,
}

impl ValueKind {
    /// Classify a raw JSON value.
    pub fn of(value: &Json) -> Self {
        match value {
            Json::Null => Self::Null,
            Json::Bool(_) => Self::Bool,
            Json::Number(n) if n.is_f64() => Self::Float,
            Json::Number(_) => Self::Int,
            Json::String(_) => Self::Str,
            Json::Array(_) => Self::List,
            Json::Object(_) => Self::Map,
        }
    }

    /// The scalar type matching this runtime kind, if there is one.
    pub fn scalar(&self) -> Option<ScalarType> {
        match self {
            Self::Bool => Some(ScalarType::Bool),
            Self::Int => Some(ScalarType::Int),
            Self::Float => Some(ScalarType::Float),
            Self::Str => Some(ScalarType::Str),
            Self::Null | Self::List | Self::Map => None,
        }
    }

    /// Lowercase display name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "str",
            Self::List => "list",
            Self::Map => "mapping",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent or explicit null.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Float.
    Float(f64),
    /// String.
    Str(String),
    /// Calendar date.
    Date(NaiveDate),
    /// Wall-clock time.
    Time(NaiveTime),
    /// Date and time.
    DateTime(NaiveDateTime),
    /// List of values.
    List(Vec<Value>),
    /// Mapping held as raw data (`kw` fields, untyped mappings).
    Map(Mapping),
    /// Nested instance of another schema node.
    Instance(Box<Instance>),
}

impl Value {
    /// Convert raw JSON without any schema guidance.
    pub fn from_json(raw: &Json) -> Self {
        match raw {
            Json::Null => Self::Null,
            Json::Bool(b) => Self::Bool(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Self::Str(s.clone()),
            Json::Array(items) => Self::List(items.iter().map(Self::from_json).collect()),
            Json::Object(map) => Self::Map(map.clone()),
        }
    }

    /// Render as JSON. Calendar values become ISO strings and nested
    /// instances render recursively.
    pub fn to_json(&self) -> Json {
        match self {
            Self::Null => Json::Null,
            Self::Bool(b) => Json::Bool(*b),
            Self::Int(i) => Json::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Self::Str(s) => Json::String(s.clone()),
            Self::Date(d) => Json::String(d.format(xds_core::temporal::ISO_DATE_FORMAT).to_string()),
            Self::Time(t) => Json::String(t.format(TIME_FORMAT).to_string()),
            Self::DateTime(dt) => Json::String(dt.format(DATETIME_FORMAT).to_string()),
            Self::List(items) => Json::Array(items.iter().map(Self::to_json).collect()),
            Self::Map(map) => Json::Object(map.clone()),
            Self::Instance(inst) => inst.to_json(),
        }
    }

    /// Whether the value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrow as a string slice, if textual.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow as a list, if one.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow as a nested instance, if one.
    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Self::Instance(inst) => Some(inst),
            _ => None,
        }
    }

    /// Short type name for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::Date(_) => "date",
            Self::Time(_) => "time",
            Self::DateTime(_) => "dt",
            Self::List(_) => "list",
            Self::Map(_) => "mapping",
            Self::Instance(_) => "instance",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => f.write_str(s),
            Self::Date(d) => write!(f, "{}", d.format(xds_core::temporal::ISO_DATE_FORMAT)),
            Self::Time(t) => write!(f, "{}", t.format(TIME_FORMAT)),
            Self::DateTime(dt) => write!(f, "{}", dt.format(DATETIME_FORMAT)),
            Self::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            Self::Map(_) | Self::Instance(_) => write!(f, "{}", self.to_json()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_parse() {
        assert_eq!(ScalarType::Int.parse(" 42 "), Some(Value::Int(42)));
        assert_eq!(ScalarType::Float.parse("1.5"), Some(Value::Float(1.5)));
        assert_eq!(ScalarType::Float.parse("NaN"), None);
        assert_eq!(ScalarType::Float.parse("-inf"), None);
        assert_eq!(ScalarType::Bool.parse("Yes"), Some(Value::Bool(true)));
        assert_eq!(ScalarType::Bool.parse("maybe"), None);
        assert_eq!(ScalarType::Int.parse("4x"), None);
        assert_eq!(
            ScalarType::Date.parse("2024-02-29"),
            Some(Value::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()))
        );
        assert_eq!(
            ScalarType::Time.parse("09:30"),
            Some(Value::Time(NaiveTime::from_hms_opt(9, 30, 0).unwrap()))
        );
        assert!(matches!(ScalarType::DateTime.parse("2024-01-01T10:00:00Z"), Some(Value::DateTime(_))));
        assert!(matches!(ScalarType::Kw.parse(r#"{"a": 1}"#), Some(Value::Map(_))));
    }

    #[test]
    fn test_list_coerce() {
        assert_eq!(
            FieldType::List(ScalarType::Int).coerce("1,2"),
            Some(Value::List(vec![Value::Int(1), Value::Int(2)]))
        );
        assert_eq!(FieldType::List(ScalarType::Int).coerce("1,x"), None);
    }

    #[test]
    fn test_field_type_display() {
        assert_eq!(FieldType::Scalar(ScalarType::DateTime).to_string(), "dt");
        assert_eq!(FieldType::List(ScalarType::Int).to_string(), "list<int>");
    }

    #[test]
    fn test_value_kind_of() {
        assert_eq!(ValueKind::of(&json!(1)), ValueKind::Int);
        assert_eq!(ValueKind::of(&json!(1.5)), ValueKind::Float);
        assert_eq!(ValueKind::of(&json!("x")), ValueKind::Str);
        assert_eq!(ValueKind::of(&json!({})), ValueKind::Map);
    }

    #[test]
    fn test_to_json_dates_as_strings() {
        let v = Value::List(vec![
            Value::Date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()),
            Value::Int(3),
        ]);
        assert_eq!(v.to_json(), json!(["2024-01-02", 3]));
        assert_eq!(v.to_string(), "2024-01-02,3");
    }
}
