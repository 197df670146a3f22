//! # Modifier Grammar
//!
//! A textual blueprint value is a field spec: `#`-delimited segments, each
//! either a bare keyword or `keyword=value`.
//!
//! ```text
//! int=42#req#uniq#key#gt=45#lt=50
//! ```
//!
//! ## Keyword Categories
//!
//! | category | keywords | value |
//! |---|---|---|
//! | type | `int float bool str listi listf listb lists kw date time dt email href` | optional, the default literal |
//! | operator | `le ge gt lt ne eq max min` | required, kept raw |
//! | query | `has end start in enum range` | required, kept raw (`in` is coerced) |
//! | render | `color heatmap` | required, kept raw |
//! | ux | `multi lines form order ex` | optional, null when absent |
//! | xref | `xref` | required, kept raw |
//! | boolean | `req uniq key ro hide secret fuzzy` | ignored, presence sets the flag |
//!
//! Segments naming no keyword are dropped without error. A repeated
//! keyword keeps its last occurrence. At most one type keyword may appear.
//! The type keyword itself stays in the output with its raw value next to
//! the derived type and default.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde_json::Value as Json;

use crate::error::GrammarError;
use crate::value::{FieldType, ScalarType, Value};

/// The category a keyword belongs to. Decides how its value is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Selects the field type; value is the default literal.
    Type,
    /// Comparison bound against the field value.
    Operator,
    /// Membership or positional query.
    Query,
    /// Presentation hint.
    Render,
    /// UI hint with an optional value.
    Ux,
    /// Cross-reference to another kind.
    XRef,
    /// Flag set by presence alone.
    Boolean,
}

impl Category {
    /// Whether a keyword of this category must carry `=value`.
    pub fn requires_value(&self) -> bool {
        matches!(self, Self::Operator | Self::Query | Self::Render | Self::XRef)
    }
}

macro_rules! modifiers {
    ($($variant:ident => $keyword:literal, $category:ident;)+) => {
        /// A recognised spec keyword.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum Modifier {
            $(
                #[doc = concat!("`", $keyword, "`")]
                $variant,
            )+
        }

        impl Modifier {
            /// Every keyword, in declaration order.
            pub const ALL: &'static [Modifier] = &[$(Modifier::$variant),+];

            /// The keyword as written in a spec.
            pub fn keyword(&self) -> &'static str {
                match self {
                    $(Self::$variant => $keyword,)+
                }
            }

            /// Look up a keyword. Matching is exact and case-sensitive.
            pub fn from_keyword(keyword: &str) -> Option<Self> {
                match keyword {
                    $($keyword => Some(Self::$variant),)+
                    _ => None,
                }
            }

            /// The keyword's category.
            pub fn category(&self) -> Category {
                match self {
                    $(Self::$variant => Category::$category,)+
                }
            }
        }
    };
}

modifiers! {
    Int => "int", Type;
    Float => "float", Type;
    Bool => "bool", Type;
    Str => "str", Type;
    ListI => "listi", Type;
    ListF => "listf", Type;
    ListB => "listb", Type;
    ListS => "lists", Type;
    Kw => "kw", Type;
    Date => "date", Type;
    Time => "time", Type;
    Dt => "dt", Type;
    Email => "email", Type;
    Href => "href", Type;
    Le => "le", Operator;
    Ge => "ge", Operator;
    Gt => "gt", Operator;
    Lt => "lt", Operator;
    Ne => "ne", Operator;
    Eq => "eq", Operator;
    Max => "max", Operator;
    Min => "min", Operator;
    Has => "has", Query;
    End => "end", Query;
    Start => "start", Query;
    In => "in", Query;
    Enum => "enum", Query;
    Range => "range", Query;
    Color => "color", Render;
    Heatmap => "heatmap", Render;
    Multi => "multi", Ux;
    Lines => "lines", Ux;
    Form => "form", Ux;
    Order => "order", Ux;
    Ex => "ex", Ux;
    XRef => "xref", XRef;
    Req => "req", Boolean;
    Uniq => "uniq", Boolean;
    Key => "key", Boolean;
    Ro => "ro", Boolean;
    Hide => "hide", Boolean;
    Secret => "secret", Boolean;
    Fuzzy => "fuzzy", Boolean;
}

impl Modifier {
    /// The field type a type keyword selects. `None` for other categories.
    pub fn field_type(&self) -> Option<FieldType> {
        let scalar = |t| Some(FieldType::Scalar(t));
        let list = |t| Some(FieldType::List(t));
        match self {
            Self::Int => scalar(ScalarType::Int),
            Self::Float => scalar(ScalarType::Float),
            Self::Bool => scalar(ScalarType::Bool),
            Self::Str => scalar(ScalarType::Str),
            Self::Kw => scalar(ScalarType::Kw),
            Self::Date => scalar(ScalarType::Date),
            Self::Time => scalar(ScalarType::Time),
            Self::Dt => scalar(ScalarType::DateTime),
            Self::Email => scalar(ScalarType::Email),
            Self::Href => scalar(ScalarType::Href),
            Self::ListI => list(ScalarType::Int),
            Self::ListF => list(ScalarType::Float),
            Self::ListB => list(ScalarType::Bool),
            Self::ListS => list(ScalarType::Str),
            _ => None,
        }
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// The stored value of one keyword.
#[derive(Debug, Clone, PartialEq)]
pub enum ModifierValue {
    /// A boolean keyword was present.
    Flag,
    /// An optional-value keyword appeared bare.
    Null,
    /// The raw, uncoerced substring after `=`.
    Raw(String),
    /// The coerced allow-list of an `in` keyword.
    List(Vec<Value>),
}

impl ModifierValue {
    /// Render as JSON: flags as `true`, raw values as strings.
    pub fn to_json(&self) -> Json {
        match self {
            Self::Flag => Json::Bool(true),
            Self::Null => Json::Null,
            Self::Raw(s) => Json::String(s.clone()),
            Self::List(items) => Json::Array(items.iter().map(Value::to_json).collect()),
        }
    }
}

/// Parsed result of a field spec string.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// Type selected by the type keyword, `str` when none was given.
    pub field_type: FieldType,
    /// Default coerced from the type keyword's value.
    pub default: Option<Value>,
    /// Every recognised keyword with its stored value.
    pub modifiers: BTreeMap<Modifier, ModifierValue>,
}

impl FieldSpec {
    /// The stored value of `modifier`, if present.
    pub fn get(&self, modifier: Modifier) -> Option<&ModifierValue> {
        self.modifiers.get(&modifier)
    }

    /// Whether `modifier` is present.
    pub fn has(&self, modifier: Modifier) -> bool {
        self.modifiers.contains_key(&modifier)
    }

    /// Whether a boolean keyword is set.
    pub fn flag(&self, modifier: Modifier) -> bool {
        matches!(self.get(modifier), Some(ModifierValue::Flag))
    }

    /// The raw value of `modifier`, if present with one.
    pub fn raw(&self, modifier: Modifier) -> Option<&str> {
        match self.get(modifier) {
            Some(ModifierValue::Raw(s)) => Some(s),
            _ => None,
        }
    }

    /// The full `xref` value, query fragment included.
    pub fn xref(&self) -> Option<&str> {
        self.raw(Modifier::XRef)
    }

    /// The kind name an `xref` points at, with any `?query` removed.
    pub fn xref_target(&self) -> Option<&str> {
        self.xref()
            .map(|x| x.split_once('?').map(|(name, _)| name).unwrap_or(x))
    }

    /// The coerced allow-list from `in`.
    pub fn allowed(&self) -> Option<&[Value]> {
        match self.get(Modifier::In) {
            Some(ModifierValue::List(items)) => Some(items),
            _ => None,
        }
    }

    /// The type keyword that was given, if any.
    pub fn type_keyword(&self) -> Option<Modifier> {
        self.modifiers
            .keys()
            .copied()
            .find(|m| m.category() == Category::Type)
    }

    /// Render as a flat JSON object: every keyword plus `type` and, when
    /// set, `default`.
    pub fn to_json(&self) -> Json {
        let mut map = serde_json::Map::new();
        for (modifier, value) in &self.modifiers {
            map.insert(modifier.keyword().to_string(), value.to_json());
        }
        map.insert("type".to_string(), Json::String(self.field_type.to_string()));
        if let Some(default) = &self.default {
            map.insert("default".to_string(), default.to_json());
        }
        Json::Object(map)
    }
}

/// Re-serialises to spec text. Parsing the output yields an equal spec.
impl fmt::Display for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (modifier, value)) in self.modifiers.iter().enumerate() {
            if i > 0 {
                f.write_str("#")?;
            }
            match value {
                ModifierValue::Flag | ModifierValue::Null => write!(f, "{modifier}")?,
                ModifierValue::Raw(raw) => write!(f, "{modifier}={raw}")?,
                ModifierValue::List(items) => {
                    write!(f, "{modifier}={}", Value::List(items.clone()))?
                }
            }
        }
        Ok(())
    }
}

impl FromStr for FieldSpec {
    type Err = GrammarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

/// Parse a field spec string.
///
/// # Errors
///
/// - [`GrammarError::MultipleTypes`] when more than one distinct type
///   keyword appears.
/// - [`GrammarError::MissingValue`] when an operator, query, render or
///   xref keyword has no value.
/// - [`GrammarError::InvalidLiteral`] when the default or an `in` element
///   does not parse as the field type.
pub fn parse(spec: &str) -> Result<FieldSpec, GrammarError> {
    let mut modifiers = BTreeMap::new();
    for segment in spec.split('#').filter(|s| !s.is_empty()) {
        let (keyword, value) = match segment.split_once('=') {
            Some((k, v)) => (k, Some(v).filter(|v| !v.is_empty())),
            None => (segment, None),
        };
        let Some(modifier) = Modifier::from_keyword(keyword) else {
            continue;
        };
        let category = modifier.category();
        let stored = match (category, value) {
            (Category::Boolean, _) => ModifierValue::Flag,
            (_, Some(raw)) => ModifierValue::Raw(raw.to_string()),
            (c, None) if c.requires_value() => {
                return Err(GrammarError::MissingValue {
                    keyword: keyword.to_string(),
                })
            }
            (_, None) => ModifierValue::Null,
        };
        modifiers.insert(modifier, stored);
    }

    let types: Vec<Modifier> = modifiers
        .keys()
        .copied()
        .filter(|m| m.category() == Category::Type)
        .collect();
    if types.len() > 1 {
        return Err(GrammarError::MultipleTypes {
            keywords: types.iter().map(|m| m.keyword().to_string()).collect(),
        });
    }

    let (field_type, default) = match types.first() {
        None => (FieldType::DEFAULT, None),
        Some(&modifier) => {
            let field_type = modifier.field_type().unwrap_or(FieldType::DEFAULT);
            let default = match modifiers.get(&modifier) {
                Some(ModifierValue::Raw(raw)) => Some(coerce(modifier, raw, field_type)?),
                _ => None,
            };
            (field_type, default)
        }
    };

    if let Some(ModifierValue::Raw(raw)) = modifiers.get(&Modifier::In) {
        let element = FieldType::List(field_type.element());
        let allowed = match coerce(Modifier::In, raw, element)? {
            Value::List(items) => items,
            other => vec![other],
        };
        modifiers.insert(Modifier::In, ModifierValue::List(allowed));
    }

    Ok(FieldSpec {
        field_type,
        default,
        modifiers,
    })
}

fn coerce(modifier: Modifier, raw: &str, target: FieldType) -> Result<Value, GrammarError> {
    target.coerce(raw).ok_or_else(|| GrammarError::InvalidLiteral {
        keyword: modifier.keyword().to_string(),
        value: raw.to_string(),
        expected: target.to_string(),
    })
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn keywords_of(category: Category) -> Vec<&'static str> {
        Modifier::ALL
            .iter()
            .filter(|m| m.category() == category)
            .map(Modifier::keyword)
            .collect()
    }

    fn type_keyword() -> impl Strategy<Value = &'static str> {
        prop::sample::select(keywords_of(Category::Type))
    }

    fn required_keyword() -> impl Strategy<Value = &'static str> {
        let required: Vec<&'static str> = Modifier::ALL
            .iter()
            .filter(|m| m.category().requires_value())
            .map(Modifier::keyword)
            .collect();
        prop::sample::select(required)
    }

    fn flag_keyword() -> impl Strategy<Value = &'static str> {
        prop::sample::select(keywords_of(Category::Boolean))
    }

    /// A segment that never causes an error on its own.
    fn valid_segment() -> impl Strategy<Value = String> {
        prop_oneof![
            flag_keyword().prop_map(str::to_string),
            (required_keyword(), "[a-z0-9?=,]{1,6}")
                .prop_filter("in needs str-coercible elements", |(k, _)| *k != "in")
                .prop_map(|(k, v)| format!("{k}={v}")),
            prop::sample::select(keywords_of(Category::Ux)).prop_map(str::to_string),
        ]
    }

    fn unknown_segment() -> impl Strategy<Value = String> {
        ("[a-z]{2,8}", prop::option::of("[a-z0-9]{0,4}"))
            .prop_filter("must not be a keyword", |(k, _)| {
                Modifier::from_keyword(k).is_none()
            })
            .prop_map(|(k, v)| match v {
                Some(v) => format!("{k}={v}"),
                None => k,
            })
    }

    fn typed_head() -> impl Strategy<Value = String> {
        prop_oneof![
            Just(String::new()),
            (0i64..1000).prop_map(|n| format!("int={n}")),
            Just("int".to_string()),
            prop::collection::vec(0i64..100, 1..4).prop_map(|v| {
                let items: Vec<String> = v.iter().map(i64::to_string).collect();
                format!("listi={}", items.join(","))
            }),
            prop::collection::vec("[a-z]{1,4}", 1..4)
                .prop_map(|v| format!("str#in={}", v.join(","))),
            Just("bool=no".to_string()),
            Just("date=2024-11-10".to_string()),
            (-1.0e6f64..1.0e6).prop_map(|x| format!("float={x}")),
            prop::collection::vec(-100.0f64..100.0, 1..4).prop_map(|v| {
                let items: Vec<String> = v.iter().map(f64::to_string).collect();
                format!("float#in={}", items.join(","))
            }),
            (0u32..24, 0u32..60).prop_map(|(h, m)| format!("time={h:02}:{m:02}")),
            Just("dt=2024-11-10T08:15:00".to_string()),
        ]
    }

    proptest! {
        /// Two distinct type keywords are always rejected.
        #[test]
        fn multiple_types_always_fail(
            a in type_keyword(),
            b in type_keyword(),
            extra in prop::collection::vec(flag_keyword(), 0..3),
        ) {
            prop_assume!(a != b);
            let spec = format!("{a}#{}#{b}", extra.join("#"));
            let result = parse(&spec);
            prop_assert!(
                matches!(result, Err(GrammarError::MultipleTypes { .. })),
                "{spec} parsed as {result:?}"
            );
        }

        /// A value-required keyword without a value names itself.
        #[test]
        fn missing_value_always_fails(
            keyword in required_keyword(),
            prefix in prop::collection::vec(flag_keyword(), 0..3),
        ) {
            let spec = format!("{}#{keyword}", prefix.join("#"));
            prop_assert_eq!(
                parse(&spec),
                Err(GrammarError::MissingValue { keyword: keyword.to_string() })
            );
        }

        /// Unknown segments never change the parse of the known ones.
        #[test]
        fn unknown_segments_dropped(
            head in typed_head(),
            known in prop::collection::vec(valid_segment(), 0..4),
            unknown in prop::collection::vec(unknown_segment(), 1..3),
        ) {
            let mut base = vec![head.clone()];
            base.extend(known.iter().cloned());
            let mut noisy = vec![head];
            noisy.extend(unknown.iter().cloned());
            noisy.extend(known.iter().cloned());

            let clean = parse(&base.join("#"));
            prop_assert!(clean.is_ok(), "{:?}", clean);
            prop_assert_eq!(parse(&noisy.join("#")), clean);
        }

        /// Re-serialising a parsed spec and parsing again is a fixed point.
        #[test]
        fn reserialise_is_idempotent(
            head in typed_head(),
            known in prop::collection::vec(valid_segment(), 0..5),
        ) {
            let mut parts = vec![head];
            parts.extend(known);
            let first = parse(&parts.join("#")).unwrap();
            let second = parse(&first.to_string()).unwrap();
            prop_assert_eq!(second, first);
        }
    }
}
