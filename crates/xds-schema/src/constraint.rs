//! # Constraints — Operators, Queries and the Instance Audit
//!
//! Field specs carry constraint keywords whose operands stay raw strings
//! at compile time (`gt=45`, `range=1,10`). This module gives them meaning:
//!
//! - [`compare`] evaluates a comparison operator between two values.
//! - [`query`] evaluates a membership or positional query against a list.
//! - [`audit`] checks every field of an instance against its spec and
//!   reports each violation. It never rejects or mutates the instance.
//!
//! Operands are coerced to the field's declared element type when audited.
//! `uniq` and `key` span several instances and are not checked here.

use std::cmp::Ordering;
use std::fmt;

use crate::compiler::FieldDefinition;
use crate::instance::Instance;
use crate::modifier::{Category, FieldSpec, Modifier, ModifierValue};
use crate::value::{FieldType, ScalarType, Value};

/// Comparison operator. `max` reads as `le`, `min` as `ge`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Greater than.
    Gt,
    /// Less than.
    Lt,
    /// Greater than or equal.
    Ge,
    /// Less than or equal.
    Le,
}

impl Operator {
    /// The operator an operator-category keyword stands for.
    pub fn from_modifier(modifier: Modifier) -> Option<Self> {
        match modifier {
            Modifier::Eq => Some(Self::Eq),
            Modifier::Ne => Some(Self::Ne),
            Modifier::Gt => Some(Self::Gt),
            Modifier::Lt => Some(Self::Lt),
            Modifier::Ge | Modifier::Min => Some(Self::Ge),
            Modifier::Le | Modifier::Max => Some(Self::Le),
            _ => None,
        }
    }

    /// Short name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Gt => "gt",
            Self::Lt => "lt",
            Self::Ge => "ge",
            Self::Le => "le",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query over a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Query {
    /// The collection contains the operand.
    Has,
    /// Same as `Has`, read as an allow-list.
    In,
    /// Same as `In`.
    Enum,
    /// The first element equals the operand.
    Start,
    /// The last element equals the operand.
    End,
    /// Every element lies within the operand pair `[lo, hi]`.
    Range,
}

impl Query {
    /// The query a query-category keyword stands for.
    pub fn from_modifier(modifier: Modifier) -> Option<Self> {
        match modifier {
            Modifier::Has => Some(Self::Has),
            Modifier::In => Some(Self::In),
            Modifier::Enum => Some(Self::Enum),
            Modifier::Start => Some(Self::Start),
            Modifier::End => Some(Self::End),
            Modifier::Range => Some(Self::Range),
            _ => None,
        }
    }
}

/// Order two values of compatible types. Integers and floats compare
/// numerically with each other.
fn order(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
        (Value::Int(x), Value::Float(y)) => (*x as f64).partial_cmp(y),
        (Value::Float(x), Value::Int(y)) => x.partial_cmp(&(*y as f64)),
        (Value::Float(x), Value::Float(y)) => x.partial_cmp(y),
        (Value::Str(x), Value::Str(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Date(x), Value::Date(y)) => Some(x.cmp(y)),
        (Value::Time(x), Value::Time(y)) => Some(x.cmp(y)),
        (Value::DateTime(x), Value::DateTime(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn equal(a: &Value, b: &Value) -> bool {
    order(a, b).map_or_else(|| a == b, Ordering::is_eq)
}

/// Evaluate `a <op> b`. Returns `None` when an ordering operator is applied
/// to values that have no common order.
pub fn compare(op: Operator, a: &Value, b: &Value) -> Option<bool> {
    match op {
        Operator::Eq => Some(equal(a, b)),
        Operator::Ne => Some(!equal(a, b)),
        Operator::Gt => order(a, b).map(Ordering::is_gt),
        Operator::Lt => order(a, b).map(Ordering::is_lt),
        Operator::Ge => order(a, b).map(Ordering::is_ge),
        Operator::Le => order(a, b).map(Ordering::is_le),
    }
}

/// Evaluate a query of `operand` against `collection`. Returns `None` for
/// `Range` when the operand is not a two-element list, or when an element
/// cannot be ordered against the bounds.
pub fn query(q: Query, operand: &Value, collection: &[Value]) -> Option<bool> {
    match q {
        Query::Has | Query::In | Query::Enum => Some(collection.iter().any(|x| equal(x, operand))),
        Query::Start => Some(collection.first().map_or(false, |x| equal(x, operand))),
        Query::End => Some(collection.last().map_or(false, |x| equal(x, operand))),
        Query::Range => {
            let [lo, hi] = operand.as_list()? else {
                return None;
            };
            collection.iter().try_fold(true, |ok, x| {
                let within = compare(Operator::Ge, x, lo)? && compare(Operator::Le, x, hi)?;
                Some(ok && within)
            })
        }
    }
}

// ─── Violations ──────────────────────────────────────────────────────

/// A single constraint violation.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    /// Dot-path of the field from the schema root.
    pub qualifier: String,
    /// The keyword that was violated.
    pub modifier: String,
    /// Human-readable description.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "  {} [{}]: {}", self.qualifier, self.modifier, self.message)
    }
}

/// Collection of constraint violations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationViolations {
    violations: Vec<Violation>,
}

impl ValidationViolations {
    /// Returns the number of violations.
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// Returns true if there are no violations.
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Returns a slice of all violations.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Consumes self and returns the inner Vec.
    pub fn into_inner(self) -> Vec<Violation> {
        self.violations
    }

    fn push(&mut self, field: &FieldDefinition, modifier: Modifier, message: String) {
        self.violations.push(Violation {
            qualifier: field.qualifier.clone(),
            modifier: modifier.keyword().to_string(),
            message,
        });
    }
}

impl fmt::Display for ValidationViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

// ─── Audit ───────────────────────────────────────────────────────────

/// Check every field of `instance`, nested instances included, against
/// its field spec.
pub fn audit(instance: &Instance) -> ValidationViolations {
    let mut out = ValidationViolations::default();
    audit_into(instance, &mut out);
    out
}

fn audit_into(instance: &Instance, out: &mut ValidationViolations) {
    for field in instance.schema().fields() {
        if field.is_system() {
            continue;
        }
        let value = instance.get(&field.var).unwrap_or(&Value::Null);
        if let Some(spec) = &field.modifiers {
            audit_field(field, spec, value, out);
        }
        match value {
            Value::Instance(nested) => audit_into(nested, out),
            Value::List(items) => {
                for item in items {
                    if let Value::Instance(nested) = item {
                        audit_into(nested, out);
                    }
                }
            }
            _ => {}
        }
    }
}

fn audit_field(field: &FieldDefinition, spec: &FieldSpec, value: &Value, out: &mut ValidationViolations) {
    if spec.flag(Modifier::Req) && is_blank(value) {
        out.push(field, Modifier::Req, "value is required".to_string());
    }
    if value.is_null() {
        return;
    }

    let element = spec.field_type.element();
    let single = [value.clone()];
    let items: &[Value] = value.as_list().unwrap_or(&single);

    for (&modifier, stored) in &spec.modifiers {
        match modifier.category() {
            Category::Operator => {
                let (Some(op), ModifierValue::Raw(raw)) = (Operator::from_modifier(modifier), stored)
                else {
                    continue;
                };
                let bound = operand(element, raw);
                for item in items {
                    if compare(op, item, &bound) != Some(true) {
                        out.push(field, modifier, format!("{item} is not {op} {bound}"));
                    }
                }
            }
            Category::Query => {
                let Some(q) = Query::from_modifier(modifier) else {
                    continue;
                };
                if let Some(message) = check_query(q, element, stored, value, items) {
                    out.push(field, modifier, message);
                }
            }
            _ => {}
        }
    }
}

fn check_query(
    q: Query,
    element: ScalarType,
    stored: &ModifierValue,
    value: &Value,
    items: &[Value],
) -> Option<String> {
    match q {
        Query::In | Query::Enum => {
            let allowed = match stored {
                ModifierValue::List(allowed) => allowed.clone(),
                ModifierValue::Raw(raw) => raw.split(',').map(|s| operand(element, s)).collect(),
                _ => return None,
            };
            items
                .iter()
                .find(|item| !allowed.iter().any(|a| equal(item, a)))
                .map(|item| format!("{item} is not one of [{}]", Value::List(allowed.clone())))
        }
        Query::Range => {
            let ModifierValue::Raw(raw) = stored else {
                return None;
            };
            let bounds = FieldType::List(element)
                .coerce(raw)
                .unwrap_or_else(|| Value::List(raw.split(',').map(Value::from).collect()));
            match query(Query::Range, &bounds, items) {
                Some(true) => None,
                _ => Some(format!("{value} is outside range {raw}")),
            }
        }
        Query::Has | Query::Start | Query::End => {
            let ModifierValue::Raw(raw) = stored else {
                return None;
            };
            let holds = match value {
                Value::Str(text) => match q {
                    Query::Start => text.starts_with(raw.as_str()),
                    Query::End => text.ends_with(raw.as_str()),
                    _ => text.contains(raw.as_str()),
                },
                _ => query(q, &operand(element, raw), items).unwrap_or(false),
            };
            let verb = match q {
                Query::Start => "start with",
                Query::End => "end with",
                _ => "contain",
            };
            (!holds).then(|| format!("{value} does not {verb} {raw}"))
        }
    }
}

/// Coerce a raw operand to the field's element type, keeping it as text
/// when it does not parse.
fn operand(element: ScalarType, raw: &str) -> Value {
    element.parse(raw).unwrap_or_else(|| Value::Str(raw.to_string()))
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Str(s) => s.is_empty(),
        Value::List(items) => items.is_empty(),
        _ => false,
    }
}
