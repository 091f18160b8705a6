//! # Value Model
//!
//! Runtime type tags and comparison helpers over [`serde_json::Value`],
//! the in-memory data model matched against compiled schemas.
//!
//! Equality here is "loose": numbers compare by numeric value regardless
//! of integer/float representation, so `1` equals `1.0` both in
//! enumerations and in assertion expressions. Booleans never compare equal
//! to numbers.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Runtime kind of a data value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// `null`.
    Null,
    /// `true` / `false`.
    Boolean,
    /// Numbers representable as `i64` or `u64`.
    Integer,
    /// Every other number.
    Float,
    /// Strings.
    Text,
    /// Objects.
    Mapping,
    /// Arrays.
    Sequence,
}

impl ValueKind {
    /// All kinds, in declaration order.
    pub const ALL: [ValueKind; 7] = [
        ValueKind::Null,
        ValueKind::Boolean,
        ValueKind::Integer,
        ValueKind::Float,
        ValueKind::Text,
        ValueKind::Mapping,
        ValueKind::Sequence,
    ];

    /// Classify a value.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Boolean,
            Value::Number(n) if n.is_i64() || n.is_u64() => ValueKind::Integer,
            Value::Number(_) => ValueKind::Float,
            Value::String(_) => ValueKind::Text,
            Value::Array(_) => ValueKind::Sequence,
            Value::Object(_) => ValueKind::Mapping,
        }
    }

    /// Canonical type-descriptor token for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Boolean => "boolean",
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::Text => "text",
            ValueKind::Mapping => "mapping",
            ValueKind::Sequence => "sequence",
        }
    }

    /// Parse a primitive type-descriptor token.
    ///
    /// Accepts the canonical names plus the aliases older schemas were
    /// written with (`dict`, `list`, `str`, `int`, `bool`, `None`, ...).
    pub fn parse(token: &str) -> Option<Self> {
        let kind = match token {
            "null" | "none" | "None" => ValueKind::Null,
            "boolean" | "bool" => ValueKind::Boolean,
            "integer" | "int" => ValueKind::Integer,
            "float" | "floating" | "double" => ValueKind::Float,
            "text" | "str" | "string" => ValueKind::Text,
            "mapping" | "dict" | "map" | "object" => ValueKind::Mapping,
            "sequence" | "list" | "array" => ValueKind::Sequence,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numeric view of a JSON number used for cross-representation math.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    pub(crate) fn of(value: &Value) -> Option<Self> {
        let n = match value {
            Value::Number(n) => n,
            _ => return None,
        };
        if let Some(i) = n.as_i64() {
            Some(Num::Int(i))
        } else {
            n.as_f64().map(Num::Float)
        }
    }

    pub(crate) fn as_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(f) => f,
        }
    }

    /// Convert back to a JSON value. Non-finite floats have no JSON form.
    pub(crate) fn into_value(self) -> Option<Value> {
        match self {
            Num::Int(i) => Some(Value::from(i)),
            Num::Float(f) => serde_json::Number::from_f64(f).map(Value::Number),
        }
    }
}

fn compare_numbers(a: &serde_json::Number, b: &serde_json::Number) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return Some(x.cmp(&y));
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return Some(x.cmp(&y));
    }
    a.as_f64()?.partial_cmp(&b.as_f64()?)
}

/// Equality with numbers compared by value.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y) == Some(Ordering::Equal),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| loose_eq(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).is_some_and(|other| loose_eq(v, other)))
        }
        _ => a == b,
    }
}

/// Ordering between two values, if they are comparable.
///
/// Numbers order numerically, text lexicographically by code point,
/// booleans `false < true`, and sequences element-wise.
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Array(x), Value::Array(y)) => {
            for (l, r) in x.iter().zip(y) {
                match compare(l, r)? {
                    Ordering::Equal => continue,
                    other => return Some(other),
                }
            }
            Some(x.len().cmp(&y.len()))
        }
        _ => None,
    }
}

/// Truthiness: `null`, `false`, zero, and empty text/sequence/mapping are falsy.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
