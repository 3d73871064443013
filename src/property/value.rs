//! Dynamic values exchanged between drivers and the property engine.

use crate::error::{ScpiError, ScpiResult};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// A logical or wire-level property value.
///
/// Numeric variants compare loosely (`Int(1) == Float(1.0)`) because replies
/// are parsed as floats while mapped wire tokens are usually declared as
/// integers. `Bool` never equals a number.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// Boolean flag
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Floating point number
    Float(f64),
    /// Text token or free-form string
    Str(String),
    /// Comma separated reply
    List(Vec<PropertyValue>),
    /// Named fields extracted from a structured reply
    Record(BTreeMap<String, PropertyValue>),
}

impl PropertyValue {
    /// Parse a reply fragment, preferring integers, then floats, then text.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(i) = trimmed.parse::<i64>() {
            return PropertyValue::Int(i);
        }
        match trimmed.parse::<f64>() {
            Ok(f) => PropertyValue::Float(f),
            Err(_) => PropertyValue::Str(trimmed.to_string()),
        }
    }

    /// Like [`PropertyValue::parse`] but also accepts `true`/`false`.
    pub fn parse_user_input(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" => PropertyValue::Bool(true),
            "false" => PropertyValue::Bool(false),
            _ => Self::parse(raw),
        }
    }

    /// Numeric view of the value. Text is parsed when it looks like a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Int(i) => Some(*i as f64),
            PropertyValue::Float(f) => Some(*f),
            PropertyValue::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Integer view of the value. Floats are truncated toward zero.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(i) => Some(*i),
            PropertyValue::Float(f) if f.is_finite() => Some(f.trunc() as i64),
            PropertyValue::Bool(b) => Some(i64::from(*b)),
            PropertyValue::Str(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().map(|f| f.trunc() as i64))
            }
            _ => None,
        }
    }

    /// Borrow the text of a `Str` value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// True for `Int` and `Float`.
    pub fn is_number(&self) -> bool {
        matches!(self, PropertyValue::Int(_) | PropertyValue::Float(_))
    }

    /// Short type label used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            PropertyValue::Bool(_) => "bool",
            PropertyValue::Int(_) => "int",
            PropertyValue::Float(_) => "float",
            PropertyValue::Str(_) => "str",
            PropertyValue::List(_) => "list",
            PropertyValue::Record(_) => "record",
        }
    }
}

impl PartialEq for PropertyValue {
    fn eq(&self, other: &Self) -> bool {
        use PropertyValue::*;
        match (self, other) {
            (Bool(a), Bool(b)) => a == b,
            (Str(a), Str(b)) => a == b,
            (List(a), List(b)) => a == b,
            (Record(a), Record(b)) => a == b,
            (a, b) if a.is_number() && b.is_number() => a.as_f64() == b.as_f64(),
            _ => false,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            PropertyValue::Int(i) => write!(f, "{}", i),
            PropertyValue::Float(x) => write!(f, "{}", x),
            PropertyValue::Str(s) => f.write_str(s),
            PropertyValue::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
            PropertyValue::Record(fields) => {
                for (i, (key, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}={}", key, value)?;
                }
                Ok(())
            }
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Int(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        PropertyValue::Int(i64::from(value))
    }
}

impl From<u8> for PropertyValue {
    fn from(value: u8) -> Self {
        PropertyValue::Int(i64::from(value))
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Float(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Str(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Str(value)
    }
}

fn mismatch(expected: &str, got: &PropertyValue) -> ScpiError {
    ScpiError::Parse(format!(
        "expected {}, got {} '{}'",
        expected,
        got.kind(),
        got
    ))
}

impl TryFrom<PropertyValue> for f64 {
    type Error = ScpiError;

    fn try_from(value: PropertyValue) -> ScpiResult<Self> {
        value.as_f64().ok_or_else(|| mismatch("number", &value))
    }
}

impl TryFrom<PropertyValue> for i64 {
    type Error = ScpiError;

    fn try_from(value: PropertyValue) -> ScpiResult<Self> {
        match value {
            PropertyValue::Bool(_) => Err(mismatch("integer", &value)),
            ref v => v.as_i64().ok_or_else(|| mismatch("integer", v)),
        }
    }
}

impl TryFrom<PropertyValue> for bool {
    type Error = ScpiError;

    fn try_from(value: PropertyValue) -> ScpiResult<Self> {
        match value {
            PropertyValue::Bool(b) => Ok(b),
            other => Err(mismatch("bool", &other)),
        }
    }
}

impl TryFrom<PropertyValue> for String {
    type Error = ScpiError;

    fn try_from(value: PropertyValue) -> ScpiResult<Self> {
        match value {
            PropertyValue::Str(s) => Ok(s),
            PropertyValue::Record(_) => Err(mismatch("str", &value)),
            other => Ok(other.to_string()),
        }
    }
}

impl TryFrom<PropertyValue> for Vec<f64> {
    type Error = ScpiError;

    fn try_from(value: PropertyValue) -> ScpiResult<Self> {
        match value {
            PropertyValue::List(items) => items.into_iter().map(f64::try_from).collect(),
            single => Ok(vec![f64::try_from(single)?]),
        }
    }
}
