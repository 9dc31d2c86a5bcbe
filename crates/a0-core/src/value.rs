//! The A0 value model.
//!
//! A0 values are a small tagged union: `null`, `boolean`, `number`, `string`,
//! `list`, and `record`. Records preserve insertion order and disallow
//! duplicate keys; [`indexmap::IndexMap`] gives us that for free while still
//! comparing equal regardless of key order, which is exactly the deep
//! equality rule this language specifies.

use indexmap::IndexMap;
use std::fmt;

/// An A0 record: an ordered, duplicate-free set of string-keyed values.
///
/// Iteration order is insertion order. Re-assigning an existing key updates
/// the value in place without moving it to the end.
pub type Record = IndexMap<String, Value>;

/// An A0 runtime value.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Boolean(bool),
    /// All A0 numbers are binary64 floats; integer vs. float is a rendering
    /// distinction made at the JSON boundary, not a separate runtime type.
    Number(f64),
    String(String),
    List(Vec<Value>),
    Record(Record),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Record(_) => "record",
        }
    }

    /// Truthiness per the language's single coercion rule: `null` and
    /// `false` are falsy, everything else (including `0`, `""`, `[]`, `{}`)
    /// is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Null | Value::Boolean(false))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn record(pairs: impl IntoIterator<Item = (String, Value)>) -> Value {
        Value::Record(pairs.into_iter().collect())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{}", render_number(*n)),
            Value::String(s) => write!(f, "{s}"),
            Value::List(_) | Value::Record(_) => {
                write!(f, "{}", crate::json::value_to_json(self))
            }
        }
    }
}

/// Render a number the way the JSON codec does: integral, finite values
/// print without a decimal point.
pub fn render_number(n: f64) -> String {
    if n.is_finite() && n == n.trunc() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_rules() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Boolean(false).is_truthy());
        assert!(Value::Boolean(true).is_truthy());
        assert!(Value::Number(0.0).is_truthy());
        assert!(Value::String(String::new()).is_truthy());
        assert!(Value::List(vec![]).is_truthy());
        assert!(Value::Record(Record::new()).is_truthy());
    }

    #[test]
    fn record_equality_ignores_key_order() {
        let a = Value::record([("x".to_string(), Value::Number(1.0)), ("y".to_string(), Value::Number(2.0))]);
        let b = Value::record([("y".to_string(), Value::Number(2.0)), ("x".to_string(), Value::Number(1.0))]);
        assert_eq!(a, b);
    }

    #[test]
    fn record_update_keeps_position() {
        let mut r = Record::new();
        r.insert("a".to_string(), Value::Number(1.0));
        r.insert("b".to_string(), Value::Number(2.0));
        r.insert("a".to_string(), Value::Number(99.0));
        let keys: Vec<&str> = r.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(r.get("a"), Some(&Value::Number(99.0)));
    }

    #[test]
    fn list_equality_is_order_sensitive() {
        let a = Value::List(vec![Value::Number(1.0), Value::Number(2.0)]);
        let b = Value::List(vec![Value::Number(2.0), Value::Number(1.0)]);
        assert_ne!(a, b);
    }

    #[test]
    fn integral_numbers_render_without_decimal() {
        assert_eq!(render_number(3.0), "3");
        assert_eq!(render_number(3.5), "3.5");
    }
}
