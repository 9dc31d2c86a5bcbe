//! JSON codec for A0 values.
//!
//! `value_to_json` / `json_to_value` are inverses for any `Value` that
//! contains no non-finite numbers — the round-trip law the language
//! guarantees. Numbers that are finite and integral (`v == v.trunc()`)
//! render as JSON integers; everything else renders as a JSON float.
//!
//! # Example
//!
//! ```rust
//! use a0_core::value::Value;
//! use a0_core::json::{value_to_json, json_to_value};
//!
//! let v = Value::record([("n".to_string(), Value::Number(3.0))]);
//! let json = value_to_json(&v);
//! assert_eq!(json, serde_json::json!({"n": 3}));
//! assert_eq!(json_to_value(&json), v);
//! ```

use crate::value::{Record, Value};
use serde_json::{Map, Number};

pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Boolean(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => number_to_json(*n),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::List(items) => serde_json::Value::Array(items.iter().map(value_to_json).collect()),
        Value::Record(record) => {
            let mut map = Map::new();
            for (k, v) in record {
                map.insert(k.clone(), value_to_json(v));
            }
            serde_json::Value::Object(map)
        }
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    if !n.is_finite() {
        tracing::warn!(value = n, "non-finite number rendered as JSON null");
        return serde_json::Value::Null;
    }
    if n == n.trunc() && n.abs() < 1e15 {
        serde_json::Value::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

pub fn json_to_value(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(*b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(items) => Value::List(items.iter().map(json_to_value).collect()),
        serde_json::Value::Object(map) => {
            let mut record = Record::new();
            for (k, v) in map {
                record.insert(k.clone(), json_to_value(v));
            }
            Value::Record(record)
        }
    }
}

pub fn parse_json_str(text: &str) -> Result<Value, serde_json::Error> {
    let json: serde_json::Value = serde_json::from_str(text)?;
    Ok(json_to_value(&json))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn round_trip_mixed_value() {
        let v = Value::record([
            ("ok".to_string(), Value::Boolean(true)),
            (
                "items".to_string(),
                Value::List(vec![Value::Number(1.0), Value::Number(2.5)]),
            ),
            ("name".to_string(), Value::String("a0".to_string())),
            ("nothing".to_string(), Value::Null),
        ]);
        let json = value_to_json(&v);
        assert_eq!(json_to_value(&json), v);
    }

    #[test]
    fn integral_float_renders_as_json_integer() {
        assert_eq!(value_to_json(&Value::Number(4.0)), json!(4));
        assert_eq!(value_to_json(&Value::Number(4.5)), json!(4.5));
    }

    #[test]
    fn non_finite_number_renders_as_null() {
        assert_eq!(value_to_json(&Value::Number(f64::NAN)), serde_json::Value::Null);
        assert_eq!(
            value_to_json(&Value::Number(f64::INFINITY)),
            serde_json::Value::Null
        );
    }

    #[test]
    fn parse_json_str_builds_value() {
        let v = parse_json_str(r#"{"a": [1, 2, 3]}"#).unwrap();
        assert_eq!(
            v,
            Value::record([(
                "a".to_string(),
                Value::List(vec![Value::Number(1.0), Value::Number(2.0), Value::Number(3.0)])
            )])
        );
    }
}
