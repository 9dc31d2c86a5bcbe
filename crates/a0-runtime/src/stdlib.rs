//! The built-in function library. Every entry here is a pure function of a
//! single argument record, mirroring the calling convention every A0 call
//! site uses. The higher-order names in [`HIGHER_ORDER_NAMES`]
//! (`map`/`reduce`/`filter`/`find`/`sort`/`pluck`) are not defined in this
//! module at all: they take the name of a declared function under a `fn`/`by`
//! key and are dispatched inside the evaluator, since only it can call back
//! into user code.

use crate::json_ops;
use a0_core::{Record, Value};
use a0_diagnostics::{Diagnostic, ErrorCode};

pub type StdlibFn = fn(&Record) -> Result<Value, Diagnostic>;

/// Names handled specially by the evaluator because they need to invoke a
/// user- or stdlib-function argument rather than just transform data.
pub const HIGHER_ORDER_NAMES: &[&str] = &["map", "reduce", "filter", "find", "sort", "pluck"];

pub fn lookup(name: &str) -> Option<StdlibFn> {
    Some(match name {
        "eq" => eq,
        "not" => not,
        "and" => and,
        "or" => or,
        "coalesce" => coalesce,
        "typeof" => type_of,
        "len" => len,
        "append" => append,
        "concat" => concat,
        "unique" => unique,
        "flat" => flat,
        "get" => get,
        "put" => put,
        "patch" => patch,
        "parse.json" => parse_json,
        "keys" => keys,
        "values" => values,
        "merge" => merge,
        "entries" => entries,
        "range" => range,
        "join" => join,
        "contains" => contains,
        "math.max" => math_max,
        "math.min" => math_min,
        "str.concat" => str_concat,
        "str.split" => str_split,
        "str.starts" => str_starts,
        "str.ends" => str_ends,
        "str.replace" => str_replace,
        "str.template" => str_template,
        _ => return None,
    })
}

fn field<'a>(args: &'a Record, fname: &str, key: &str) -> Result<&'a Value, Diagnostic> {
    args.get(key).ok_or_else(|| missing_field(fname, key))
}

fn missing_field(name: &str, key: &str) -> Diagnostic {
    Diagnostic::error(
        ErrorCode::EToolArgs,
        format!("`{name}` requires a `{key}` field"),
        None,
    )
}

fn type_error(name: &str, arg: &Value) -> Diagnostic {
    Diagnostic::error(
        ErrorCode::EType,
        format!("`{name}` cannot operate on a {}", arg.type_name()),
        None,
    )
}

fn as_list<'a>(name: &str, value: &'a Value) -> Result<&'a [Value], Diagnostic> {
    match value {
        Value::List(items) => Ok(items),
        other => Err(type_error(name, other)),
    }
}

fn as_str_field<'a>(name: &str, value: &'a Value) -> Result<&'a str, Diagnostic> {
    value.as_str().ok_or_else(|| type_error(name, value))
}

fn eq(args: &Record) -> Result<Value, Diagnostic> {
    let a = field(args, "eq", "a")?;
    let b = field(args, "eq", "b")?;
    Ok(Value::Boolean(a == b))
}

fn not(args: &Record) -> Result<Value, Diagnostic> {
    let v = field(args, "not", "that")?;
    Ok(Value::Boolean(!v.is_truthy()))
}

fn variadic_values<'a>(args: &'a Record, name: &str) -> Result<&'a [Value], Diagnostic> {
    as_list(name, field(args, name, "values")?)
}

fn and(args: &Record) -> Result<Value, Diagnostic> {
    let values = variadic_values(args, "and")?;
    Ok(Value::Boolean(values.iter().all(Value::is_truthy)))
}

fn or(args: &Record) -> Result<Value, Diagnostic> {
    let values = variadic_values(args, "or")?;
    Ok(Value::Boolean(values.iter().any(Value::is_truthy)))
}

fn coalesce(args: &Record) -> Result<Value, Diagnostic> {
    let values = variadic_values(args, "coalesce")?;
    Ok(values
        .iter()
        .find(|v| !matches!(v, Value::Null))
        .cloned()
        .unwrap_or(Value::Null))
}

fn type_of(args: &Record) -> Result<Value, Diagnostic> {
    let v = field(args, "typeof", "value")?;
    Ok(Value::String(v.type_name().to_string()))
}

fn len(args: &Record) -> Result<Value, Diagnostic> {
    let v = field(args, "len", "value")?;
    let n = match v {
        Value::List(items) => items.len(),
        Value::Record(r) => r.len(),
        Value::String(s) => s.chars().count(),
        other => return Err(type_error("len", other)),
    };
    Ok(Value::Number(n as f64))
}

fn append(args: &Record) -> Result<Value, Diagnostic> {
    let list = as_list("append", field(args, "append", "list")?)?;
    let value = field(args, "append", "value")?;
    let mut items = list.to_vec();
    items.push(value.clone());
    Ok(Value::List(items))
}

fn concat(args: &Record) -> Result<Value, Diagnostic> {
    let lists = as_list("concat", field(args, "concat", "lists")?)?;
    let mut out = Vec::new();
    for l in lists {
        out.extend(as_list("concat", l)?.iter().cloned());
    }
    Ok(Value::List(out))
}

fn unique(args: &Record) -> Result<Value, Diagnostic> {
    let list = as_list("unique", field(args, "unique", "list")?)?;
    let mut out: Vec<Value> = Vec::new();
    for item in list {
        if !out.contains(item) {
            out.push(item.clone());
        }
    }
    Ok(Value::List(out))
}

fn flat(args: &Record) -> Result<Value, Diagnostic> {
    let list = as_list("flat", field(args, "flat", "list")?)?;
    let mut out = Vec::new();
    for item in list {
        match item {
            Value::List(inner) => out.extend(inner.iter().cloned()),
            other => out.push(other.clone()),
        }
    }
    Ok(Value::List(out))
}

fn get(args: &Record) -> Result<Value, Diagnostic> {
    let value = field(args, "get", "value")?;
    let path = as_str_field("get", field(args, "get", "path")?)?;
    Ok(json_ops::get(value, path).unwrap_or(Value::Null))
}

fn put(args: &Record) -> Result<Value, Diagnostic> {
    let value = field(args, "put", "value")?;
    let path = as_str_field("put", field(args, "put", "path")?)?;
    let with = field(args, "put", "with")?;
    json_ops::put(value, path, with.clone())
}

fn patch(args: &Record) -> Result<Value, Diagnostic> {
    let value = field(args, "patch", "value")?;
    let ops = as_list("patch", field(args, "patch", "ops")?)?;
    json_ops::patch(value, ops)
}

fn parse_json(args: &Record) -> Result<Value, Diagnostic> {
    let text = as_str_field("parse.json", field(args, "parse.json", "text")?)?;
    a0_core::json::parse_json_str(text)
        .map_err(|e| Diagnostic::error(ErrorCode::EType, format!("parse.json: {e}"), None))
}

fn as_record_field<'a>(name: &str, value: &'a Value) -> Result<&'a Record, Diagnostic> {
    value.as_record().ok_or_else(|| type_error(name, value))
}

fn keys(args: &Record) -> Result<Value, Diagnostic> {
    let r = as_record_field("keys", field(args, "keys", "value")?)?;
    Ok(Value::List(r.keys().map(|k| Value::String(k.clone())).collect()))
}

fn values(args: &Record) -> Result<Value, Diagnostic> {
    let r = as_record_field("values", field(args, "values", "value")?)?;
    Ok(Value::List(r.values().cloned().collect()))
}

fn merge(args: &Record) -> Result<Value, Diagnostic> {
    let a = field(args, "merge", "a")?;
    let b = field(args, "merge", "b")?;
    json_ops::merge(a, b)
}

fn entries(args: &Record) -> Result<Value, Diagnostic> {
    let r = as_record_field("entries", field(args, "entries", "value")?)?;
    Ok(Value::List(
        r.iter()
            .map(|(k, v)| {
                Value::record(vec![
                    ("key".to_string(), Value::String(k.clone())),
                    ("value".to_string(), v.clone()),
                ])
            })
            .collect(),
    ))
}

fn range(args: &Record) -> Result<Value, Diagnostic> {
    let from_value = field(args, "range", "from")?;
    let from = from_value.as_number().ok_or_else(|| type_error("range", from_value))? as i64;
    let to_value = field(args, "range", "to")?;
    let to = to_value.as_number().ok_or_else(|| type_error("range", to_value))? as i64;
    Ok(Value::List((from..to).map(|n| Value::Number(n as f64)).collect()))
}

fn join(args: &Record) -> Result<Value, Diagnostic> {
    let list = as_list("join", field(args, "join", "list")?)?;
    let sep = as_str_field("join", field(args, "join", "sep")?)?;
    let parts: Vec<String> = list
        .iter()
        .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
        .collect();
    Ok(Value::String(parts.join(sep)))
}

fn contains(args: &Record) -> Result<Value, Diagnostic> {
    let value = field(args, "contains", "value")?;
    let item = field(args, "contains", "item")?;
    let found = match value {
        Value::List(items) => items.contains(item),
        Value::String(s) => item.as_str().map(|needle| s.contains(needle)).unwrap_or(false),
        other => return Err(type_error("contains", other)),
    };
    Ok(Value::Boolean(found))
}

fn math_max(args: &Record) -> Result<Value, Diagnostic> {
    numeric_fold("math.max", variadic_values(args, "math.max")?, f64::max)
}

fn math_min(args: &Record) -> Result<Value, Diagnostic> {
    numeric_fold("math.min", variadic_values(args, "math.min")?, f64::min)
}

fn numeric_fold(name: &str, values: &[Value], f: fn(f64, f64) -> f64) -> Result<Value, Diagnostic> {
    if values.is_empty() {
        return Err(missing_field(name, "values"));
    }
    let mut acc = values[0].as_number().ok_or_else(|| type_error(name, &values[0]))?;
    for v in &values[1..] {
        acc = f(acc, v.as_number().ok_or_else(|| type_error(name, v))?);
    }
    Ok(Value::Number(acc))
}

fn str_concat(args: &Record) -> Result<Value, Diagnostic> {
    let values = variadic_values(args, "str.concat")?;
    let mut out = String::new();
    for v in values {
        out.push_str(as_str_field("str.concat", v)?);
    }
    Ok(Value::String(out))
}

fn str_split(args: &Record) -> Result<Value, Diagnostic> {
    let s = as_str_field("str.split", field(args, "str.split", "value")?)?;
    let sep = as_str_field("str.split", field(args, "str.split", "sep")?)?;
    Ok(Value::List(s.split(sep).map(|p| Value::String(p.to_string())).collect()))
}

fn str_starts(args: &Record) -> Result<Value, Diagnostic> {
    let s = as_str_field("str.starts", field(args, "str.starts", "value")?)?;
    let prefix = as_str_field("str.starts", field(args, "str.starts", "with")?)?;
    Ok(Value::Boolean(s.starts_with(prefix)))
}

fn str_ends(args: &Record) -> Result<Value, Diagnostic> {
    let s = as_str_field("str.ends", field(args, "str.ends", "value")?)?;
    let suffix = as_str_field("str.ends", field(args, "str.ends", "with")?)?;
    Ok(Value::Boolean(s.ends_with(suffix)))
}

fn str_replace(args: &Record) -> Result<Value, Diagnostic> {
    let s = as_str_field("str.replace", field(args, "str.replace", "value")?)?;
    let from = as_str_field("str.replace", field(args, "str.replace", "from")?)?;
    let to = as_str_field("str.replace", field(args, "str.replace", "to")?)?;
    Ok(Value::String(s.replace(from, to)))
}

/// `{name}`-style placeholder substitution against a record of values.
fn str_template(args: &Record) -> Result<Value, Diagnostic> {
    let template = as_str_field("str.template", field(args, "str.template", "template")?)?;
    let fields = as_record_field("str.template", field(args, "str.template", "values")?)?;
    let mut out = String::new();
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '{' {
            let mut name = String::new();
            for c2 in chars.by_ref() {
                if c2 == '}' {
                    break;
                }
                name.push(c2);
            }
            match fields.get(&name) {
                Some(v) => out.push_str(&v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string())),
                None => {
                    return Err(Diagnostic::error(
                        ErrorCode::EType,
                        format!("str.template: no field `{name}`"),
                        None,
                    ))
                }
            }
        } else {
            out.push(c);
        }
    }
    Ok(Value::String(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(pairs: Vec<(&str, Value)>) -> Record {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn eq_compares_values_structurally() {
        assert_eq!(
            eq(&rec(vec![("a", Value::Number(1.0)), ("b", Value::Number(1.0))])).unwrap(),
            Value::Boolean(true)
        );
    }

    #[test]
    fn len_handles_all_collection_kinds() {
        assert_eq!(
            len(&rec(vec![("value", Value::String("abc".into()))])).unwrap(),
            Value::Number(3.0)
        );
        assert_eq!(
            len(&rec(vec![(
                "value",
                Value::List(vec![Value::Null, Value::Null])
            )]))
            .unwrap(),
            Value::Number(2.0)
        );
    }

    #[test]
    fn unique_preserves_first_occurrence_order() {
        let list = Value::List(vec![Value::Number(1.0), Value::Number(2.0), Value::Number(1.0)]);
        let result = unique(&rec(vec![("list", list)])).unwrap();
        assert_eq!(
            result,
            Value::List(vec![Value::Number(1.0), Value::Number(2.0)])
        );
    }

    #[test]
    fn range_is_half_open() {
        let result = range(&rec(vec![("from", Value::Number(0.0)), ("to", Value::Number(3.0))])).unwrap();
        assert_eq!(
            result,
            Value::List(vec![Value::Number(0.0), Value::Number(1.0), Value::Number(2.0)])
        );
    }

    #[test]
    fn range_from_equal_to_is_empty() {
        let result = range(&rec(vec![("from", Value::Number(5.0)), ("to", Value::Number(5.0))])).unwrap();
        assert_eq!(result, Value::List(vec![]));
    }

    #[test]
    fn str_template_substitutes_named_fields() {
        let fields = Value::record(vec![("name".to_string(), Value::String("Ada".to_string()))]);
        let result = str_template(&rec(vec![
            ("template", Value::String("hello {name}".to_string())),
            ("values", fields),
        ]))
        .unwrap();
        assert_eq!(result, Value::String("hello Ada".to_string()));
    }

    #[test]
    fn contains_checks_list_membership_and_substrings() {
        assert_eq!(
            contains(&rec(vec![
                ("value", Value::List(vec![Value::Number(1.0)])),
                ("item", Value::Number(1.0))
            ]))
            .unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            contains(&rec(vec![
                ("value", Value::String("hello".into())),
                ("item", Value::String("ell".into()))
            ]))
            .unwrap(),
            Value::Boolean(true)
        );
    }

    #[test]
    fn lookup_finds_namespaced_entries() {
        assert!(lookup("math.max").is_some());
        assert!(lookup("str.template").is_some());
        assert!(lookup("nonexistent").is_none());
    }

    #[test]
    fn missing_field_is_a_tool_args_error() {
        let err = range(&rec(vec![("from", Value::Number(0.0))])).unwrap_err();
        assert_eq!(err.code, ErrorCode::EToolArgs);
    }
}
