//! Dotted-path navigation (`get`/`put`) and the `merge`/`patch` stdlib
//! primitives. Values are immutable from the language's point of view:
//! `put` and `patch` both return a new value rather than mutating in place.

use a0_core::{Record, Value};
use a0_diagnostics::{Diagnostic, ErrorCode};

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Field(String),
    Index(usize),
}

fn parse_path(path: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    for part in path.split('.') {
        if part.is_empty() {
            continue;
        }
        let mut rest = part;
        if let Some(dot) = rest.find('[') {
            let (field, tail) = rest.split_at(dot);
            if !field.is_empty() {
                segments.push(Segment::Field(field.to_string()));
            }
            rest = tail;
            for idx_part in rest.split('[').skip(1) {
                if let Some(end) = idx_part.find(']') {
                    if let Ok(n) = idx_part[..end].parse::<usize>() {
                        segments.push(Segment::Index(n));
                    }
                }
            }
        } else {
            segments.push(Segment::Field(rest.to_string()));
        }
    }
    segments
}

/// Reads a value out of `root` by dotted path, e.g. `"a.b[0].c"`. Returns
/// `None` if any segment along the way is missing or the wrong shape.
pub fn get(root: &Value, path: &str) -> Option<Value> {
    let mut current = root.clone();
    for segment in parse_path(path) {
        current = match (&segment, &current) {
            (Segment::Field(name), Value::Record(record)) => record.get(name)?.clone(),
            (Segment::Index(i), Value::List(items)) => items.get(*i)?.clone(),
            _ => return None,
        };
    }
    Some(current)
}

/// Writes `value` into `root` at the dotted path, creating intermediate
/// records as needed, and returns the new whole value.
pub fn put(root: &Value, path: &str, value: Value) -> Result<Value, Diagnostic> {
    let segments = parse_path(path);
    put_segments(root, &segments, value)
}

fn put_segments(root: &Value, segments: &[Segment], value: Value) -> Result<Value, Diagnostic> {
    let Some((first, rest)) = segments.split_first() else {
        return Ok(value);
    };
    match first {
        Segment::Field(name) => {
            let mut record: Record = match root {
                Value::Record(r) => r.clone(),
                Value::Null => Record::new(),
                other => return Err(path_error(other)),
            };
            let child = record.get(name).cloned().unwrap_or(Value::Null);
            let updated = put_segments(&child, rest, value)?;
            record.insert(name.clone(), updated);
            Ok(Value::Record(record))
        }
        Segment::Index(i) => {
            let mut list = match root {
                Value::List(l) => l.clone(),
                Value::Null => Vec::new(),
                other => return Err(path_error(other)),
            };
            while list.len() <= *i {
                list.push(Value::Null);
            }
            let updated = put_segments(&list[*i], rest, value)?;
            list[*i] = updated;
            Ok(Value::List(list))
        }
    }
}

fn path_error(found: &Value) -> Diagnostic {
    Diagnostic::error(
        ErrorCode::EPath,
        format!("cannot index into a {}", found.type_name()),
        None,
    )
}

/// Merges two records. Keys already present in `base` keep their original
/// position but take `overlay`'s value; keys only in `overlay` are appended
/// after `base`'s keys, in `overlay`'s order.
pub fn merge(base: &Value, overlay: &Value) -> Result<Value, Diagnostic> {
    let (base, overlay) = match (base, overlay) {
        (Value::Record(b), Value::Record(o)) => (b, o),
        (other, _) => return Err(path_error(other)),
    };
    let mut result = base.clone();
    for (key, value) in overlay {
        result.insert(key.clone(), value.clone());
    }
    Ok(Value::Record(result))
}

/// A small, practical subset of RFC 6902 JSON Patch: `add`, `remove`, and
/// `replace`. Each operation is itself a record `{op, path, value?}`.
pub fn patch(root: &Value, ops: &[Value]) -> Result<Value, Diagnostic> {
    let mut current = root.clone();
    for op in ops {
        let Value::Record(fields) = op else {
            return Err(Diagnostic::error(
                ErrorCode::EToolArgs,
                "each patch operation must be a record".to_string(),
                None,
            ));
        };
        let op_name = fields
            .get("op")
            .and_then(Value::as_str)
            .ok_or_else(|| bad_patch("missing `op`"))?;
        let path = fields
            .get("path")
            .and_then(Value::as_str)
            .ok_or_else(|| bad_patch("missing `path`"))?;
        current = match op_name {
            "add" | "replace" => {
                let value = fields
                    .get("value")
                    .cloned()
                    .ok_or_else(|| bad_patch("missing `value`"))?;
                put(&current, path, value)?
            }
            "remove" => remove_path(&current, path)?,
            other => {
                return Err(bad_patch(&format!("unsupported patch op `{other}`")));
            }
        };
    }
    Ok(current)
}

fn remove_path(root: &Value, path: &str) -> Result<Value, Diagnostic> {
    let segments = parse_path(path);
    let Some((last, prefix)) = segments.split_last() else {
        return Ok(Value::Null);
    };
    if prefix.is_empty() {
        return match (last, root) {
            (Segment::Field(name), Value::Record(r)) => {
                let mut r = r.clone();
                r.shift_remove(name);
                Ok(Value::Record(r))
            }
            (Segment::Index(i), Value::List(l)) => {
                let mut l = l.clone();
                if *i < l.len() {
                    l.remove(*i);
                }
                Ok(Value::List(l))
            }
            _ => Ok(root.clone()),
        };
    }
    let parent_path = segments[..segments.len() - 1]
        .iter()
        .map(segment_to_string)
        .collect::<Vec<_>>()
        .join("");
    let parent = get(root, &parent_path).unwrap_or(Value::Null);
    let updated_parent = match (last, &parent) {
        (Segment::Field(name), Value::Record(r)) => {
            let mut r = r.clone();
            r.shift_remove(name);
            Value::Record(r)
        }
        (Segment::Index(i), Value::List(l)) => {
            let mut l = l.clone();
            if *i < l.len() {
                l.remove(*i);
            }
            Value::List(l)
        }
        _ => parent,
    };
    put(root, &parent_path, updated_parent)
}

fn segment_to_string(s: &Segment) -> String {
    match s {
        Segment::Field(name) => format!(".{name}"),
        Segment::Index(i) => format!("[{i}]"),
    }
}

fn bad_patch(msg: &str) -> Diagnostic {
    Diagnostic::error(ErrorCode::EToolArgs, format!("invalid patch: {msg}"), None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(pairs: Vec<(&str, Value)>) -> Value {
        Value::record(pairs.into_iter().map(|(k, v)| (k.to_string(), v)))
    }

    #[test]
    fn get_reads_nested_field_and_index() {
        let root = rec(vec![(
            "a",
            Value::List(vec![rec(vec![("b", Value::Number(42.0))])]),
        )]);
        assert_eq!(get(&root, "a[0].b"), Some(Value::Number(42.0)));
    }

    #[test]
    fn get_returns_none_for_missing_path() {
        let root = rec(vec![("a", Value::Number(1.0))]);
        assert_eq!(get(&root, "a.b"), None);
    }

    #[test]
    fn put_creates_intermediate_records() {
        let root = Value::Null;
        let result = put(&root, "a.b", Value::Number(1.0)).unwrap();
        assert_eq!(get(&result, "a.b"), Some(Value::Number(1.0)));
    }

    #[test]
    fn merge_keeps_base_key_position_but_overlay_value() {
        let base = rec(vec![("x", Value::Number(1.0)), ("y", Value::Number(2.0))]);
        let overlay = rec(vec![("y", Value::Number(20.0)), ("z", Value::Number(3.0))]);
        let merged = merge(&base, &overlay).unwrap();
        let Value::Record(r) = merged else { panic!() };
        let keys: Vec<&String> = r.keys().collect();
        assert_eq!(keys, vec!["x", "y", "z"]);
        assert_eq!(r.get("y"), Some(&Value::Number(20.0)));
    }

    #[test]
    fn patch_add_and_remove() {
        let root = rec(vec![("a", Value::Number(1.0))]);
        let ops = vec![
            rec(vec![
                ("op", Value::String("add".into())),
                ("path", Value::String("b".into())),
                ("value", Value::Number(2.0)),
            ]),
            rec(vec![
                ("op", Value::String("remove".into())),
                ("path", Value::String("a".into())),
            ]),
        ];
        let result = patch(&root, &ops).unwrap();
        assert_eq!(get(&result, "b"), Some(Value::Number(2.0)));
        assert_eq!(get(&result, "a"), None);
    }
}
