use std::collections::HashMap;

use crate::core::types::{FieldValue, Value};

/// Flatten an inserted mapping into scalar leaves. Nested objects produce
/// dot-joined paths (`parent.child.leaf`); lists are flattened by index
/// (`arr.0`, `arr.1`). Null produces no leaf.
pub fn flatten(data: HashMap<String, Value>) -> Vec<(String, FieldValue)> {
    let mut leaves = Vec::with_capacity(data.len());
    for (key, value) in data {
        flatten_into(key, value, &mut leaves);
    }
    leaves
}

pub(crate) fn flatten_into(path: String, value: Value, out: &mut Vec<(String, FieldValue)>) {
    match value {
        Value::Null => {}
        Value::Bool(b) => out.push((path, FieldValue::Bool(b))),
        Value::Int(v) => out.push((path, FieldValue::Number(v as f64))),
        Value::UInt(v) => out.push((path, FieldValue::Number(v as f64))),
        Value::Float(v) => out.push((path, FieldValue::Number(v))),
        Value::Text(s) => out.push((path, FieldValue::Text(s))),
        // Canonical dashed form, kept as text through every later stage.
        Value::Uuid(u) => out.push((path, FieldValue::Text(u.to_string()))),
        Value::Instant(t) => out.push((path, FieldValue::Instant(t))),
        Value::Object(map) => {
            for (key, value) in map {
                flatten_into(format!("{}.{}", path, key), value, out);
            }
        }
        Value::List(items) => {
            for (index, value) in items.into_iter().enumerate() {
                flatten_into(format!("{}.{}", path, index), value, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn data(pairs: Vec<(&str, Value)>) -> HashMap<String, Value> {
        pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    #[test]
    fn scalars_pass_through() {
        let leaves = flatten(data(vec![
            ("name", Value::from("alice")),
            ("age", Value::from(30i64)),
            ("active", Value::from(true)),
        ]));

        let map: HashMap<_, _> = leaves.into_iter().collect();
        assert_eq!(map["name"], FieldValue::Text("alice".into()));
        assert_eq!(map["age"], FieldValue::Number(30.0));
        assert_eq!(map["active"], FieldValue::Bool(true));
    }

    #[test]
    fn integer_widths_collapse_to_f64() {
        let leaves = flatten(data(vec![
            ("a", Value::from(7i32)),
            ("b", Value::from(7u64)),
            ("c", Value::from(7.0f32)),
        ]));
        for (_, value) in leaves {
            assert_eq!(value, FieldValue::Number(7.0));
        }
    }

    #[test]
    fn uuid_becomes_canonical_text() {
        let id = Uuid::new_v4();
        let leaves = flatten(data(vec![("ref", Value::Uuid(id))]));
        assert_eq!(leaves[0].1, FieldValue::Text(id.to_string()));
    }

    #[test]
    fn nested_objects_and_lists_flatten_recursively() {
        let mut inner = BTreeMap::new();
        inner.insert("leaf".to_string(), Value::from(1i64));
        let mut child = BTreeMap::new();
        child.insert("child".to_string(), Value::Object(inner));

        let leaves = flatten(data(vec![
            ("parent", Value::Object(child)),
            (
                "arr",
                Value::List(vec![Value::from("x"), Value::from("y")]),
            ),
        ]));

        let map: HashMap<_, _> = leaves.into_iter().collect();
        assert_eq!(map["parent.child.leaf"], FieldValue::Number(1.0));
        assert_eq!(map["arr.0"], FieldValue::Text("x".into()));
        assert_eq!(map["arr.1"], FieldValue::Text("y".into()));
    }

    #[test]
    fn null_leaves_nothing() {
        let leaves = flatten(data(vec![("gone", Value::Null)]));
        assert!(leaves.is_empty());
    }
}
