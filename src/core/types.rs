use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RowId(pub Uuid);

impl RowId {
    pub fn new() -> Self {
        RowId(Uuid::new_v4())
    }

    pub fn value(&self) -> Uuid {
        self.0
    }
}

impl Default for RowId {
    fn default() -> Self {
        RowId::new()
    }
}

impl From<Uuid> for RowId {
    fn from(id: Uuid) -> Self {
        RowId(id)
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The committed type of a field. Every row that carries the field stores a
/// value of exactly this kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    Text = 1,
    Number = 2,
    Bool = 3,
    Instant = 4,
}

impl FieldKind {
    /// Integer tag used by the persistence formats.
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(FieldKind::Text),
            2 => Some(FieldKind::Number),
            3 => Some(FieldKind::Bool),
            4 => Some(FieldKind::Instant),
            _ => None,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            FieldKind::Text => "Text",
            FieldKind::Number => "Number",
            FieldKind::Bool => "Bool",
            FieldKind::Instant => "Instant",
        };
        write!(f, "{}", name)
    }
}

/// A scalar value as stored in a row projection and in the typed indexes.
/// Null is represented by the absence of the field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Instant(DateTime<Utc>),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Text(_) => FieldKind::Text,
            FieldValue::Number(_) => FieldKind::Number,
            FieldValue::Bool(_) => FieldKind::Bool,
            FieldValue::Instant(_) => FieldKind::Instant,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    /// Canonical text rendering: instants as RFC3339 with nanoseconds.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FieldValue::Text(s) => write!(f, "{}", s),
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Instant(t) => {
                write!(f, "{}", t.to_rfc3339_opts(SecondsFormat::Nanos, true))
            }
        }
    }
}

/// A flattened row projection: scalar leaves only, keyed by dot-joined path.
pub type Row = HashMap<String, FieldValue>;

/// A dynamically typed value as supplied at insertion time. Nested objects
/// and lists are flattened into scalar leaves before indexing; all integer
/// and float widths collapse to a 64-bit float (lossy above 2^53).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Uuid(Uuid),
    Instant(DateTime<Utc>),
    List(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::UInt(v as u64)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v as f64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Instant(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(v: BTreeMap<String, Value>) -> Self {
        Value::Object(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::UInt(u)
                } else if let Some(f) = n.as_f64() {
                    Value::Float(f)
                } else {
                    warn!(value = %n, "unknown field type");
                    Value::Null
                }
            }
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_kind_tags_round_trip() {
        for kind in [
            FieldKind::Text,
            FieldKind::Number,
            FieldKind::Bool,
            FieldKind::Instant,
        ] {
            assert_eq!(FieldKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(FieldKind::from_tag(0), None);
        assert_eq!(FieldKind::from_tag(5), None);
    }

    #[test]
    fn field_value_kind_matches_variant() {
        assert_eq!(FieldValue::Text("a".into()).kind(), FieldKind::Text);
        assert_eq!(FieldValue::Number(1.0).kind(), FieldKind::Number);
        assert_eq!(FieldValue::Bool(true).kind(), FieldKind::Bool);
        assert_eq!(FieldValue::Instant(Utc::now()).kind(), FieldKind::Instant);
    }

    #[test]
    fn json_conversion_covers_scalars_and_containers() {
        let json: serde_json::Value = serde_json::json!({
            "name": "alice",
            "age": 30,
            "score": 99.5,
            "active": true,
            "tags": ["a", "b"],
            "missing": null,
        });

        let value = Value::from(json);
        let Value::Object(map) = value else {
            panic!("expected object");
        };
        assert_eq!(map["name"], Value::Text("alice".into()));
        assert_eq!(map["age"], Value::Int(30));
        assert_eq!(map["score"], Value::Float(99.5));
        assert_eq!(map["active"], Value::Bool(true));
        assert_eq!(
            map["tags"],
            Value::List(vec![Value::Text("a".into()), Value::Text("b".into())])
        );
        assert_eq!(map["missing"], Value::Null);
    }
}
