use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::Hash;

use chrono::{DateTime, Utc};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::core::stats::FieldStats;
use crate::core::types::{FieldKind, FieldValue, RowId};

pub type IdSet = HashSet<RowId>;

/// The four secondary indexes, one per scalar kind. Each is a two-level
/// mapping field -> value -> set of row ids. Number and instant values use
/// ordered maps so range predicates become range scans.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypedIndexes {
    pub strings: HashMap<String, HashMap<String, IdSet>>,
    pub numbers: HashMap<String, BTreeMap<OrderedFloat<f64>, IdSet>>,
    pub bools: HashMap<String, HashMap<bool, IdSet>>,
    pub instants: HashMap<String, BTreeMap<DateTime<Utc>, IdSet>>,
}

impl TypedIndexes {
    pub fn new() -> Self {
        TypedIndexes::default()
    }

    pub fn insert(&mut self, field: &str, value: &FieldValue, id: RowId) {
        match value {
            FieldValue::Text(s) => {
                self.strings
                    .entry(field.to_string())
                    .or_default()
                    .entry(s.clone())
                    .or_default()
                    .insert(id);
            }
            FieldValue::Number(n) => {
                self.numbers
                    .entry(field.to_string())
                    .or_default()
                    .entry(OrderedFloat(*n))
                    .or_default()
                    .insert(id);
            }
            FieldValue::Bool(b) => {
                self.bools
                    .entry(field.to_string())
                    .or_default()
                    .entry(*b)
                    .or_default()
                    .insert(id);
            }
            FieldValue::Instant(t) => {
                self.instants
                    .entry(field.to_string())
                    .or_default()
                    .entry(*t)
                    .or_default()
                    .insert(id);
            }
        }
    }

    /// Remove an id from every value entry of every index, pruning empty
    /// id-sets, empty inner maps and empty field entries as it goes.
    pub fn discard(&mut self, id: RowId) {
        discard_hashed(&mut self.strings, id);
        discard_ordered(&mut self.numbers, id);
        discard_hashed(&mut self.bools, id);
        discard_ordered(&mut self.instants, id);
    }

    /// Whether any index still carries the field.
    pub fn contains_field(&self, field: &str) -> bool {
        self.strings.contains_key(field)
            || self.numbers.contains_key(field)
            || self.bools.contains_key(field)
            || self.instants.contains_key(field)
    }

    /// Distinct values and total row references for a field of a known kind.
    pub fn field_cardinality(&self, field: &str, kind: FieldKind) -> (usize, usize) {
        match kind {
            FieldKind::Text => cardinality_hashed(self.strings.get(field)),
            FieldKind::Number => cardinality_ordered(self.numbers.get(field)),
            FieldKind::Bool => cardinality_hashed(self.bools.get(field)),
            FieldKind::Instant => cardinality_ordered(self.instants.get(field)),
        }
    }

    pub fn field_stats(&self, field: &str, kind: FieldKind) -> FieldStats {
        let (distinct_values, rows) = self.field_cardinality(field, kind);
        FieldStats {
            field: field.to_string(),
            kind,
            distinct_values,
            rows,
        }
    }

    pub fn clear(&mut self) {
        self.strings.clear();
        self.numbers.clear();
        self.bools.clear();
        self.instants.clear();
    }
}

fn discard_hashed<K: Eq + Hash>(index: &mut HashMap<String, HashMap<K, IdSet>>, id: RowId) {
    for values in index.values_mut() {
        values.retain(|_, ids| {
            ids.remove(&id);
            !ids.is_empty()
        });
    }
    index.retain(|_, values| !values.is_empty());
}

fn discard_ordered<K: Ord>(index: &mut HashMap<String, BTreeMap<K, IdSet>>, id: RowId) {
    for values in index.values_mut() {
        values.retain(|_, ids| {
            ids.remove(&id);
            !ids.is_empty()
        });
    }
    index.retain(|_, values| !values.is_empty());
}

fn cardinality_hashed<K>(values: Option<&HashMap<K, IdSet>>) -> (usize, usize) {
    match values {
        Some(values) => (values.len(), values.values().map(IdSet::len).sum()),
        None => (0, 0),
    }
}

fn cardinality_ordered<K>(values: Option<&BTreeMap<K, IdSet>>) -> (usize, usize) {
    match values {
        Some(values) => (values.len(), values.values().map(IdSet::len).sum()),
        None => (0, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_discard_prunes_empty_entries() {
        let mut indexes = TypedIndexes::new();
        let a = RowId::new();
        let b = RowId::new();

        indexes.insert("name", &FieldValue::Text("x".into()), a);
        indexes.insert("name", &FieldValue::Text("x".into()), b);
        indexes.insert("score", &FieldValue::Number(1.5), a);

        indexes.discard(a);
        assert!(indexes.strings["name"]["x"].contains(&b));
        assert!(!indexes.contains_field("score"));

        indexes.discard(b);
        assert!(!indexes.contains_field("name"));
        assert!(indexes.strings.is_empty());
    }

    #[test]
    fn cardinality_counts_distinct_values_and_rows() {
        let mut indexes = TypedIndexes::new();
        let ids: Vec<RowId> = (0..4).map(|_| RowId::new()).collect();

        indexes.insert("score", &FieldValue::Number(1.0), ids[0]);
        indexes.insert("score", &FieldValue::Number(1.0), ids[1]);
        indexes.insert("score", &FieldValue::Number(2.0), ids[2]);
        indexes.insert("score", &FieldValue::Number(3.0), ids[3]);

        assert_eq!(indexes.field_cardinality("score", FieldKind::Number), (3, 4));
        assert_eq!(indexes.field_cardinality("other", FieldKind::Number), (0, 0));
    }
}
