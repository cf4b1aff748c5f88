use ordered_float::OrderedFloat;
use std::ops::Bound;
use tracing::warn;

use crate::core::types::{FieldKind, FieldValue, RowId};
use crate::index::typed::IdSet;
use crate::query::operator::{
    instant_bounds, number_bounds, Cidr, FilterOptions, FilterValue, Operator,
};
use crate::store::table::{Table, TableState};

/// A key argument is treated as a field-name pattern when it carries any of
/// these regex metacharacters; otherwise it is a literal field name.
pub(crate) fn is_pattern(key: &str) -> bool {
    key.contains(['^', '[', '('])
}

fn copy_rows(state: &TableState, out: &mut TableState, ids: &IdSet) {
    for id in ids {
        if let Some(row) = state.data.get(id) {
            out.insert_row(row.clone());
        }
    }
}

impl Table {
    /// Committed fields addressed by a key expression: the literal field, or
    /// every field whose name matches the pattern.
    pub(crate) fn resolve_keys(&self, state: &TableState, key: &str) -> Vec<(String, FieldKind)> {
        if is_pattern(key) {
            match self.inner.patterns.get(key) {
                Some(re) => state
                    .keys
                    .iter()
                    .filter(|(field, _)| re.is_match(field))
                    .map(|(field, kind)| (field.clone(), *kind))
                    .collect(),
                None => Vec::new(),
            }
        } else {
            match state.keys.kind_of(key) {
                Some(kind) => vec![(key.to_string(), kind)],
                None => Vec::new(),
            }
        }
    }

    /// Evaluate one predicate against the appropriate typed index and return
    /// a new table (same TTL) holding the matching rows. Evaluation never
    /// scans the primary data: equality probes the index, ordered predicates
    /// are range scans, and everything else walks the distinct values of the
    /// field. Misuse degrades to an empty result with a logged notice;
    /// filtering never fails.
    pub fn filter(
        &self,
        operator: Operator,
        key: &str,
        value: FilterValue,
        options: FilterOptions,
    ) -> Table {
        let state = self.inner.state.read();
        let results = Table::new(state.ttl.to_std().unwrap_or_default());

        {
            let mut out = results.inner.state.write();
            for (field, kind) in self.resolve_keys(&state, key) {
                match kind {
                    FieldKind::Number => {
                        self.filter_numbers(&state, &mut out, operator, &field, &value, key)
                    }
                    FieldKind::Text => {
                        self.filter_texts(&state, &mut out, operator, &field, &value, key, options)
                    }
                    FieldKind::Bool => {
                        self.filter_bools(&state, &mut out, operator, &field, &value, key)
                    }
                    FieldKind::Instant => {
                        self.filter_instants(&state, &mut out, operator, &field, &value, key)
                    }
                }
            }
        }

        drop(state);
        results
    }

    fn filter_numbers(
        &self,
        state: &TableState,
        out: &mut TableState,
        operator: Operator,
        field: &str,
        value: &FilterValue,
        key: &str,
    ) {
        let Some(index) = state.indexes.numbers.get(field) else {
            return;
        };

        match operator {
            Operator::Equals => {
                let FilterValue::Number(v) = value else {
                    return;
                };
                if let Some(ids) = index.get(&OrderedFloat(*v)) {
                    copy_rows(state, out, ids);
                }
            }
            Operator::NotEquals => {
                let FilterValue::Number(v) = value else {
                    return;
                };
                for (indexed, ids) in index {
                    if indexed.0 != *v {
                        copy_rows(state, out, ids);
                    }
                }
            }
            Operator::Greater => {
                let FilterValue::Number(v) = value else {
                    return;
                };
                let start = Bound::Excluded(OrderedFloat(*v));
                for (_, ids) in index.range((start, Bound::Unbounded)) {
                    copy_rows(state, out, ids);
                }
            }
            Operator::GreaterOrEqual => {
                let FilterValue::Number(v) = value else {
                    return;
                };
                for (_, ids) in index.range(OrderedFloat(*v)..) {
                    copy_rows(state, out, ids);
                }
            }
            Operator::Less => {
                let FilterValue::Number(v) = value else {
                    return;
                };
                for (_, ids) in index.range(..OrderedFloat(*v)) {
                    copy_rows(state, out, ids);
                }
            }
            Operator::LessOrEqual => {
                let FilterValue::Number(v) = value else {
                    return;
                };
                for (_, ids) in index.range(..=OrderedFloat(*v)) {
                    copy_rows(state, out, ids);
                }
            }
            Operator::Between => {
                let FilterValue::Numbers(values) = value else {
                    return;
                };
                let Some((lo, hi)) = number_bounds(values) else {
                    warn!(key = %key, "range predicate expects a two-element list");
                    return;
                };
                for (_, ids) in index.range(OrderedFloat(lo)..=OrderedFloat(hi)) {
                    copy_rows(state, out, ids);
                }
            }
            Operator::NotBetween => {
                let FilterValue::Numbers(values) = value else {
                    return;
                };
                let Some((lo, hi)) = number_bounds(values) else {
                    warn!(key = %key, "range predicate expects a two-element list");
                    return;
                };
                for (indexed, ids) in index {
                    if indexed.0 < lo || indexed.0 > hi {
                        copy_rows(state, out, ids);
                    }
                }
            }
            Operator::InList => {
                let FilterValue::Numbers(values) = value else {
                    return;
                };
                for (indexed, ids) in index {
                    if values.contains(&indexed.0) {
                        copy_rows(state, out, ids);
                    }
                }
            }
            Operator::NotInList => {
                let FilterValue::Numbers(values) = value else {
                    return;
                };
                for (indexed, ids) in index {
                    if !values.contains(&indexed.0) {
                        copy_rows(state, out, ids);
                    }
                }
            }
            _ => warn!(
                operator = %operator,
                key = %key,
                key_type = %FieldKind::Number,
                "incorrect operator"
            ),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn filter_texts(
        &self,
        state: &TableState,
        out: &mut TableState,
        operator: Operator,
        field: &str,
        value: &FilterValue,
        key: &str,
        options: FilterOptions,
    ) {
        let Some(index) = state.indexes.strings.get(field) else {
            return;
        };
        let sensitive = options.case_sensitive;

        match operator {
            Operator::Equals => {
                let FilterValue::Text(v) = value else {
                    return;
                };
                if sensitive {
                    if let Some(ids) = index.get(v) {
                        copy_rows(state, out, ids);
                    }
                } else {
                    let needle = v.to_lowercase();
                    for (indexed, ids) in index {
                        if indexed.to_lowercase() == needle {
                            copy_rows(state, out, ids);
                        }
                    }
                }
            }
            Operator::NotEquals => {
                let FilterValue::Text(v) = value else {
                    return;
                };
                let needle = if sensitive { v.clone() } else { v.to_lowercase() };
                for (indexed, ids) in index {
                    let candidate = if sensitive {
                        indexed.clone()
                    } else {
                        indexed.to_lowercase()
                    };
                    if candidate != needle {
                        copy_rows(state, out, ids);
                    }
                }
            }
            Operator::RegExp | Operator::NotRegExp => {
                let FilterValue::Text(pattern) = value else {
                    return;
                };
                let Some(re) = self.inner.patterns.get(pattern) else {
                    return;
                };
                let keep = operator == Operator::RegExp;
                for (indexed, ids) in index {
                    if re.is_match(indexed) == keep {
                        copy_rows(state, out, ids);
                    }
                }
            }
            Operator::InList | Operator::NotInList => {
                let FilterValue::Texts(values) = value else {
                    return;
                };
                let lookup: Vec<String> = if sensitive {
                    values.clone()
                } else {
                    values.iter().map(|v| v.to_lowercase()).collect()
                };
                let keep = operator == Operator::InList;
                for (indexed, ids) in index {
                    let candidate = if sensitive {
                        indexed.clone()
                    } else {
                        indexed.to_lowercase()
                    };
                    if lookup.contains(&candidate) == keep {
                        copy_rows(state, out, ids);
                    }
                }
            }
            Operator::InCidr | Operator::NotInCidr => {
                let FilterValue::Text(block) = value else {
                    return;
                };
                let Some(cidr) = Cidr::parse(block) else {
                    warn!(cidr = %block, "invalid CIDR");
                    return;
                };
                let keep = operator == Operator::InCidr;
                for (indexed, ids) in index {
                    if cidr.contains_text(indexed) == keep {
                        copy_rows(state, out, ids);
                    }
                }
            }
            Operator::Contains | Operator::NotContains => {
                let FilterValue::Text(v) = value else {
                    return;
                };
                let keep = operator == Operator::Contains;
                let needle = if sensitive { v.clone() } else { v.to_lowercase() };
                for (indexed, ids) in index {
                    let candidate = if sensitive {
                        indexed.clone()
                    } else {
                        indexed.to_lowercase()
                    };
                    if candidate.contains(&needle) == keep {
                        copy_rows(state, out, ids);
                    }
                }
            }
            Operator::StartsWith | Operator::NotStartsWith => {
                let FilterValue::Text(v) = value else {
                    return;
                };
                let keep = operator == Operator::StartsWith;
                let needle = if sensitive { v.clone() } else { v.to_lowercase() };
                for (indexed, ids) in index {
                    let candidate = if sensitive {
                        indexed.clone()
                    } else {
                        indexed.to_lowercase()
                    };
                    if candidate.starts_with(&needle) == keep {
                        copy_rows(state, out, ids);
                    }
                }
            }
            Operator::EndsWith | Operator::NotEndsWith => {
                let FilterValue::Text(v) = value else {
                    return;
                };
                let keep = operator == Operator::EndsWith;
                let needle = if sensitive { v.clone() } else { v.to_lowercase() };
                for (indexed, ids) in index {
                    let candidate = if sensitive {
                        indexed.clone()
                    } else {
                        indexed.to_lowercase()
                    };
                    if candidate.ends_with(&needle) == keep {
                        copy_rows(state, out, ids);
                    }
                }
            }
            _ => warn!(
                operator = %operator,
                key = %key,
                key_type = %FieldKind::Text,
                "incorrect operator"
            ),
        }
    }

    fn filter_bools(
        &self,
        state: &TableState,
        out: &mut TableState,
        operator: Operator,
        field: &str,
        value: &FilterValue,
        key: &str,
    ) {
        let Some(index) = state.indexes.bools.get(field) else {
            return;
        };
        let FilterValue::Bool(v) = value else {
            return;
        };

        match operator {
            Operator::Equals => {
                if let Some(ids) = index.get(v) {
                    copy_rows(state, out, ids);
                }
            }
            Operator::NotEquals => {
                for (indexed, ids) in index {
                    if indexed != v {
                        copy_rows(state, out, ids);
                    }
                }
            }
            _ => warn!(
                operator = %operator,
                key = %key,
                key_type = %FieldKind::Bool,
                "incorrect operator"
            ),
        }
    }

    fn filter_instants(
        &self,
        state: &TableState,
        out: &mut TableState,
        operator: Operator,
        field: &str,
        value: &FilterValue,
        key: &str,
    ) {
        let Some(index) = state.indexes.instants.get(field) else {
            return;
        };

        match operator {
            Operator::Between => {
                let FilterValue::Instants(values) = value else {
                    return;
                };
                let Some((lo, hi)) = instant_bounds(values) else {
                    warn!(key = %key, "range predicate expects a two-element list");
                    return;
                };
                for (_, ids) in index.range(lo..=hi) {
                    copy_rows(state, out, ids);
                }
            }
            Operator::NotBetween => {
                let FilterValue::Instants(values) = value else {
                    return;
                };
                let Some((lo, hi)) = instant_bounds(values) else {
                    warn!(key = %key, "range predicate expects a two-element list");
                    return;
                };
                for (indexed, ids) in index {
                    if *indexed < lo || *indexed > hi {
                        copy_rows(state, out, ids);
                    }
                }
            }
            _ => warn!(
                operator = %operator,
                key = %key,
                key_type = %FieldKind::Instant,
                "incorrect operator"
            ),
        }
    }

    /// First row carrying a field addressed by the key expression (literal
    /// or pattern, symmetric with `filter`). Iteration order is undefined.
    pub fn find_first_by_field(&self, key: &str) -> Option<(RowId, String, FieldValue)> {
        let state = self.inner.state.read();

        for (field, kind) in self.resolve_keys(&state, key) {
            let id = match kind {
                FieldKind::Text => state
                    .indexes
                    .strings
                    .get(&field)
                    .and_then(|values| values.values().next())
                    .and_then(|ids| ids.iter().next().copied()),
                FieldKind::Number => state
                    .indexes
                    .numbers
                    .get(&field)
                    .and_then(|values| values.values().next())
                    .and_then(|ids| ids.iter().next().copied()),
                FieldKind::Bool => state
                    .indexes
                    .bools
                    .get(&field)
                    .and_then(|values| values.values().next())
                    .and_then(|ids| ids.iter().next().copied()),
                FieldKind::Instant => state
                    .indexes
                    .instants
                    .get(&field)
                    .and_then(|values| values.values().next())
                    .and_then(|ids| ids.iter().next().copied()),
            };

            if let Some(id) = id {
                if let Some(value) = state.data.get(&id).and_then(|row| row.get(&field)) {
                    return Some((id, field, value.clone()));
                }
            }
        }

        None
    }
}
