use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use ordered_float::OrderedFloat;

use crate::core::types::FieldKind;
use crate::index::typed::IdSet;
use crate::query::filter::is_pattern;
use crate::query::operator::{instant_bounds, number_bounds, FilterValue, Operator};
use crate::store::table::Table;

/// How a filter would execute, without executing it. Estimates come from
/// the typed index of the literal key: a probe for equality, sums of id-set
/// sizes over qualifying values for ordered and list predicates, and the
/// index total as an upper bound for pattern-like text predicates.
#[derive(Debug, Clone)]
pub struct Explain {
    pub operator: String,
    pub key: String,
    pub key_kind: Option<FieldKind>,
    pub index_used: bool,
    pub estimated_rows: usize,
    pub total_rows: usize,
    /// Estimated percentage of total rows the predicate would return.
    pub selectivity: f64,
    pub notes: Vec<String>,
}

impl fmt::Display for Explain {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "EXPLAIN: Filter({}, {}, <value>)", self.operator, self.key)?;
        match self.key_kind {
            Some(kind) => writeln!(f, "  Key Type: {}", kind)?,
            None => writeln!(f, "  Key Type: Unknown")?,
        }
        writeln!(f, "  Index Used: {}", self.index_used)?;
        writeln!(f, "  Total Rows: {}", self.total_rows)?;
        writeln!(f, "  Estimated Rows: {}", self.estimated_rows)?;
        writeln!(f, "  Selectivity: {:.2}%", self.selectivity)?;
        if !self.notes.is_empty() {
            writeln!(f, "  Notes:")?;
            for note in &self.notes {
                writeln!(f, "    - {}", note)?;
            }
        }
        Ok(())
    }
}

impl Table {
    /// Report the estimated cost of a predicate from index statistics.
    /// Read-only; never mutates the table or the result of a later filter.
    pub fn explain(&self, operator: Operator, key: &str, value: &FilterValue) -> Explain {
        let state = self.inner.state.read();

        let mut result = Explain {
            operator: operator.name().to_string(),
            key: key.to_string(),
            key_kind: None,
            index_used: false,
            estimated_rows: 0,
            total_rows: state.data.len(),
            selectivity: 0.0,
            notes: Vec::new(),
        };

        if is_pattern(key) {
            result
                .notes
                .push("key uses regex pattern matching".to_string());
            let matches = match self.inner.patterns.get(key) {
                Some(re) => state.keys.iter().filter(|(field, _)| re.is_match(field)).count(),
                None => 0,
            };
            result.notes.push(format!("pattern matches {} keys", matches));
        }

        let Some(kind) = state.keys.kind_of(key) else {
            result.notes.push("key not found in indexes".to_string());
            return result;
        };
        result.key_kind = Some(kind);
        result.index_used = true;

        match kind {
            FieldKind::Number => {
                if let Some(index) = state.indexes.numbers.get(key) {
                    result.notes.push(format!(
                        "number index contains {} unique values",
                        index.len()
                    ));
                    result.estimated_rows = estimate_number_rows(operator, value, index);
                }
            }
            FieldKind::Text => {
                if let Some(index) = state.indexes.strings.get(key) {
                    result.notes.push(format!(
                        "string index contains {} unique values",
                        index.len()
                    ));
                    result.estimated_rows = estimate_text_rows(operator, value, index);
                }
            }
            FieldKind::Bool => {
                if let Some(index) = state.indexes.bools.get(key) {
                    result.notes.push(format!(
                        "bool index contains {} unique values",
                        index.len()
                    ));
                    result.estimated_rows = estimate_bool_rows(operator, value, index);
                }
            }
            FieldKind::Instant => {
                if let Some(index) = state.indexes.instants.get(key) {
                    result.notes.push(format!(
                        "instant index contains {} unique values",
                        index.len()
                    ));
                    result.estimated_rows = estimate_instant_rows(operator, value, index);
                }
            }
        }

        if result.total_rows > 0 {
            result.selectivity = result.estimated_rows as f64 / result.total_rows as f64 * 100.0;
        }

        result
    }
}

fn estimate_number_rows(
    operator: Operator,
    value: &FilterValue,
    index: &BTreeMap<OrderedFloat<f64>, IdSet>,
) -> usize {
    match operator {
        Operator::Equals => match value {
            FilterValue::Number(v) => index.get(&OrderedFloat(*v)).map_or(0, IdSet::len),
            _ => 0,
        },
        Operator::NotEquals => match value {
            FilterValue::Number(v) => index
                .iter()
                .filter(|(indexed, _)| indexed.0 != *v)
                .map(|(_, ids)| ids.len())
                .sum(),
            _ => 0,
        },
        Operator::Greater | Operator::Less | Operator::GreaterOrEqual | Operator::LessOrEqual => {
            match value {
                FilterValue::Number(v) => index
                    .iter()
                    .filter(|(indexed, _)| match operator {
                        Operator::Greater => indexed.0 > *v,
                        Operator::Less => indexed.0 < *v,
                        Operator::GreaterOrEqual => indexed.0 >= *v,
                        _ => indexed.0 <= *v,
                    })
                    .map(|(_, ids)| ids.len())
                    .sum(),
                _ => 0,
            }
        }
        Operator::Between | Operator::NotBetween => match value {
            FilterValue::Numbers(values) => match number_bounds(values) {
                Some((lo, hi)) => index
                    .iter()
                    .filter(|(indexed, _)| {
                        let inside = indexed.0 >= lo && indexed.0 <= hi;
                        if operator == Operator::Between {
                            inside
                        } else {
                            !inside
                        }
                    })
                    .map(|(_, ids)| ids.len())
                    .sum(),
                None => 0,
            },
            _ => 0,
        },
        Operator::InList | Operator::NotInList => match value {
            FilterValue::Numbers(values) => index
                .iter()
                .filter(|(indexed, _)| values.contains(&indexed.0) == (operator == Operator::InList))
                .map(|(_, ids)| ids.len())
                .sum(),
            _ => 0,
        },
        // Everything else is misuse on a number field; upper bound.
        _ => index.values().map(IdSet::len).sum(),
    }
}

fn estimate_text_rows(
    operator: Operator,
    value: &FilterValue,
    index: &HashMap<String, IdSet>,
) -> usize {
    match operator {
        Operator::Equals => match value {
            FilterValue::Text(v) => index.get(v).map_or(0, IdSet::len),
            _ => 0,
        },
        Operator::NotEquals => match value {
            FilterValue::Text(v) => index
                .iter()
                .filter(|(indexed, _)| *indexed != v)
                .map(|(_, ids)| ids.len())
                .sum(),
            _ => 0,
        },
        Operator::InList | Operator::NotInList => match value {
            FilterValue::Texts(values) => index
                .iter()
                .filter(|(indexed, _)| {
                    values.contains(indexed) == (operator == Operator::InList)
                })
                .map(|(_, ids)| ids.len())
                .sum(),
            _ => 0,
        },
        // Pattern-like operators cannot be estimated from value shape alone;
        // the index total is the upper bound.
        _ => index.values().map(IdSet::len).sum(),
    }
}

fn estimate_bool_rows(
    operator: Operator,
    value: &FilterValue,
    index: &HashMap<bool, IdSet>,
) -> usize {
    match operator {
        Operator::Equals => match value {
            FilterValue::Bool(v) => index.get(v).map_or(0, IdSet::len),
            _ => 0,
        },
        Operator::NotEquals => match value {
            FilterValue::Bool(v) => index.get(&!*v).map_or(0, IdSet::len),
            _ => 0,
        },
        _ => index.values().map(IdSet::len).sum(),
    }
}

fn estimate_instant_rows(
    operator: Operator,
    value: &FilterValue,
    index: &BTreeMap<DateTime<Utc>, IdSet>,
) -> usize {
    match operator {
        Operator::Between | Operator::NotBetween => match value {
            FilterValue::Instants(values) => match instant_bounds(values) {
                Some((lo, hi)) => index
                    .iter()
                    .filter(|(indexed, _)| {
                        let inside = **indexed >= lo && **indexed <= hi;
                        if operator == Operator::Between {
                            inside
                        } else {
                            !inside
                        }
                    })
                    .map(|(_, ids)| ids.len())
                    .sum(),
                None => 0,
            },
            _ => 0,
        },
        _ => index.values().map(IdSet::len).sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as StdHashMap;
    use std::time::Duration;

    use crate::core::types::Value;
    use crate::query::operator::FilterOptions;

    fn data(pairs: Vec<(&str, Value)>) -> StdHashMap<String, Value> {
        pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    fn diverse_table(rows: usize) -> Table {
        let table = Table::new(Duration::from_secs(600));
        for i in 0..rows {
            table.insert(data(vec![
                ("name", Value::from(format!("row-{}", i))),
                ("score", Value::from((i % 100) as f64)),
                ("active", Value::from(i % 2 == 0)),
            ]));
        }
        table
    }

    #[test]
    fn equals_on_a_number_field_reports_the_probe() {
        let table = diverse_table(1000);
        let plan = table.explain(Operator::Equals, "score", &FilterValue::from(50.0));

        assert_eq!(plan.key_kind, Some(FieldKind::Number));
        assert!(plan.index_used);
        assert_eq!(plan.total_rows, 1000);
        assert_eq!(plan.estimated_rows, 10);
        assert!(plan.selectivity > 0.0);
    }

    #[test]
    fn unknown_key_reports_no_index() {
        let table = diverse_table(10);
        let plan = table.explain(Operator::Equals, "nonexistent", &FilterValue::from("x"));

        assert_eq!(plan.key_kind, None);
        assert!(!plan.index_used);
        assert_eq!(plan.estimated_rows, 0);
        assert!(plan
            .notes
            .iter()
            .any(|n| n.contains("key not found")));
    }

    #[test]
    fn estimate_matches_execution_for_ranges() {
        let table = diverse_table(200);
        let value = FilterValue::from([10.0, 19.0]);
        let plan = table.explain(Operator::Between, "score", &value);
        let executed = table.filter(Operator::Between, "score", value, FilterOptions::default());

        assert_eq!(plan.estimated_rows, executed.count());
    }

    #[test]
    fn pattern_like_text_operator_uses_index_total_as_upper_bound() {
        let table = diverse_table(50);
        let plan = table.explain(Operator::Contains, "name", &FilterValue::from("row"));
        assert_eq!(plan.estimated_rows, 50);
        assert!((plan.selectivity - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn pattern_key_is_noted_with_match_count() {
        let table = diverse_table(5);
        let plan = table.explain(Operator::Equals, "^(name|score)$", &FilterValue::from("x"));

        assert!(plan
            .notes
            .iter()
            .any(|n| n.contains("regex pattern matching")));
        assert!(plan.notes.iter().any(|n| n.contains("matches 2 keys")));
        // The pattern itself is not a committed field.
        assert_eq!(plan.key_kind, None);
    }

    #[test]
    fn bool_not_equals_probes_the_complement() {
        let table = diverse_table(10);
        let plan = table.explain(Operator::NotEquals, "active", &FilterValue::from(true));
        assert_eq!(plan.estimated_rows, 5);
    }

    #[test]
    fn display_renders_the_plan() {
        let table = diverse_table(10);
        let plan = table.explain(Operator::Equals, "score", &FilterValue::from(1.0));
        let text = plan.to_string();
        assert!(text.contains("EXPLAIN: Filter(Equals, score"));
        assert!(text.contains("Key Type: Number"));
        assert!(text.contains("Selectivity:"));
    }
}
