use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::types::FieldKind;

/// Per-field type commitment. The first observation of a field fixes its
/// kind; later inserts with a conflicting kind are rejected and the
/// offending field assignment is dropped (the rest of the row still lands).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeRegistry {
    keys: HashMap<String, FieldKind>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        TypeRegistry {
            keys: HashMap::new(),
        }
    }

    /// Returns false on a conflicting commitment; idempotent on a match.
    pub fn commit(&mut self, field: &str, kind: FieldKind) -> bool {
        match self.keys.get(field) {
            Some(&existing) if existing != kind => {
                warn!(
                    field = %field,
                    old_type = %existing,
                    new_type = %kind,
                    "type conflict"
                );
                false
            }
            Some(_) => true,
            None => {
                self.keys.insert(field.to_string(), kind);
                true
            }
        }
    }

    pub fn kind_of(&self, field: &str) -> Option<FieldKind> {
        self.keys.get(field).copied()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.keys.contains_key(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldKind)> {
        self.keys.iter()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Drop commitments for fields that fail the predicate. Used after row
    /// removal so fields no longer present in any index lose their kind.
    pub fn retain(&mut self, keep: impl FnMut(&String, &mut FieldKind) -> bool) {
        self.keys.retain(keep);
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_commitment_wins() {
        let mut registry = TypeRegistry::new();
        assert!(registry.commit("name", FieldKind::Text));
        assert!(registry.commit("name", FieldKind::Text));
        assert!(!registry.commit("name", FieldKind::Number));
        assert_eq!(registry.kind_of("name"), Some(FieldKind::Text));
    }

    #[test]
    fn retain_prunes_commitments() {
        let mut registry = TypeRegistry::new();
        registry.commit("a", FieldKind::Text);
        registry.commit("b", FieldKind::Number);
        registry.retain(|field, _| field == "a");
        assert!(registry.contains("a"));
        assert!(!registry.contains("b"));
    }
}
