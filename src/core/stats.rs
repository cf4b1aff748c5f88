use serde::{Deserialize, Serialize};

use crate::core::types::FieldKind;

/// Point-in-time snapshot of the table for monitoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableStats {
    pub rows: usize,
    pub committed_fields: usize,

    pub string_fields: usize,
    pub number_fields: usize,
    pub bool_fields: usize,
    pub instant_fields: usize,

    pub field_stats: Vec<FieldStats>,
}

/// Per-field index statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldStats {
    pub field: String,
    pub kind: FieldKind,
    pub distinct_values: usize,
    pub rows: usize,
}
