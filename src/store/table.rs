use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use crate::core::config::TableOptions;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::stats::TableStats;
use crate::core::types::{FieldKind, FieldValue, Row, RowId, Value};
use crate::index::registry::TypeRegistry;
use crate::index::typed::TypedIndexes;
use crate::query::regex_cache::{RegexCache, RegexCacheStats};
use crate::store::flatten::flatten;
use crate::store::reaper::ReaperHandle;

/// An in-memory, TTL-bounded table of heterogeneous rows with four typed
/// secondary indexes. `Table` is a cheap cloneable handle onto shared
/// state: one readers-writer lock guards the whole store; the
/// compiled-pattern cache and the reaper handle have their own locks.
#[derive(Clone)]
pub struct Table {
    pub(crate) inner: Arc<Inner>,
}

pub(crate) struct Inner {
    pub(crate) state: RwLock<TableState>,
    pub(crate) patterns: RegexCache,
    pub(crate) reaper: Mutex<Option<ReaperHandle>>,
}

pub(crate) struct TableState {
    pub(crate) data: HashMap<RowId, Row>,
    pub(crate) expire_at: HashMap<RowId, DateTime<Utc>>,
    pub(crate) keys: TypeRegistry,
    pub(crate) indexes: TypedIndexes,
    pub(crate) ttl: TimeDelta,
}

impl TableState {
    fn new(ttl: TimeDelta) -> Self {
        TableState {
            data: HashMap::new(),
            expire_at: HashMap::new(),
            keys: TypeRegistry::new(),
            indexes: TypedIndexes::new(),
            ttl,
        }
    }

    pub(crate) fn expiry(&self) -> DateTime<Utc> {
        Utc::now()
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Install a row from pre-flattened scalar leaves under one id. Leaves
    /// whose field conflicts with an existing commitment are dropped (the
    /// registry logs the notice); everything else is indexed and projected.
    pub(crate) fn insert_leaves(&mut self, id: RowId, leaves: Vec<(String, FieldValue)>) {
        let mut row = Row::with_capacity(leaves.len());
        for (field, value) in leaves {
            if !self.keys.commit(&field, value.kind()) {
                continue;
            }
            self.indexes.insert(&field, &value, id);
            row.insert(field, value);
        }
        self.data.insert(id, row);
        self.expire_at.insert(id, self.expiry());
    }

    /// Re-insert an already-scalar row under a fresh id. Used by filter
    /// result assembly and by append.
    pub(crate) fn insert_row(&mut self, row: Row) -> RowId {
        let id = RowId::new();
        let leaves: Vec<(String, FieldValue)> = row.into_iter().collect();
        self.insert_leaves(id, leaves);
        id
    }

    pub(crate) fn remove(&mut self, id: RowId) {
        self.data.remove(&id);
        self.expire_at.remove(&id);
        self.indexes.discard(id);

        let indexes = &self.indexes;
        self.keys.retain(|field, _| indexes.contains_field(field));
    }

    fn clear(&mut self) {
        self.data.clear();
        self.expire_at.clear();
        self.keys.clear();
        self.indexes.clear();
    }
}

impl Table {
    pub fn new(ttl: Duration) -> Self {
        Table::with_options(TableOptions::new(ttl))
    }

    pub fn with_options(options: TableOptions) -> Self {
        let ttl = TimeDelta::from_std(options.ttl).unwrap_or(TimeDelta::MAX);
        Table {
            inner: Arc::new(Inner {
                state: RwLock::new(TableState::new(ttl)),
                patterns: RegexCache::new(options.max_regex_cache),
                reaper: Mutex::new(None),
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.inner.state.read().ttl.to_std().unwrap_or(Duration::ZERO)
    }

    /// Insert a row, minting a fresh id and registering its expiry.
    /// Flattening and classification happen outside the lock.
    pub fn insert(&self, data: HashMap<String, Value>) -> RowId {
        let leaves = flatten(data);
        let id = RowId::new();
        self.inner.state.write().insert_leaves(id, leaves);
        id
    }

    /// Like `insert`, but empty input is a validation error.
    pub fn insert_with_error(&self, data: HashMap<String, Value>) -> Result<RowId> {
        if data.is_empty() {
            return Err(Error::new(
                ErrorKind::Validation,
                "cannot insert empty data",
            ));
        }
        Ok(self.insert(data))
    }

    /// Insert several rows under a single exclusive acquisition. An empty
    /// batch is a validation error; empty entries inside the batch are
    /// skipped.
    pub fn insert_batch(&self, batch: Vec<HashMap<String, Value>>) -> Result<()> {
        if batch.is_empty() {
            return Err(Error::new(
                ErrorKind::Validation,
                "cannot insert an empty batch",
            ));
        }

        let flattened: Vec<Vec<(String, FieldValue)>> = batch
            .into_iter()
            .filter(|data| !data.is_empty())
            .map(flatten)
            .collect();

        let mut state = self.inner.state.write();
        for leaves in flattened {
            state.insert_leaves(RowId::new(), leaves);
        }
        Ok(())
    }

    /// Batch insertion with caller-supplied ids. Ids colliding with an
    /// existing row fail the whole batch before any mutation.
    pub fn insert_batch_with_ids(
        &self,
        batch: HashMap<RowId, HashMap<String, Value>>,
    ) -> Result<()> {
        if batch.is_empty() {
            return Err(Error::new(
                ErrorKind::Validation,
                "cannot insert an empty batch",
            ));
        }

        let entries: Vec<(RowId, Vec<(String, FieldValue)>)> = batch
            .into_iter()
            .filter(|(_, data)| !data.is_empty())
            .map(|(id, data)| (id, flatten(data)))
            .collect();

        let mut state = self.inner.state.write();
        for (id, _) in &entries {
            if state.data.contains_key(id) {
                return Err(Error::new(
                    ErrorKind::Validation,
                    format!("row id {} already exists", id),
                ));
            }
        }
        for (id, leaves) in entries {
            state.insert_leaves(id, leaves);
        }
        Ok(())
    }

    /// Copy every row of `other` into this table, injecting `"key" = tag` as
    /// a text field on each copy. Rows are read under the other table's
    /// shared lock, then inserted under this table's exclusive lock.
    pub fn append(&self, other: &Table, tag: &str) {
        let rows: Vec<Row> = other.inner.state.read().data.values().cloned().collect();

        let mut state = self.inner.state.write();
        for mut row in rows {
            row.insert("key".to_string(), FieldValue::Text(tag.to_string()));
            state.insert_row(row);
        }
    }

    /// Remove one row and cascade through every index, pruning empty
    /// entries and stale type commitments.
    pub fn remove_row(&self, id: RowId) {
        self.inner.state.write().remove(id);
    }

    /// Drop all rows, indexes and commitments; TTL and options survive.
    pub fn clear(&self) {
        self.inner.state.write().clear();
    }

    pub fn count(&self) -> usize {
        self.inner.state.read().data.len()
    }

    /// Distinct values of a field (canonical text rendering) mapped to the
    /// number of rows carrying each, driven by the field's typed index.
    pub fn count_unique(&self, field: &str) -> HashMap<String, usize> {
        let state = self.inner.state.read();
        let mut counts = HashMap::new();

        match state.keys.kind_of(field) {
            Some(FieldKind::Text) => {
                if let Some(values) = state.indexes.strings.get(field) {
                    for (value, ids) in values {
                        counts.insert(value.clone(), ids.len());
                    }
                }
            }
            Some(FieldKind::Number) => {
                if let Some(values) = state.indexes.numbers.get(field) {
                    for (value, ids) in values {
                        counts.insert(FieldValue::Number(value.0).to_string(), ids.len());
                    }
                }
            }
            Some(FieldKind::Bool) => {
                if let Some(values) = state.indexes.bools.get(field) {
                    for (value, ids) in values {
                        counts.insert(value.to_string(), ids.len());
                    }
                }
            }
            Some(FieldKind::Instant) => {
                if let Some(values) = state.indexes.instants.get(field) {
                    for (value, ids) in values {
                        counts.insert(FieldValue::Instant(*value).to_string(), ids.len());
                    }
                }
            }
            None => {}
        }

        counts
    }

    /// All rows, in unspecified order.
    pub fn to_slice(&self) -> Vec<Row> {
        self.inner.state.read().data.values().cloned().collect()
    }

    /// Values of one field across all rows; rows lacking the field are
    /// skipped.
    pub fn project_field(&self, field: &str) -> Vec<FieldValue> {
        self.inner
            .state
            .read()
            .data
            .values()
            .filter_map(|row| row.get(field).cloned())
            .collect()
    }

    /// Number values of one field; non-number values are elided. This is
    /// the interface the statistical aggregators consume.
    pub fn project_field_as_float(&self, field: &str) -> Vec<f64> {
        self.inner
            .state
            .read()
            .data
            .values()
            .filter_map(|row| row.get(field).and_then(FieldValue::as_f64))
            .collect()
    }

    pub fn stats(&self) -> TableStats {
        let state = self.inner.state.read();
        let mut field_stats: Vec<_> = state
            .keys
            .iter()
            .map(|(field, kind)| state.indexes.field_stats(field, *kind))
            .collect();
        field_stats.sort_by(|a, b| a.field.cmp(&b.field));

        TableStats {
            rows: state.data.len(),
            committed_fields: state.keys.len(),
            string_fields: state.indexes.strings.len(),
            number_fields: state.indexes.numbers.len(),
            bool_fields: state.indexes.bools.len(),
            instant_fields: state.indexes.instants.len(),
            field_stats,
        }
    }

    pub fn log_stats(&self, name: &str) {
        let stats = self.stats();
        info!(
            table = %name,
            rows = stats.rows,
            string_fields = stats.string_fields,
            number_fields = stats.number_fields,
            bool_fields = stats.bool_fields,
            instant_fields = stats.instant_fields,
            "table stats"
        );
        for field in &stats.field_stats {
            debug!(
                table = %name,
                field = %field.field,
                kind = %field.kind,
                distinct_values = field.distinct_values,
                rows = field.rows,
                "field stats"
            );
        }
    }

    pub fn clear_regex_cache(&self) {
        self.inner.patterns.clear();
    }

    pub fn regex_cache_stats(&self) -> RegexCacheStats {
        self.inner.patterns.stats()
    }
}
