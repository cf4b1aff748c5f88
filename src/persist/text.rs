use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::warn;
use uuid::Uuid;

use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{FieldKind, FieldValue, RowId, Value};
use crate::persist::SNAPSHOT_VERSION;
use crate::store::flatten::flatten_into;
use crate::store::table::Table;

/// Self-describing, human-readable document: values travel as JSON scalars,
/// instants and expiries as RFC3339 with nanoseconds, the ttl in textual
/// duration form, and every field's committed kind as an integer tag so the
/// import can rebuild the typed indexes.
#[derive(Serialize, Deserialize)]
struct TextSnapshot {
    version: u32,
    ttl: String,
    keys: BTreeMap<String, u8>,
    data: BTreeMap<String, BTreeMap<String, serde_json::Value>>,
    expire_at: BTreeMap<String, String>,
}

fn render_instant(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn render_value(field: &str, value: &FieldValue) -> Option<serde_json::Value> {
    match value {
        FieldValue::Text(s) => Some(serde_json::Value::String(s.clone())),
        FieldValue::Bool(b) => Some(serde_json::Value::Bool(*b)),
        FieldValue::Number(n) => match serde_json::Number::from_f64(*n) {
            Some(n) => Some(serde_json::Value::Number(n)),
            None => {
                warn!(field = %field, value = %n, "non-finite number dropped from export");
                None
            }
        },
        FieldValue::Instant(t) => Some(serde_json::Value::String(render_instant(t))),
    }
}

impl Table {
    /// Export the table as an indented JSON document, atomically.
    pub fn export_text(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let document = {
            let state = self.inner.state.read();

            let mut keys = BTreeMap::new();
            for (field, kind) in state.keys.iter() {
                keys.insert(field.clone(), kind.tag());
            }

            let mut data = BTreeMap::new();
            for (id, row) in &state.data {
                let mut fields = BTreeMap::new();
                for (field, value) in row {
                    if let Some(rendered) = render_value(field, value) {
                        fields.insert(field.clone(), rendered);
                    }
                }
                data.insert(id.to_string(), fields);
            }

            let mut expire_at = BTreeMap::new();
            for (id, at) in &state.expire_at {
                expire_at.insert(id.to_string(), render_instant(at));
            }

            TextSnapshot {
                version: SNAPSHOT_VERSION,
                ttl: humantime::format_duration(state.ttl.to_std().unwrap_or_default())
                    .to_string(),
                keys,
                data,
                expire_at,
            }
        };

        let tmp = NamedTempFile::new_in(parent_dir(path))?;
        let mut writer = BufWriter::new(tmp.as_file());
        serde_json::to_writer_pretty(&mut writer, &document)?;
        writer.flush()?;
        drop(writer);

        tmp.persist(path)
            .map_err(|err| Error::new(ErrorKind::Io, err.to_string()))?;
        Ok(())
    }

    /// Import a text document, rebuilding the typed indexes from the data
    /// using the persisted kinds: historical instants are re-parsed from
    /// RFC3339 text; historical text (UUIDs included) stays text verbatim.
    pub fn import_text(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::open(path)?;
        let document: TextSnapshot = serde_json::from_reader(BufReader::new(file))?;

        if document.version > SNAPSHOT_VERSION {
            return Err(Error::new(
                ErrorKind::UnsupportedVersion,
                format!(
                    "unsupported snapshot version {} (current version is {})",
                    document.version, SNAPSHOT_VERSION
                ),
            ));
        }

        let ttl = humantime::parse_duration(&document.ttl)
            .map_err(|err| Error::new(ErrorKind::Decode, format!("failed to parse ttl: {}", err)))?;

        let mut kinds: HashMap<String, FieldKind> = HashMap::new();
        for (field, tag) in &document.keys {
            match FieldKind::from_tag(*tag) {
                Some(kind) => {
                    kinds.insert(field.clone(), kind);
                }
                None => warn!(field = %field, tag = *tag, "unknown field type"),
            }
        }

        // Decode rows fully before touching the table so a malformed
        // document leaves the state untouched.
        let mut rows: Vec<(RowId, Vec<(String, FieldValue)>)> =
            Vec::with_capacity(document.data.len());
        for (id_text, fields) in document.data {
            let id = Uuid::parse_str(&id_text).map(RowId).map_err(|err| {
                Error::new(
                    ErrorKind::Decode,
                    format!("invalid row id '{}': {}", id_text, err),
                )
            })?;

            let mut leaves = Vec::with_capacity(fields.len());
            for (field, value) in fields {
                match (kinds.get(&field), value) {
                    (Some(FieldKind::Instant), serde_json::Value::String(text)) => {
                        match DateTime::parse_from_rfc3339(&text) {
                            Ok(t) => {
                                leaves.push((field, FieldValue::Instant(t.with_timezone(&Utc))))
                            }
                            Err(err) => {
                                warn!(field = %field, error = %err, "invalid instant text skipped")
                            }
                        }
                    }
                    (Some(FieldKind::Text), serde_json::Value::String(text)) => {
                        leaves.push((field, FieldValue::Text(text)));
                    }
                    (_, value) => flatten_into(field, Value::from(value), &mut leaves),
                }
            }
            rows.push((id, leaves));
        }

        let mut expiries: Vec<(RowId, DateTime<Utc>)> = Vec::with_capacity(document.expire_at.len());
        for (id_text, at_text) in document.expire_at {
            let Ok(id) = Uuid::parse_str(&id_text).map(RowId) else {
                continue;
            };
            let Ok(at) = DateTime::parse_from_rfc3339(&at_text) else {
                continue;
            };
            expiries.push((id, at.with_timezone(&Utc)));
        }

        let was_running = self.reaper_running();
        if was_running {
            self.stop_reaper();
        }

        {
            let mut state = self.inner.state.write();
            state.data.clear();
            state.expire_at.clear();
            state.keys.clear();
            state.indexes.clear();
            state.ttl = TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX);

            for (id, leaves) in rows {
                state.insert_leaves(id, leaves);
            }
            for (id, at) in expiries {
                if state.data.contains_key(&id) {
                    state.expire_at.insert(id, at);
                }
            }
        }

        if was_running {
            self.start_reaper();
        }
        Ok(())
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}
