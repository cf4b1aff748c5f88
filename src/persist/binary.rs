use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use chrono::{DateTime, TimeDelta, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{Row, RowId};
use crate::index::registry::TypeRegistry;
use crate::index::typed::TypedIndexes;
use crate::persist::SNAPSHOT_VERSION;
use crate::store::table::Table;

/// The whole table state in serializable form, indexes included, so a load
/// restores without reindexing. Cached patterns persist as their texts and
/// are recompiled on load.
#[derive(Serialize, Deserialize)]
pub(crate) struct Snapshot {
    pub version: u32,
    pub ttl_nanos: i64,
    pub data: HashMap<RowId, Row>,
    pub keys: TypeRegistry,
    pub indexes: TypedIndexes,
    pub expire_at: HashMap<RowId, DateTime<Utc>>,
    pub max_regex_cache: usize,
    pub regex_patterns: Vec<String>,
}

impl Table {
    pub(crate) fn snapshot(&self) -> Snapshot {
        let state = self.inner.state.read();
        Snapshot {
            version: SNAPSHOT_VERSION,
            ttl_nanos: state.ttl.num_nanoseconds().unwrap_or(i64::MAX),
            data: state.data.clone(),
            keys: state.keys.clone(),
            indexes: state.indexes.clone(),
            expire_at: state.expire_at.clone(),
            max_regex_cache: self.inner.patterns.stats().capacity,
            regex_patterns: self.inner.patterns.patterns(),
        }
    }

    /// Write a snapshot to a sibling temp file, then rename into place.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let snapshot = self.snapshot();

        let tmp = NamedTempFile::new_in(parent_dir(path))?;
        let mut writer = BufWriter::new(tmp.as_file());
        bincode::serialize_into(&mut writer, &snapshot)?;
        writer.flush()?;
        drop(writer);

        tmp.persist(path)
            .map_err(|err| Error::new(ErrorKind::Io, err.to_string()))?;
        Ok(())
    }

    /// Like `save`, with single-stream gzip around the encoding.
    pub fn save_compressed(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let snapshot = self.snapshot();

        let tmp = NamedTempFile::new_in(parent_dir(path))?;
        let mut encoder = GzEncoder::new(BufWriter::new(tmp.as_file()), Compression::default());
        bincode::serialize_into(&mut encoder, &snapshot)?;
        encoder
            .finish()
            .map_err(Error::from)?
            .flush()
            .map_err(Error::from)?;

        tmp.persist(path)
            .map_err(|err| Error::new(ErrorKind::Io, err.to_string()))?;
        Ok(())
    }

    pub fn save_to_writer<W: Write>(&self, writer: W) -> Result<()> {
        bincode::serialize_into(writer, &self.snapshot()).map_err(Error::from)
    }

    pub fn load(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::open(path)?;
        let snapshot = bincode::deserialize_from(BufReader::new(file))?;
        self.restore(snapshot)
    }

    pub fn load_compressed(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::open(path)?;
        let decoder = GzDecoder::new(BufReader::new(file));
        let snapshot = bincode::deserialize_from(decoder)?;
        self.restore(snapshot)
    }

    pub fn load_from_reader<R: Read>(&self, reader: R) -> Result<()> {
        let snapshot = bincode::deserialize_from(reader)?;
        self.restore(snapshot)
    }

    /// Replace the whole state from a decoded snapshot. A running reaper is
    /// stopped first and restarted afterwards; the version gate rejects
    /// snapshots newer than this build before anything is touched.
    pub(crate) fn restore(&self, snapshot: Snapshot) -> Result<()> {
        if snapshot.version > SNAPSHOT_VERSION {
            return Err(Error::new(
                ErrorKind::UnsupportedVersion,
                format!(
                    "unsupported snapshot version {} (current version is {})",
                    snapshot.version, SNAPSHOT_VERSION
                ),
            ));
        }

        let was_running = self.reaper_running();
        if was_running {
            self.stop_reaper();
        }

        {
            let mut state = self.inner.state.write();
            state.data = snapshot.data;
            state.keys = snapshot.keys;
            state.indexes = snapshot.indexes;
            state.expire_at = snapshot.expire_at;
            state.ttl = TimeDelta::nanoseconds(snapshot.ttl_nanos);
        }

        self.inner.patterns.clear();
        self.inner.patterns.resize(snapshot.max_regex_cache);
        self.inner.patterns.preload(&snapshot.regex_patterns);

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
