//! App state persisted as a JSON snapshot on local disk.

use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind as IoErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::config::{SerializerConfig, StorageConfig};
use crate::snapshot::{Snapshot, SnapshotSerializer, Value};
use crate::storage::StorageResult;

#[derive(Debug, Clone)]
pub struct StateFile {
    path: PathBuf,
    serializer: SnapshotSerializer,
}

impl StateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            serializer: SnapshotSerializer::default(),
        }
    }

    pub fn from_config(storage: &StorageConfig, serializer: &SerializerConfig) -> Self {
        Self {
            path: PathBuf::from(&storage.state_path),
            serializer: SnapshotSerializer::from_config(serializer),
        }
    }

    pub fn with_depth_limit(mut self, depth_limit: usize) -> Self {
        self.serializer = SnapshotSerializer::new(depth_limit);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sanitize `state` and write it to disk, replacing any previous file.
    ///
    /// Returns the snapshot that was written.
    pub fn save(&self, state: &Value) -> StorageResult<Snapshot> {
        let snapshot = self.serializer.serialize(state);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(&self.path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &snapshot)?;
        writer.flush()?;

        tracing::debug!(path = ?self.path, "Saved state snapshot");
        Ok(snapshot)
    }

    /// Read the last saved snapshot. `None` when nothing has been saved.
    pub fn load(&self) -> StorageResult<Option<serde_json::Value>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let reader = BufReader::new(file);
        let state = serde_json::from_reader(reader)?;
        tracing::info!(path = ?self.path, "Loaded state snapshot");
        Ok(Some(state))
    }
}
