//! JSON-file record store.
//!
//! The whole catalog lives in one JSON array on disk, mirrored in memory.
//! Every mutation is applied to a copy, written to a temporary file in the
//! same directory, and renamed over the original; the in-memory copy is
//! swapped only after the rename succeeds. A failed write therefore leaves
//! both the file and the in-memory view at their previous state.
//!
//! Writers queue on `writer` for the whole copy/persist/swap sequence.
//! The `records` lock is only taken for the clone and the swap, so readers
//! never wait on disk I/O.

use std::io::Write;
use std::path::{Path, PathBuf};

use tokio::sync::{Mutex, RwLock};

use eventwatch_core::catalog::store::RecordStore;
use eventwatch_types::error::RepositoryError;
use eventwatch_types::event::{EventBody, EventId, EventRecord};

pub struct JsonRecordStore {
    path: PathBuf,
    records: RwLock<Vec<EventRecord>>,
    writer: Mutex<()>,
}

impl JsonRecordStore {
    /// Open the store at `path`, creating an empty `[]` file if missing.
    ///
    /// A file that exists but does not hold a JSON array of records is an
    /// error rather than silently treated as empty.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        let path = path.into();

        let records = match tokio::fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str::<Vec<EventRecord>>(&content).map_err(|e| {
                RepositoryError::Io(format!("malformed record file {}: {e}", path.display()))
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    tokio::fs::create_dir_all(parent).await?;
                }
                write_atomically(path.clone(), b"[]".to_vec()).await?;
                tracing::info!(path = %path.display(), "Created empty record file");
                Vec::new()
            }
            Err(err) => return Err(err.into()),
        };

        tracing::debug!(path = %path.display(), count = records.len(), "Record store opened");
        Ok(Self {
            path,
            records: RwLock::new(records),
            writer: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize `records` and replace the file contents.
    async fn persist(&self, records: &[EventRecord]) -> Result<(), RepositoryError> {
        let bytes = serde_json::to_vec_pretty(records)
            .map_err(|e| RepositoryError::Io(format!("failed to serialize records: {e}")))?;
        write_atomically(self.path.clone(), bytes).await
    }

    /// Apply `change` to a copy of the records, persist it, then publish it.
    ///
    /// `change` returns `None` to leave the store untouched.
    async fn mutate<T>(
        &self,
        change: impl FnOnce(&mut Vec<EventRecord>) -> Option<T>,
    ) -> Result<Option<T>, RepositoryError> {
        let _writer = self.writer.lock().await;

        let mut next = self.records.read().await.clone();
        let Some(result) = change(&mut next) else {
            return Ok(None);
        };
        self.persist(&next).await?;

        *self.records.write().await = next;
        Ok(Some(result))
    }
}

/// Write `bytes` to a sibling temp file, fsync it, then rename over `path`.
async fn write_atomically(path: PathBuf, bytes: Vec<u8>) -> Result<(), RepositoryError> {
    tokio::task::spawn_blocking(move || -> Result<(), RepositoryError> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| RepositoryError::Io(e.error.to_string()))?;
        Ok(())
    })
    .await
    .map_err(|e| RepositoryError::Io(format!("record writer task failed: {e}")))?
}

impl RecordStore for JsonRecordStore {
    async fn add(&self, body: &EventBody) -> Result<EventId, RepositoryError> {
        let id = EventId::new();
        self.mutate(|records| {
            records.push(EventRecord::new(id, body.clone()));
            Some(())
        })
        .await?;
        Ok(id)
    }

    async fn update(&self, id: &EventId, body: &EventBody) -> Result<bool, RepositoryError> {
        let updated = self
            .mutate(|records| {
                let record = records.iter_mut().find(|r| &r.id == id)?;
                record.body = body.clone();
                Some(())
            })
            .await?;
        Ok(updated.is_some())
    }

    async fn delete(&self, id: &EventId) -> Result<bool, RepositoryError> {
        let deleted = self
            .mutate(|records| {
                let pos = records.iter().position(|r| &r.id == id)?;
                records.remove(pos);
                Some(())
            })
            .await?;
        Ok(deleted.is_some())
    }

    async fn get(&self, id: &EventId) -> Result<Option<EventRecord>, RepositoryError> {
        let records = self.records.read().await;
        Ok(records.iter().find(|r| &r.id == id).cloned())
    }

    async fn list(&self) -> Result<Vec<EventRecord>, RepositoryError> {
        Ok(self.records.read().await.clone())
    }
}
