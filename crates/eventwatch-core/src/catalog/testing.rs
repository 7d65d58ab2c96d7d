//! In-memory test doubles for the catalog ports.
//!
//! The mock index measures distance as the L1 norm of the difference so
//! that one-dimensional test vectors produce exact, predictable distances.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use eventwatch_types::error::RepositoryError;
use eventwatch_types::event::{EventBody, EventId, EventRecord};

use super::embedder::Embedder;
use super::store::RecordStore;
use super::vector::{IndexedSummary, Neighbor, VectorIndex};

/// Embedder that maps known texts to fixed vectors.
pub struct MockEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    delay: Option<Duration>,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self {
            vectors: HashMap::new(),
            delay: None,
        }
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    /// Sleep inside every embed call, widening race windows.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl Embedder for MockEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RepositoryError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        texts
            .iter()
            .map(|text| {
                self.vectors
                    .get(text)
                    .cloned()
                    .ok_or_else(|| RepositoryError::Query(format!("no vector for '{text}'")))
            })
            .collect()
    }

    fn model_name(&self) -> &str {
        "mock-embedder"
    }

    fn dimension(&self) -> usize {
        self.vectors.values().next().map_or(1, Vec::len)
    }
}

/// Record store backed by a vector, with switchable write failures.
#[derive(Default)]
pub struct MockRecordStore {
    records: Mutex<Vec<EventRecord>>,
    pub fail_add: AtomicBool,
    pub fail_update: AtomicBool,
    pub fail_delete: AtomicBool,
}

impl MockRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<EventRecord> {
        self.records.lock().unwrap().clone()
    }

    /// Insert a record directly, bypassing the catalog.
    pub fn seed(&self, record: EventRecord) {
        self.records.lock().unwrap().push(record);
    }

    fn check(flag: &AtomicBool, op: &str) -> Result<(), RepositoryError> {
        if flag.load(Ordering::SeqCst) {
            Err(RepositoryError::Io(format!("{op} failed")))
        } else {
            Ok(())
        }
    }
}

impl RecordStore for MockRecordStore {
    async fn add(&self, body: &EventBody) -> Result<EventId, RepositoryError> {
        Self::check(&self.fail_add, "add")?;
        let id = EventId::new();
        self.records
            .lock()
            .unwrap()
            .push(EventRecord::new(id, body.clone()));
        Ok(id)
    }

    async fn update(&self, id: &EventId, body: &EventBody) -> Result<bool, RepositoryError> {
        Self::check(&self.fail_update, "update")?;
        let mut records = self.records.lock().unwrap();
        match records.iter_mut().find(|r| &r.id == id) {
            Some(record) => {
                record.body = body.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &EventId) -> Result<bool, RepositoryError> {
        Self::check(&self.fail_delete, "delete")?;
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|r| &r.id != id);
        Ok(records.len() != before)
    }

    async fn get(&self, id: &EventId) -> Result<Option<EventRecord>, RepositoryError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| &r.id == id)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<EventRecord>, RepositoryError> {
        Ok(self.snapshot())
    }
}

/// Brute-force vector index with switchable failures.
#[derive(Default)]
pub struct MockVectorIndex {
    entries: Mutex<HashMap<EventId, (String, Vec<f32>)>>,
    pub fail_upsert: AtomicBool,
    pub fail_query: AtomicBool,
    pub fail_delete: AtomicBool,
}

impl MockVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vector_of(&self, id: &EventId) -> Option<Vec<f32>> {
        self.entries.lock().unwrap().get(id).map(|(_, v)| v.clone())
    }

    pub fn summary_of(&self, id: &EventId) -> Option<String> {
        self.entries.lock().unwrap().get(id).map(|(s, _)| s.clone())
    }

    pub fn ids(&self) -> Vec<EventId> {
        let mut ids: Vec<EventId> = self.entries.lock().unwrap().keys().copied().collect();
        ids.sort();
        ids
    }

    /// Insert an entry directly, bypassing the catalog.
    pub fn seed(&self, id: EventId, summary: &str, vector: Vec<f32>) {
        self.entries
            .lock()
            .unwrap()
            .insert(id, (summary.to_string(), vector));
    }

    fn check(flag: &AtomicBool, op: &str) -> Result<(), RepositoryError> {
        if flag.load(Ordering::SeqCst) {
            Err(RepositoryError::Query(format!("{op} failed")))
        } else {
            Ok(())
        }
    }
}

impl VectorIndex for MockVectorIndex {
    async fn upsert(&self, id: &EventId, summary: &str, vector: &[f32]) -> Result<(), RepositoryError> {
        Self::check(&self.fail_upsert, "upsert")?;
        self.entries
            .lock()
            .unwrap()
            .insert(*id, (summary.to_string(), vector.to_vec()));
        Ok(())
    }

    async fn query_nearest(&self, vector: &[f32], k: usize) -> Result<Vec<Neighbor>, RepositoryError> {
        Self::check(&self.fail_query, "query")?;
        let entries = self.entries.lock().unwrap();
        let mut hits: Vec<Neighbor> = entries
            .iter()
            .map(|(id, (_, stored))| Neighbor {
                id: *id,
                distance: stored
                    .iter()
                    .zip(vector)
                    .map(|(a, b)| (a - b).abs())
                    .sum(),
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);
        Ok(hits)
    }

    async fn delete(&self, id: &EventId) -> Result<(), RepositoryError> {
        Self::check(&self.fail_delete, "delete")?;
        self.entries.lock().unwrap().remove(id);
        Ok(())
    }

    async fn entries(&self) -> Result<Vec<IndexedSummary>, RepositoryError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .map(|(id, (summary, _))| IndexedSummary {
                id: *id,
                summary: summary.clone(),
            })
            .collect())
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        Ok(self.entries.lock().unwrap().len() as u64)
    }
}
