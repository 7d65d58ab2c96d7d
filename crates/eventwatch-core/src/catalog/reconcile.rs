//! Reconciliation between the record store and the vector index.
//!
//! Restores the invariant that every record has exactly one index entry
//! carrying the embedding of its current summary, and that every index
//! entry has a record. Runs at startup and on demand.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{info, warn};

use eventwatch_types::error::CatalogError;
use eventwatch_types::event::{EventId, EventRecord};

use super::engine::EventCatalog;
use super::store::RecordStore;
use super::vector::VectorIndex;

/// What a reconciliation pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Records seen in the store.
    pub records: usize,
    /// Records whose index entry was missing or stale and got re-embedded.
    pub reindexed: usize,
    /// Index entries without a record that were removed.
    pub pruned: usize,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.reindexed == 0 && self.pruned == 0
    }
}

impl<R: RecordStore, V: VectorIndex> EventCatalog<R, V> {
    /// Scan both stores and repair any divergence.
    ///
    /// Holds the mutation lock for the whole pass.
    #[tracing::instrument(name = "reconcile", skip_all)]
    pub async fn reconcile(&self) -> Result<ReconcileReport, CatalogError> {
        let _guard = self.write_lock.lock().await;

        let records = self.records.list().await?;
        let indexed: HashMap<EventId, String> = self
            .index
            .entries()
            .await?
            .into_iter()
            .map(|entry| (entry.id, entry.summary))
            .collect();

        let stale: Vec<&EventRecord> = records
            .iter()
            .filter(|record| indexed.get(&record.id) != Some(&record.body.summary))
            .collect();

        let mut report = ReconcileReport {
            records: records.len(),
            ..Default::default()
        };

        if !stale.is_empty() {
            let summaries: Vec<String> = stale.iter().map(|r| r.body.summary.clone()).collect();
            let vectors = self.embedder.embed(&summaries).await?;
            if vectors.len() != stale.len() {
                return Err(CatalogError::Collaborator(format!(
                    "embedder returned {} vectors for {} summaries",
                    vectors.len(),
                    stale.len()
                )));
            }

            for (record, vector) in stale.iter().zip(&vectors) {
                self.index
                    .upsert(&record.id, &record.body.summary, vector)
                    .await?;
                report.reindexed += 1;
            }
        }

        let live: HashSet<EventId> = records.iter().map(|r| r.id).collect();
        for id in indexed.keys().filter(|id| !live.contains(id)) {
            self.index.delete(id).await?;
            report.pruned += 1;
        }

        if report.is_clean() {
            info!(records = report.records, "Catalog consistent");
        } else {
            warn!(
                records = report.records,
                reindexed = report.reindexed,
                pruned = report.pruned,
                "Catalog repaired"
            );
        }

        Ok(report)
    }
}
