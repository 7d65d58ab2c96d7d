//! The dedup engine.
//!
//! `EventCatalog` decides whether a candidate event describes an event that
//! is already catalogued (merge into it) or a new one (insert), and applies
//! that decision to both the record store and the vector index.
//!
//! All mutations are serialized by a single async mutex: the decision is a
//! read-nearest-then-write sequence, so two concurrent candidates with
//! similar summaries would otherwise both see "no neighbor" and both insert.
//! Readers never take this lock.
//!
//! The two stores have no shared transaction. Each decision writes the
//! record store first and the vector index second; if the second write
//! fails, the first is rolled back on a best-effort basis and the call
//! reports [`CatalogError::ConsistencyViolation`]. Anything left diverged is
//! repaired by [`EventCatalog::reconcile`](super::reconcile).

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use eventwatch_types::error::{CatalogError, ConsistencyStage};
use eventwatch_types::event::{DedupOutcome, EventBody, EventId, EventRecord};

use super::box_embedder::BoxEmbedder;
use super::store::RecordStore;
use super::vector::{Neighbor, VectorIndex};

/// Deduplicated event catalog over a record store and a vector index.
///
/// Generic over the storage ports so eventwatch-core never depends on
/// eventwatch-infra; the binary pins the concrete types.
pub struct EventCatalog<R: RecordStore, V: VectorIndex> {
    pub(super) records: R,
    pub(super) index: V,
    pub(super) embedder: Arc<BoxEmbedder>,
    threshold: f32,
    pub(super) write_lock: Mutex<()>,
}

impl<R: RecordStore, V: VectorIndex> EventCatalog<R, V> {
    /// Create a catalog.
    ///
    /// - `threshold`: candidates whose nearest neighbor is strictly closer
    ///   than this are merged into it. Must match the index's metric.
    pub fn new(records: R, index: V, embedder: Arc<BoxEmbedder>, threshold: f32) -> Self {
        Self {
            records,
            index,
            embedder,
            threshold,
            write_lock: Mutex::new(()),
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Read access to the record store. Does not take the mutation lock.
    pub fn record_store(&self) -> &R {
        &self.records
    }

    /// Read access to the vector index. Does not take the mutation lock.
    pub fn vector_index(&self) -> &V {
        &self.index
    }

    /// Snapshot of every catalogued event.
    pub async fn list(&self) -> Result<Vec<EventRecord>, CatalogError> {
        Ok(self.records.list().await?)
    }

    /// Look up one catalogued event.
    pub async fn get(&self, id: &EventId) -> Result<Option<EventRecord>, CatalogError> {
        Ok(self.records.get(id).await?)
    }

    /// Merge `candidate` into its nearest catalogued event, or insert it.
    ///
    /// 1. Reject an empty summary (no store is touched).
    /// 2. Embed the summary and find the single nearest indexed event.
    /// 3. If its distance is strictly below the threshold, replace that
    ///    record wholesale (keeping its id) and re-index it with the new
    ///    embedding. Otherwise insert a new record and index it.
    #[tracing::instrument(name = "decide_and_apply", skip_all)]
    pub async fn decide_and_apply(&self, candidate: EventBody) -> Result<DedupOutcome, CatalogError> {
        validate_summary(&candidate)?;

        let _guard = self.write_lock.lock().await;

        let vector = self.embedder.embed_one(&candidate.summary).await?;
        let nearest = self.index.query_nearest(&vector, 1).await?;

        match nearest.into_iter().next() {
            Some(neighbor) if neighbor.distance < self.threshold => {
                debug!(
                    event_id = %neighbor.id,
                    distance = neighbor.distance,
                    threshold = self.threshold,
                    "Candidate matches existing event"
                );
                self.merge_into(neighbor, candidate, vector).await
            }
            nearest => {
                debug!(
                    nearest_distance = ?nearest.map(|n| n.distance),
                    threshold = self.threshold,
                    "Candidate is a new event"
                );
                self.insert_new(candidate, vector).await
            }
        }
    }

    async fn merge_into(
        &self,
        neighbor: Neighbor,
        candidate: EventBody,
        vector: Vec<f32>,
    ) -> Result<DedupOutcome, CatalogError> {
        let id = neighbor.id;

        let Some(previous) = self.records.get(&id).await? else {
            return Err(missing_record(id));
        };

        if !self.records.update(&id, &candidate).await? {
            return Err(missing_record(id));
        }

        if let Err(e) = self.index.upsert(&id, &candidate.summary, &vector).await {
            let rolled_back = match self.records.update(&id, &previous.body).await {
                Ok(restored) => restored,
                Err(rollback_err) => {
                    warn!(event_id = %id, error = %rollback_err, "Rollback of record update failed");
                    false
                }
            };
            error!(event_id = %id, error = %e, rolled_back, "Index write failed after record update");
            return Err(CatalogError::ConsistencyViolation {
                event_id: id,
                stage: ConsistencyStage::IndexWrite,
                detail: e.to_string(),
                rolled_back,
            });
        }

        info!(event_id = %id, distance = neighbor.distance, "Event updated");
        Ok(DedupOutcome::Updated {
            id,
            distance: neighbor.distance,
        })
    }

    async fn insert_new(
        &self,
        candidate: EventBody,
        vector: Vec<f32>,
    ) -> Result<DedupOutcome, CatalogError> {
        let id = self.records.add(&candidate).await?;

        if let Err(e) = self.index.upsert(&id, &candidate.summary, &vector).await {
            let rolled_back = match self.records.delete(&id).await {
                Ok(removed) => removed,
                Err(rollback_err) => {
                    warn!(event_id = %id, error = %rollback_err, "Rollback of record insert failed");
                    false
                }
            };
            error!(event_id = %id, error = %e, rolled_back, "Index write failed after record insert");
            return Err(CatalogError::ConsistencyViolation {
                event_id: id,
                stage: ConsistencyStage::IndexWrite,
                detail: e.to_string(),
                rolled_back,
            });
        }

        info!(event_id = %id, "Event inserted");
        Ok(DedupOutcome::Inserted { id })
    }

    /// Remove an event from both stores.
    ///
    /// Returns `Ok(false)` if no record has this id. The index entry goes
    /// first; if the record removal then fails, the entry is re-embedded
    /// and restored.
    #[tracing::instrument(name = "delete_event", skip_all, fields(event_id = %id))]
    pub async fn delete(&self, id: &EventId) -> Result<bool, CatalogError> {
        let _guard = self.write_lock.lock().await;

        let Some(record) = self.records.get(id).await? else {
            return Ok(false);
        };

        self.index.delete(id).await?;

        match self.records.delete(id).await {
            Ok(removed) => {
                info!(event_id = %id, "Event deleted");
                Ok(removed)
            }
            Err(e) => {
                let summary = &record.body.summary;
                let rolled_back = match self.embedder.embed_one(summary).await {
                    Ok(vector) => self.index.upsert(id, summary, &vector).await.is_ok(),
                    Err(_) => false,
                };
                error!(event_id = %id, error = %e, rolled_back, "Record delete failed after index delete");
                Err(CatalogError::ConsistencyViolation {
                    event_id: *id,
                    stage: ConsistencyStage::RecordDelete,
                    detail: e.to_string(),
                    rolled_back,
                })
            }
        }
    }
}

fn validate_summary(candidate: &EventBody) -> Result<(), CatalogError> {
    if candidate.summary.trim().is_empty() {
        return Err(CatalogError::validation("event must include a summary field"));
    }
    Ok(())
}

fn missing_record(id: EventId) -> CatalogError {
    error!(event_id = %id, "Nearest neighbor has no record");
    CatalogError::ConsistencyViolation {
        event_id: id,
        stage: ConsistencyStage::MissingRecord,
        detail: "indexed event has no stored record; run reconciliation".to_string(),
        rolled_back: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use crate::catalog::testing::{MockEmbedder, MockRecordStore, MockVectorIndex};

    type TestCatalog = EventCatalog<MockRecordStore, MockVectorIndex>;

    fn catalog_with(embedder: MockEmbedder) -> TestCatalog {
        EventCatalog::new(
            MockRecordStore::new(),
            MockVectorIndex::new(),
            Arc::new(BoxEmbedder::new(embedder)),
            0.6,
        )
    }

    fn scenario_embedder() -> MockEmbedder {
        MockEmbedder::new()
            .with("Flood in Riverside", vec![0.0])
            .with("Major flood hits Riverside area", vec![0.3])
            .with("Wildfire near Crestview", vec![1.2])
    }

    fn assert_stores_agree(catalog: &TestCatalog) {
        let records = catalog.record_store().snapshot();
        let mut record_ids: Vec<EventId> = records.iter().map(|r| r.id).collect();
        record_ids.sort();
        assert_eq!(record_ids, catalog.vector_index().ids());
        for record in &records {
            assert_eq!(
                catalog.vector_index().summary_of(&record.id).as_deref(),
                Some(record.body.summary.as_str())
            );
        }
    }

    #[tokio::test]
    async fn test_flood_then_wildfire_scenario() {
        let catalog = catalog_with(scenario_embedder());

        let first = catalog
            .decide_and_apply(EventBody::new("Flood in Riverside"))
            .await
            .unwrap();
        let DedupOutcome::Inserted { id: x } = first else {
            panic!("expected insert, got {first:?}");
        };

        let second = EventBody::new("Major flood hits Riverside area").with_attribute("event_type", "flood");
        let outcome = catalog.decide_and_apply(second.clone()).await.unwrap();
        assert_eq!(outcome, DedupOutcome::Updated { id: x, distance: 0.3 });

        let stored = catalog.get(&x).await.unwrap().unwrap();
        assert_eq!(stored, EventRecord::new(x, second));
        assert_eq!(catalog.vector_index().vector_of(&x), Some(vec![0.3]));

        let third = catalog
            .decide_and_apply(EventBody::new("Wildfire near Crestview"))
            .await
            .unwrap();
        let DedupOutcome::Inserted { id: y } = third else {
            panic!("expected insert, got {third:?}");
        };
        assert_ne!(x, y);
        assert_eq!(catalog.list().await.unwrap().len(), 2);
        assert_stores_agree(&catalog);
    }

    #[tokio::test]
    async fn test_identical_resubmission_updates() {
        let catalog = catalog_with(scenario_embedder());

        let first = catalog
            .decide_and_apply(EventBody::new("Flood in Riverside"))
            .await
            .unwrap();
        let again = catalog
            .decide_and_apply(EventBody::new("Flood in Riverside"))
            .await
            .unwrap();

        assert_eq!(
            again,
            DedupOutcome::Updated {
                id: first.id(),
                distance: 0.0
            }
        );
        assert_eq!(catalog.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_distance_equal_to_threshold_inserts() {
        let catalog = catalog_with(
            MockEmbedder::new()
                .with("base", vec![0.0])
                .with("at threshold", vec![0.6]),
        );

        catalog.decide_and_apply(EventBody::new("base")).await.unwrap();

        let at = catalog
            .decide_and_apply(EventBody::new("at threshold"))
            .await
            .unwrap();
        assert!(matches!(at, DedupOutcome::Inserted { .. }));
    }

    #[tokio::test]
    async fn test_distance_just_below_threshold_updates() {
        let catalog = catalog_with(
            MockEmbedder::new()
                .with("base", vec![0.0])
                .with("just inside", vec![0.59]),
        );

        let base = catalog.decide_and_apply(EventBody::new("base")).await.unwrap();
        let inside = catalog
            .decide_and_apply(EventBody::new("just inside"))
            .await
            .unwrap();
        assert_eq!(
            inside,
            DedupOutcome::Updated {
                id: base.id(),
                distance: 0.59
            }
        );
    }

    #[tokio::test]
    async fn test_empty_catalog_always_inserts() {
        for summary in ["a", "b", "c"] {
            let catalog = catalog_with(MockEmbedder::new().with(summary, vec![42.0]));
            let outcome = catalog.decide_and_apply(EventBody::new(summary)).await.unwrap();
            assert!(matches!(outcome, DedupOutcome::Inserted { .. }));
            assert_stores_agree(&catalog);
        }
    }

    #[tokio::test]
    async fn test_blank_summary_is_rejected_without_mutation() {
        let catalog = catalog_with(MockEmbedder::new().with("   ", vec![0.0]));

        for summary in ["", "   "] {
            let err = catalog
                .decide_and_apply(EventBody::new(summary))
                .await
                .unwrap_err();
            assert!(matches!(err, CatalogError::Validation(_)));
        }
        assert!(catalog.record_store().snapshot().is_empty());
        assert!(catalog.vector_index().ids().is_empty());
    }

    #[tokio::test]
    async fn test_embedder_failure_is_collaborator_error() {
        let catalog = catalog_with(MockEmbedder::new());
        let err = catalog
            .decide_and_apply(EventBody::new("unmapped"))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Collaborator(_)));
        assert!(catalog.record_store().snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_query_failure_is_collaborator_error() {
        let catalog = catalog_with(scenario_embedder());
        catalog.vector_index().fail_query.store(true, Ordering::SeqCst);

        let err = catalog
            .decide_and_apply(EventBody::new("Flood in Riverside"))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Collaborator(_)));
        assert!(catalog.record_store().snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_record_write_failure_leaves_index_untouched() {
        let catalog = catalog_with(scenario_embedder());
        catalog.record_store().fail_add.store(true, Ordering::SeqCst);

        let err = catalog
            .decide_and_apply(EventBody::new("Flood in Riverside"))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Collaborator(_)));
        assert!(catalog.vector_index().ids().is_empty());
    }

    #[tokio::test]
    async fn test_index_failure_on_insert_rolls_back_record() {
        let catalog = catalog_with(scenario_embedder());
        catalog.vector_index().fail_upsert.store(true, Ordering::SeqCst);

        let err = catalog
            .decide_and_apply(EventBody::new("Flood in Riverside"))
            .await
            .unwrap_err();

        match err {
            CatalogError::ConsistencyViolation {
                stage, rolled_back, ..
            } => {
                assert_eq!(stage, ConsistencyStage::IndexWrite);
                assert!(rolled_back);
            }
            other => panic!("expected consistency violation, got {other:?}"),
        }
        assert!(catalog.record_store().snapshot().is_empty());
        assert_stores_agree(&catalog);
    }

    #[tokio::test]
    async fn test_index_failure_on_insert_with_failed_rollback() {
        let catalog = catalog_with(scenario_embedder());
        catalog.vector_index().fail_upsert.store(true, Ordering::SeqCst);
        catalog.record_store().fail_delete.store(true, Ordering::SeqCst);

        let err = catalog
            .decide_and_apply(EventBody::new("Flood in Riverside"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CatalogError::ConsistencyViolation {
                rolled_back: false,
                ..
            }
        ));
        assert_eq!(catalog.record_store().snapshot().len(), 1);
        assert!(catalog.vector_index().ids().is_empty());
    }

    #[tokio::test]
    async fn test_index_failure_on_update_restores_previous_body() {
        let catalog = catalog_with(scenario_embedder());
        let first = catalog
            .decide_and_apply(EventBody::new("Flood in Riverside"))
            .await
            .unwrap();

        catalog.vector_index().fail_upsert.store(true, Ordering::SeqCst);
        let err = catalog
            .decide_and_apply(EventBody::new("Major flood hits Riverside area"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CatalogError::ConsistencyViolation {
                rolled_back: true,
                stage: ConsistencyStage::IndexWrite,
                ..
            }
        ));
        let stored = catalog.get(&first.id()).await.unwrap().unwrap();
        assert_eq!(stored.body.summary, "Flood in Riverside");
        assert_stores_agree(&catalog);
    }

    #[tokio::test]
    async fn test_neighbor_without_record_is_consistency_violation() {
        let catalog = catalog_with(scenario_embedder());
        let orphan = EventId::new();
        catalog
            .vector_index()
            .seed(orphan, "Flood in Riverside", vec![0.0]);

        let err = catalog
            .decide_and_apply(EventBody::new("Major flood hits Riverside area"))
            .await
            .unwrap_err();

        match err {
            CatalogError::ConsistencyViolation { event_id, stage, .. } => {
                assert_eq!(event_id, orphan);
                assert_eq!(stage, ConsistencyStage::MissingRecord);
            }
            other => panic!("expected consistency violation, got {other:?}"),
        }
        assert!(catalog.record_store().snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_from_both_stores() {
        let catalog = catalog_with(scenario_embedder());
        let id = catalog
            .decide_and_apply(EventBody::new("Flood in Riverside"))
            .await
            .unwrap()
            .id();

        assert!(catalog.delete(&id).await.unwrap());
        assert!(catalog.record_store().snapshot().is_empty());
        assert!(catalog.vector_index().ids().is_empty());

        assert!(!catalog.delete(&id).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_restores_index_when_record_delete_fails() {
        let catalog = catalog_with(scenario_embedder());
        let id = catalog
            .decide_and_apply(EventBody::new("Flood in Riverside"))
            .await
            .unwrap()
            .id();

        catalog.record_store().fail_delete.store(true, Ordering::SeqCst);
        let err = catalog.delete(&id).await.unwrap_err();

        assert!(matches!(
            err,
            CatalogError::ConsistencyViolation {
                stage: ConsistencyStage::RecordDelete,
                rolled_back: true,
                ..
            }
        ));
        assert_stores_agree(&catalog);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_distinct_candidates_both_inserted() {
        let catalog = Arc::new(catalog_with(
            MockEmbedder::new()
                .with("Flood in Riverside", vec![0.0])
                .with("Earthquake in Hillview", vec![5.0])
                .with_delay(Duration::from_millis(20)),
        ));

        let a = tokio::spawn({
            let catalog = catalog.clone();
            async move { catalog.decide_and_apply(EventBody::new("Flood in Riverside")).await }
        });
        let b = tokio::spawn({
            let catalog = catalog.clone();
            async move {
                catalog
                    .decide_and_apply(EventBody::new("Earthquake in Hillview"))
                    .await
            }
        });

        let a = a.await.unwrap().unwrap();
        let b = b.await.unwrap().unwrap();
        assert!(matches!(a, DedupOutcome::Inserted { .. }));
        assert!(matches!(b, DedupOutcome::Inserted { .. }));
        assert_eq!(catalog.list().await.unwrap().len(), 2);
        assert_stores_agree(&catalog);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_similar_candidates_merge_into_one() {
        let catalog = Arc::new(catalog_with(
            MockEmbedder::new()
                .with("Flood in Riverside", vec![0.0])
                .with("Riverside flooding", vec![0.1])
                .with_delay(Duration::from_millis(20)),
        ));

        let handles: Vec<_> = ["Flood in Riverside", "Riverside flooding"]
            .into_iter()
            .map(|summary| {
                let catalog = catalog.clone();
                tokio::spawn(async move { catalog.decide_and_apply(EventBody::new(summary)).await })
            })
            .collect();

        let mut inserted = 0;
        let mut updated = 0;
        for handle in handles {
            match handle.await.unwrap().unwrap() {
                DedupOutcome::Inserted { .. } => inserted += 1,
                DedupOutcome::Updated { .. } => updated += 1,
            }
        }

        assert_eq!((inserted, updated), (1, 1));
        assert_eq!(catalog.list().await.unwrap().len(), 1);
        assert_stores_agree(&catalog);
    }
}
