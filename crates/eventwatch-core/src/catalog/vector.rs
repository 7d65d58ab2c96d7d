//! Vector index trait.
//!
//! Stores one embedding per event id and answers nearest-neighbor queries.
//! Each entry also keeps the summary it was computed from so reconciliation
//! can tell a stale embedding from a current one.

use eventwatch_types::error::RepositoryError;
use eventwatch_types::event::EventId;

/// A query hit: an indexed event and its distance to the query vector.
///
/// Lower distance means more similar. The scale depends on the index metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub id: EventId,
    pub distance: f32,
}

/// An index entry as seen by reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedSummary {
    pub id: EventId,
    pub summary: String,
}

/// Trait for a similarity-searchable index of event summary embeddings.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
/// Implementations live in eventwatch-infra.
pub trait VectorIndex: Send + Sync {
    /// Insert or replace the embedding for `id`.
    fn upsert(
        &self,
        id: &EventId,
        summary: &str,
        vector: &[f32],
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Up to `k` entries ordered by ascending distance. Empty when the index is empty.
    fn query_nearest(
        &self,
        vector: &[f32],
        k: usize,
    ) -> impl std::future::Future<Output = Result<Vec<Neighbor>, RepositoryError>> + Send;

    /// Remove the embedding for `id`. No-op if absent.
    fn delete(
        &self,
        id: &EventId,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Every indexed id with the summary its embedding was computed from.
    fn entries(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<IndexedSummary>, RepositoryError>> + Send;

    /// Number of indexed entries.
    fn count(&self) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;
}
