//! RecordStore trait definition.
//!
//! The durable `id -> EventRecord` mapping. Every mutating call commits to
//! durable storage before returning, and a failed commit leaves the store
//! exactly as it was before the call.

use eventwatch_types::error::RepositoryError;
use eventwatch_types::event::{EventBody, EventId, EventRecord};

/// Repository trait for event record persistence.
///
/// Implementations live in eventwatch-infra (e.g., `JsonRecordStore`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait RecordStore: Send + Sync {
    /// Append a record with a freshly assigned id and return that id.
    fn add(
        &self,
        body: &EventBody,
    ) -> impl std::future::Future<Output = Result<EventId, RepositoryError>> + Send;

    /// Replace the body stored at `id`. Returns `false` if `id` is unknown.
    fn update(
        &self,
        id: &EventId,
        body: &EventBody,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// Remove the record at `id`. Returns `false` if `id` is unknown.
    fn delete(
        &self,
        id: &EventId,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// Look up a single record.
    fn get(
        &self,
        id: &EventId,
    ) -> impl std::future::Future<Output = Result<Option<EventRecord>, RepositoryError>> + Send;

    /// Point-in-time snapshot of all live records in insertion order.
    fn list(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<EventRecord>, RepositoryError>> + Send;
}
