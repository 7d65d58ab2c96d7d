use thiserror::Error;

use crate::event::EventId;

/// Errors from repository operations (record store, vector index, embedder).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("query error: {0}")]
    Query(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for RepositoryError {
    fn from(e: std::io::Error) -> Self {
        RepositoryError::Io(e.to_string())
    }
}

/// Which half of a two-store write left the catalog inconsistent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsistencyStage {
    /// The record was written but the vector index write failed.
    IndexWrite,
    /// The index entry was removed but the record removal failed.
    RecordDelete,
    /// The nearest neighbor's id has no record in the store.
    MissingRecord,
}

impl std::fmt::Display for ConsistencyStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConsistencyStage::IndexWrite => "index write",
            ConsistencyStage::RecordDelete => "record delete",
            ConsistencyStage::MissingRecord => "missing record",
        };
        f.write_str(s)
    }
}

/// Errors from the catalog's dedup engine.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Candidate rejected before any store was touched.
    #[error("validation error: {0}")]
    Validation(String),

    /// Embedder, vector index, or record store call failed. Nothing was
    /// left half-applied.
    #[error("collaborator error: {0}")]
    Collaborator(String),

    /// The record store and vector index diverged for one decision.
    /// `rolled_back` tells whether the first write was undone.
    #[error(
        "consistency violation for event {event_id} at {stage}: {detail} (rolled back: {rolled_back})"
    )]
    ConsistencyViolation {
        event_id: EventId,
        stage: ConsistencyStage,
        detail: String,
        rolled_back: bool,
    },

    /// Raised by the outer surfaces when a requested id has no record.
    #[error("event {0} not found")]
    NotFound(EventId),
}

impl CatalogError {
    pub fn validation(msg: impl Into<String>) -> Self {
        CatalogError::Validation(msg.into())
    }

    /// True when the error means both stores may no longer agree.
    pub fn is_consistency_violation(&self) -> bool {
        matches!(self, CatalogError::ConsistencyViolation { .. })
    }
}

impl From<RepositoryError> for CatalogError {
    fn from(e: RepositoryError) -> Self {
        CatalogError::Collaborator(e.to_string())
    }
}

/// Errors from the classify/extract ingestion pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("classifier error: {0}")]
    Classifier(String),

    #[error("extractor error: {0}")]
    Extractor(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
