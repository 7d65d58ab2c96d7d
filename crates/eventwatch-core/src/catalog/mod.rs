//! The deduplicated event catalog.
//!
//! `EventCatalog` owns the write path to both the record store and the
//! vector index. Reads may go straight to the record store.

pub mod box_embedder;
pub mod embedder;
pub mod engine;
pub mod query;
pub mod reconcile;
pub mod store;
pub mod vector;

#[cfg(test)]
pub(crate) mod testing;
