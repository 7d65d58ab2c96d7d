//! Vector index infrastructure for event summary embeddings.
//!
//! Provides LanceDB connection management, the Arrow schema for the event
//! table, the [`VectorIndex`](eventwatch_core::catalog::vector::VectorIndex)
//! implementation, and fastembed-based local embedding generation.

pub mod embedder;
pub mod index;
pub mod lance;
pub mod schema;
