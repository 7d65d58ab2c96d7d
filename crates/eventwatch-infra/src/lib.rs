//! Infrastructure layer for eventwatch.
//!
//! Contains implementations of the ports defined in `eventwatch-core`:
//! the JSON-file record store, the LanceDB vector index, the fastembed
//! embedder, and the OpenAI-backed classifier/extractor. Also owns
//! config loading and data directory resolution.

pub mod config;
pub mod llm;
pub mod record;
pub mod vector;
