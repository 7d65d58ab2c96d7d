//! Ingestion: from raw report text or an extracted payload to a catalog decision.
//!
//! `payload` is the boundary that normalizes whatever the extractor handed
//! over into an [`EventBody`](eventwatch_types::event::EventBody). The
//! `classifier` and `extractor` ports are implemented in eventwatch-infra;
//! `pipeline` chains them in front of the catalog.

pub mod classifier;
pub mod extractor;
pub mod payload;
pub mod pipeline;
