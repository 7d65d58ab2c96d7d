//! Catalog engine and ingestion logic for eventwatch.
//!
//! This crate defines the "ports" (record store, vector index, embedder,
//! classifier, extractor) that the infrastructure layer implements, plus the
//! dedup engine that keeps the record store and vector index consistent.
//! It depends only on `eventwatch-types` -- never on `eventwatch-infra`.

pub mod catalog;
pub mod ingest;
