//! Shared domain types for eventwatch.
//!
//! This crate contains the catalog's domain types: event records, dedup
//! outcomes, read-side filters, humanitarian categories, configuration,
//! and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, serde_json, uuid, chrono, thiserror.

pub mod config;
pub mod error;
pub mod event;
