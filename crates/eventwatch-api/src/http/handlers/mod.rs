//! HTTP request handlers for the REST API.

pub mod admin;
pub mod events;
pub mod ingest;
pub mod stats;
