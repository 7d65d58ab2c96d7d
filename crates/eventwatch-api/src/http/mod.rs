//! HTTP/REST API layer for eventwatch.
//!
//! Axum-based REST API under `/api/` with the envelope response format and
//! CORS for the dashboard frontend.

pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
