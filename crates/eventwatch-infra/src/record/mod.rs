//! Record store implementations.

pub mod json_store;
