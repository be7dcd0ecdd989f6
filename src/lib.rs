// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod bootstrap;
pub mod config;
pub mod event;
pub mod ingest;
pub mod market;
pub mod metrics;
pub mod quotes;
pub mod store;
pub mod summarize;

pub use crate::api::router;
