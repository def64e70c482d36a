//! HTTP surface for the tiller state engine.
//!
//! Exposes the task/run mutation endpoints (optimistic concurrency via
//! `If-Match`/`ETag`), audit and history queries, rate-limited log
//! ingestion, and the SSE event tail.

pub mod api_error;
pub mod http_api;
