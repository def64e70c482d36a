//! Alert side-channel for security-relevant ingested log entries.
//!
//! The sink is abstract: any notification backend satisfies the contract.
//! The default implementation raises a structured warning.

use tracing::warn;

pub trait AlertSink: Send + Sync {
    fn alert(&self, entry_id: &str, entry_type: &str, detail: &serde_json::Value);
}

/// Default sink: surfaces alerts through the tracing pipeline.
#[derive(Debug, Default)]
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
    fn alert(&self, entry_id: &str, entry_type: &str, detail: &serde_json::Value) {
        warn!(entry_id, entry_type, %detail, "security-relevant log entry ingested");
    }
}
