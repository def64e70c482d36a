use serde::{Deserialize, Serialize};
use tiller_core::types::{RunStatus, TaskStatus};

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct TaskListQuery {
    pub status: Option<TaskStatus>,
}

#[derive(Debug, Deserialize)]
pub struct AuditListQuery {
    pub limit: Option<usize>,
    pub mode: Option<String>,
    /// RFC 3339 timestamps, inclusive bounds.
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryListQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryDeleteQuery {
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TransitionRunRequest {
    pub status: RunStatus,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Uniform list envelope: `{"items": [...]}`.
#[derive(Debug, Serialize)]
pub struct ItemsResponse<T> {
    pub items: Vec<T>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResponse {
    pub accepted: usize,
    pub skipped: usize,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub version: String,
    pub uptime_seconds: u64,
    pub task_count: usize,
    pub run_count: usize,
    pub audit_entries: usize,
    pub history_packets: usize,
    pub event_subscribers: usize,
}
