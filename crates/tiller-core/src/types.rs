use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// TaskStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Done,
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// A unit of work tracked through the status lifecycle.
///
/// The `version` field is the optimistic-concurrency token: it starts at 1
/// and strictly increases on every committed mutation. Callers must present
/// the version they last observed; a mismatch means their read is stale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub status: TaskStatus,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            status: TaskStatus::Pending,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }
}

// ---------------------------------------------------------------------------
// Run enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Plan,
    Implement,
    Critic,
    Integrate,
    Pipeline,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Plan => "plan",
            RunMode::Implement => "implement",
            RunMode::Critic => "critic",
            RunMode::Integrate => "integrate",
            RunMode::Pipeline => "pipeline",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Started,
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    /// Returns `true` when a transition from `self` to `target` is valid.
    ///
    /// The lifecycle is `started -> running -> {completed, failed}`; a run
    /// never revisits `started` and terminal states accept nothing.
    pub fn can_transition_to(&self, target: &RunStatus) -> bool {
        matches!(
            (self, target),
            (RunStatus::Started, RunStatus::Running)
                | (RunStatus::Running, RunStatus::Completed)
                | (RunStatus::Running, RunStatus::Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// The repository/branch/revision triple a run acts against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRef {
    pub repo: String,
    pub branch: String,
    pub revision: String,
}

/// One invocation of an agent/process against a target.
///
/// `completed_at` and `duration_ms` are stamped together, exactly once, when
/// the run reaches a terminal status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: Uuid,
    pub mode: RunMode,
    pub status: RunStatus,
    pub target: TargetRef,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub extra: HashMap<String, serde_json::Value>,
    pub notes: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub agent_id: Option<Uuid>,
}

/// Caller-supplied fields for creating a [`Run`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSpec {
    pub mode: RunMode,
    pub target: TargetRef,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub extra: HashMap<String, serde_json::Value>,
    pub notes: Option<String>,
    pub agent_id: Option<Uuid>,
}

impl Run {
    pub fn new(spec: RunSpec) -> Self {
        Self {
            id: Uuid::new_v4(),
            mode: spec.mode,
            status: RunStatus::Started,
            target: spec.target,
            labels: spec.labels,
            extra: spec.extra,
            notes: spec.notes,
            started_at: Utc::now(),
            completed_at: None,
            duration_ms: None,
            agent_id: spec.agent_id,
        }
    }
}

// ---------------------------------------------------------------------------
// AuditEntry
// ---------------------------------------------------------------------------

/// Immutable record of an action taken, stamped with a content hash of the
/// originating payload. `seq` is the insertion order assigned by the log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub action: String,
    #[serde(default)]
    pub targets: Vec<String>,
    pub mode: String,
    pub summary: String,
    #[serde(default)]
    pub run_ids: Vec<Uuid>,
    pub payload_hash: String,
}

/// An audit entry before the log has assigned its sequence number.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub targets: Vec<String>,
    pub mode: String,
    pub summary: String,
    pub run_ids: Vec<Uuid>,
    pub payload_hash: String,
}

// ---------------------------------------------------------------------------
// HistoryPacket
// ---------------------------------------------------------------------------

/// Immutable record of what was sent: an opaque payload under a
/// target/mode correlation key. The only core entity supporting deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryPacket {
    pub id: Uuid,
    pub target: String,
    pub mode: String,
    pub packet: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_task_starts_at_version_one() {
        let task = Task::new("bootstrap");
        assert_eq!(task.version, 1);
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.created_at, task.updated_at);
    }

    #[test]
    fn run_status_transition_table() {
        assert!(RunStatus::Started.can_transition_to(&RunStatus::Running));
        assert!(RunStatus::Running.can_transition_to(&RunStatus::Completed));
        assert!(RunStatus::Running.can_transition_to(&RunStatus::Failed));

        assert!(!RunStatus::Running.can_transition_to(&RunStatus::Started));
        assert!(!RunStatus::Started.can_transition_to(&RunStatus::Completed));
        assert!(!RunStatus::Completed.can_transition_to(&RunStatus::Running));
        assert!(!RunStatus::Failed.can_transition_to(&RunStatus::Running));
    }

    #[test]
    fn task_status_serializes_kebab_case() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");
    }

    #[test]
    fn new_run_is_started_without_completion() {
        let run = Run::new(RunSpec {
            mode: RunMode::Plan,
            target: TargetRef {
                repo: "acme/widgets".into(),
                branch: "main".into(),
                revision: "abc123".into(),
            },
            labels: vec![],
            extra: HashMap::new(),
            notes: None,
            agent_id: None,
        });
        assert_eq!(run.status, RunStatus::Started);
        assert!(run.completed_at.is_none());
        assert!(run.duration_ms.is_none());
    }
}
