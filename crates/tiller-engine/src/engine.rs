//! The task/run mutation service.
//!
//! Owns the canonical Task and Run tables. Updates go through a per-id
//! compare-and-swap on the version token: the DashMap entry guard is held
//! across the check-then-act, so two racing updates to one id serialize
//! while unrelated ids stay fully parallel. Every committed mutation
//! appends exactly one hash-stamped audit entry and publishes exactly one
//! domain event.

use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tiller_core::hash::{content_hash, hash_payload};
use tiller_core::types::{NewAuditEntry, Run, RunSpec, RunStatus, Task, TaskStatus};
use tracing::info;
use uuid::Uuid;

use crate::audit::AuditLog;
use crate::error::EngineError;
use crate::events::{DomainEvent, EventBus};
use std::sync::Arc;

/// Caller-supplied change set for [`StateEngine::update_task`]. At least one
/// field must be set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskMutation {
    pub title: Option<String>,
    pub status: Option<TaskStatus>,
}

pub struct StateEngine {
    tasks: DashMap<Uuid, Task>,
    runs: DashMap<Uuid, Run>,
    audit: Arc<AuditLog>,
    events: EventBus,
}

impl StateEngine {
    pub fn new(audit: Arc<AuditLog>, events: EventBus) -> Self {
        Self {
            tasks: DashMap::new(),
            runs: DashMap::new(),
            audit,
            events,
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    // -- Tasks --------------------------------------------------------------

    /// Create a task at version 1.
    pub fn create_task(&self, title: &str) -> Result<Task, EngineError> {
        if title.trim().is_empty() {
            return Err(EngineError::Validation("task title must be non-empty".into()));
        }
        let task = Task::new(title);
        self.tasks.insert(task.id, task.clone());

        self.audit.append(NewAuditEntry {
            timestamp: Utc::now(),
            action: "create-task".into(),
            targets: vec![task.id.to_string()],
            mode: "task".into(),
            summary: format!("created task \"{}\"", task.title),
            run_ids: vec![],
            payload_hash: content_hash(&json!({ "title": title })),
        })?;
        self.events.publish(DomainEvent::TaskCreated(task.clone()));
        info!(task_id = %task.id, "task created");
        Ok(task)
    }

    /// Apply a mutation if and only if the stored version matches
    /// `expected_version`.
    ///
    /// On a match the mutation is applied, the version incremented, and the
    /// new task returned (its `version` is the caller's next expected
    /// version). On a mismatch nothing is applied and the caller gets a
    /// [`EngineError::Conflict`] to resolve by re-reading.
    ///
    /// Audit and event emission happen after the per-task guard is released,
    /// so two back-to-back commits to the same task may publish out of
    /// version order. Each subscriber still sees events in publish order.
    pub fn update_task(
        &self,
        id: Uuid,
        expected_version: u64,
        mutation: TaskMutation,
    ) -> Result<Task, EngineError> {
        if mutation.title.is_none() && mutation.status.is_none() {
            return Err(EngineError::Validation("mutation must set at least one field".into()));
        }
        if let Some(ref title) = mutation.title {
            if title.trim().is_empty() {
                return Err(EngineError::Validation("task title must be non-empty".into()));
            }
        }
        // Hash outside the critical section; entry guards should only cover
        // the compare-and-swap itself.
        let payload_hash = hash_payload(&mutation)?;

        let snapshot = {
            let mut task = self
                .tasks
                .get_mut(&id)
                .ok_or_else(|| EngineError::NotFound(format!("task {id}")))?;
            if task.version != expected_version {
                return Err(EngineError::Conflict {
                    expected: expected_version,
                    stored: task.version,
                });
            }
            if let Some(title) = mutation.title {
                task.title = title;
            }
            if let Some(status) = mutation.status {
                task.status = status;
            }
            task.version += 1;
            task.updated_at = Utc::now();
            task.value().clone()
        };

        self.audit.append(NewAuditEntry {
            timestamp: Utc::now(),
            action: "update-task".into(),
            targets: vec![id.to_string()],
            mode: "task".into(),
            summary: format!("updated task \"{}\" to version {}", snapshot.title, snapshot.version),
            run_ids: vec![],
            payload_hash,
        })?;
        self.events.publish(DomainEvent::TaskUpdated(snapshot.clone()));
        info!(task_id = %id, version = snapshot.version, "task updated");
        Ok(snapshot)
    }

    /// Snapshot read of all tasks, ordered by creation time.
    pub fn list_tasks(&self, status: Option<TaskStatus>) -> Vec<Task> {
        let mut tasks: Vec<Task> = self
            .tasks
            .iter()
            .filter(|entry| status.is_none_or(|wanted| entry.status == wanted))
            .map(|entry| entry.value().clone())
            .collect();
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        tasks
    }

    pub fn get_task(&self, id: Uuid) -> Option<Task> {
        self.tasks.get(&id).map(|task| task.value().clone())
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    // -- Runs ---------------------------------------------------------------

    /// Create a run in `started` status.
    pub fn create_run(&self, spec: RunSpec) -> Result<Run, EngineError> {
        if spec.target.repo.trim().is_empty() {
            return Err(EngineError::Validation("run target repo must be non-empty".into()));
        }
        let payload_hash = hash_payload(&spec)?;
        let run = Run::new(spec);
        self.runs.insert(run.id, run.clone());

        self.audit.append(NewAuditEntry {
            timestamp: Utc::now(),
            action: "create-run".into(),
            targets: vec![run.target.repo.clone()],
            mode: run.mode.as_str().into(),
            summary: format!("started {} run against {}", run.mode.as_str(), run.target.repo),
            run_ids: vec![run.id],
            payload_hash,
        })?;
        self.events.publish(DomainEvent::RunCreated(run.clone()));
        info!(run_id = %run.id, mode = run.mode.as_str(), "run created");
        Ok(run)
    }

    /// Advance a run through the `started -> running -> {completed, failed}`
    /// state machine. An illegal transition leaves the run unchanged.
    ///
    /// A transition into a terminal status stamps `completed_at` and
    /// `duration_ms` together, exactly once.
    pub fn transition_run(&self, id: Uuid, new_status: RunStatus) -> Result<Run, EngineError> {
        let snapshot = {
            let mut run = self
                .runs
                .get_mut(&id)
                .ok_or_else(|| EngineError::NotFound(format!("run {id}")))?;
            if !run.status.can_transition_to(&new_status) {
                return Err(EngineError::InvalidTransition {
                    from: run.status,
                    to: new_status,
                });
            }
            run.status = new_status;
            if new_status.is_terminal() {
                let now = Utc::now();
                run.completed_at = Some(now);
                run.duration_ms = Some((now - run.started_at).num_milliseconds());
            }
            run.value().clone()
        };

        self.audit.append(NewAuditEntry {
            timestamp: Utc::now(),
            action: "transition-run".into(),
            targets: vec![snapshot.target.repo.clone()],
            mode: snapshot.mode.as_str().into(),
            summary: format!("run moved to {:?}", snapshot.status),
            run_ids: vec![id],
            payload_hash: content_hash(&json!({ "status": snapshot.status })),
        })?;
        self.events.publish(DomainEvent::RunTransitioned(snapshot.clone()));
        info!(run_id = %id, status = ?snapshot.status, "run transitioned");
        Ok(snapshot)
    }

    /// Snapshot read of all runs, ordered by start time.
    pub fn list_runs(&self) -> Vec<Run> {
        let mut runs: Vec<Run> = self.runs.iter().map(|entry| entry.value().clone()).collect();
        runs.sort_by(|a, b| a.started_at.cmp(&b.started_at).then(a.id.cmp(&b.id)));
        runs
    }

    pub fn get_run(&self, id: Uuid) -> Option<Run> {
        self.runs.get(&id).map(|run| run.value().clone())
    }

    pub fn run_count(&self) -> usize {
        self.runs.len()
    }
}
