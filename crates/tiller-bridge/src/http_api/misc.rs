use axum::{extract::State, response::IntoResponse, Json};
use std::sync::Arc;

use super::state::ApiState;
use super::types::StatusResponse;

/// GET /status -- process-level counters for dashboards and health probes.
pub(crate) async fn get_status(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        task_count: state.engine.task_count(),
        run_count: state.engine.run_count(),
        audit_entries: state.engine.audit().len(),
        history_packets: state.history.len(),
        event_subscribers: state.engine.events().subscriber_count(),
    })
}
