use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use tiller_core::types::RunSpec;

use super::state::ApiState;
use super::types::{ItemsResponse, TransitionRunRequest};
use crate::api_error::ApiError;

/// POST /runs -- create a run in `started` status.
pub(crate) async fn create_run(
    State(state): State<Arc<ApiState>>,
    Json(spec): Json<RunSpec>,
) -> Result<impl IntoResponse, ApiError> {
    let run = state.engine.create_run(spec)?;
    Ok((StatusCode::CREATED, Json(run)))
}

/// GET /runs -- snapshot of all runs ordered by start time.
pub(crate) async fn list_runs(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    Json(ItemsResponse {
        items: state.engine.list_runs(),
    })
}

/// POST /runs/{id}/status -- advance the run state machine.
///
/// **Response:** 200 with the updated run; 409 when the transition is not
/// in the allowed set (state unchanged); 404 for an unknown id.
pub(crate) async fn transition_run(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<TransitionRunRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let run = state.engine.transition_run(id, req.status)?;
    Ok(Json(run))
}
