use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use tiller_engine::engine::TaskMutation;

use super::state::ApiState;
use super::types::{CreateTaskRequest, ItemsResponse, TaskListQuery};
use crate::api_error::ApiError;

/// Quoted ETag for a task version, e.g. `"3"`.
fn etag(version: u64) -> String {
    format!("\"{version}\"")
}

/// Parse the caller's expected version out of `If-Match`.
fn expected_version(headers: &HeaderMap) -> Result<u64, ApiError> {
    let raw = headers
        .get(header::IF_MATCH)
        .ok_or_else(|| ApiError::BadRequest("missing If-Match header".into()))?
        .to_str()
        .map_err(|_| ApiError::BadRequest("malformed If-Match header".into()))?;
    raw.trim()
        .trim_matches('"')
        .parse::<u64>()
        .map_err(|_| ApiError::BadRequest("If-Match must carry a numeric version".into()))
}

/// POST /tasks -- create a task at version 1.
///
/// **Response:** 201 with the task body and an `ETag` carrying the version
/// the caller must present on its first update.
pub(crate) async fn create_task(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let task = state.engine.create_task(&req.title)?;
    Ok((
        StatusCode::CREATED,
        [(header::ETAG, etag(task.version))],
        Json(task),
    ))
}

/// PATCH /tasks/{id} -- optimistic-concurrency update.
///
/// `If-Match` carries the version the caller last observed. A stale version
/// fails with 409 and applies nothing; the caller re-reads and retries.
/// Success returns the task with its new version, also surfaced as `ETag`.
pub(crate) async fn update_task(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(mutation): Json<TaskMutation>,
) -> Result<impl IntoResponse, ApiError> {
    let expected = expected_version(&headers)?;
    let task = state.engine.update_task(id, expected, mutation)?;
    Ok((
        StatusCode::OK,
        [(header::ETAG, etag(task.version))],
        Json(task),
    ))
}

/// GET /tasks -- snapshot of all tasks ordered by creation time, optionally
/// filtered by status.
pub(crate) async fn list_tasks(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<TaskListQuery>,
) -> impl IntoResponse {
    Json(ItemsResponse {
        items: state.engine.list_tasks(query.status),
    })
}
