use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use tiller_engine::events::DomainEvent;

use super::state::ApiState;
use super::types::{HistoryDeleteQuery, HistoryListQuery, ItemsResponse};
use crate::api_error::ApiError;

/// GET /history -- packets most-recent-first, capped at `limit` (default 50).
pub(crate) async fn list_history(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<HistoryListQuery>,
) -> impl IntoResponse {
    Json(ItemsResponse {
        items: state.history.list(query.limit),
    })
}

/// POST /history -- store a packet with a server-assigned id and timestamp.
///
/// The body is validated by hand so that a missing or wrong-typed `target`
/// or `mode` is a 400, not a generic body-rejection. The `packet` payload
/// itself is opaque and stored as-is.
pub(crate) async fn create_history(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse, ApiError> {
    let target = body
        .get("target")
        .and_then(|value| value.as_str())
        .ok_or_else(|| ApiError::BadRequest("`target` must be a string".into()))?;
    let mode = body
        .get("mode")
        .and_then(|value| value.as_str())
        .ok_or_else(|| ApiError::BadRequest("`mode` must be a string".into()))?;
    let packet = body.get("packet").cloned().unwrap_or(serde_json::Value::Null);

    let stored = state.history.append(target, mode, packet)?;
    state.engine.events().publish(DomainEvent::HistoryAppended {
        id: stored.id,
        target: stored.target.clone(),
        mode: stored.mode.clone(),
        created_at: stored.created_at,
    });
    Ok((StatusCode::CREATED, Json(stored)))
}

/// DELETE /history?id= -- point deletion by id.
///
/// **Response:** `{"ok": bool}` reporting whether a packet was actually
/// removed; 400 when `id` is missing or not a UUID.
pub(crate) async fn delete_history(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<HistoryDeleteQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let raw = query
        .id
        .ok_or_else(|| ApiError::BadRequest("`id` query parameter is required".into()))?;
    let id = Uuid::parse_str(&raw)
        .map_err(|_| ApiError::BadRequest("`id` must be a UUID".into()))?;
    Ok(Json(json!({ "ok": state.history.delete(id) })))
}
