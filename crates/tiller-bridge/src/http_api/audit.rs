use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

use tiller_engine::audit::AuditQuery;

use super::state::ApiState;
use super::types::{AuditListQuery, ItemsResponse};
use crate::api_error::ApiError;

fn parse_rfc3339(raw: &str, field: &str) -> Result<DateTime<Utc>, ApiError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ApiError::BadRequest(format!("`{field}` must be an RFC 3339 timestamp")))
}

/// GET /audit -- filtered audit trail, most-recent-first.
///
/// Supports `limit` (default 50), `mode` equality, and an inclusive
/// `from`/`to` time range.
pub(crate) async fn list_audit(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<AuditListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let from = query
        .from
        .as_deref()
        .map(|raw| parse_rfc3339(raw, "from"))
        .transpose()?;
    let to = query
        .to
        .as_deref()
        .map(|raw| parse_rfc3339(raw, "to"))
        .transpose()?;

    let items = state.engine.audit().query(&AuditQuery {
        limit: query.limit,
        mode: query.mode,
        from,
        to,
    });
    Ok(Json(ItemsResponse { items }))
}
