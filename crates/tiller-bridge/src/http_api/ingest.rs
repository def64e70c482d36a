use axum::{
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

use tiller_core::hash::content_hash;
use tiller_core::types::NewAuditEntry;

use super::state::ApiState;
use super::types::IngestResponse;
use crate::api_error::ApiError;

/// Caller identity for rate limiting, from proxy headers: first
/// `X-Forwarded-For` entry, then `X-Real-IP`, then "unknown".
pub(crate) fn caller_identity(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| raw.split(',').next())
        .map(|ip| ip.trim().to_string())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|value| value.to_str().ok())
                .map(|ip| ip.to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

/// A single well-formed ingest entry: `id`, `timestamp` (RFC 3339), and
/// `type` all present and non-empty.
fn parse_entry(entry: &serde_json::Value) -> Option<(String, DateTime<Utc>, String)> {
    let id = entry.get("id")?.as_str()?.trim();
    let entry_type = entry.get("type")?.as_str()?.trim();
    let timestamp = DateTime::parse_from_rfc3339(entry.get("timestamp")?.as_str()?)
        .ok()?
        .with_timezone(&Utc);
    if id.is_empty() || entry_type.is_empty() {
        return None;
    }
    Some((id.to_string(), timestamp, entry_type.to_string()))
}

/// POST /audit/ingest -- rate-limited batch ingestion of external logs.
///
/// Each well-formed entry becomes one audit entry (action = the entry's
/// `type`, mode `ingest`, hash-stamped with the full entry payload).
/// Malformed entries are skipped, not fatal to the batch. Entries flagged
/// `"security": true` are additionally routed to the alert sink.
pub(crate) async fn ingest_logs(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse, ApiError> {
    let identity = caller_identity(&headers);
    if !state.limiter.admit(&identity) {
        return Err(ApiError::TooManyRequests {
            retry_after_secs: state.limiter.retry_after(&identity).as_secs(),
        });
    }

    let logs = body
        .get("logs")
        .and_then(|value| value.as_array())
        .ok_or_else(|| ApiError::BadRequest("`logs` must be an array".into()))?;

    let mut accepted = 0;
    let mut skipped = 0;
    for entry in logs {
        let Some((id, timestamp, entry_type)) = parse_entry(entry) else {
            skipped += 1;
            continue;
        };

        if entry.get("security").and_then(|value| value.as_bool()) == Some(true) {
            state.alerts.alert(&id, &entry_type, entry);
        }

        let summary = entry
            .get("message")
            .and_then(|value| value.as_str())
            .unwrap_or_default()
            .to_string();
        state.engine.audit().append(NewAuditEntry {
            timestamp,
            action: entry_type,
            targets: vec![id],
            mode: "ingest".into(),
            summary,
            run_ids: vec![],
            payload_hash: content_hash(entry),
        })?;
        accepted += 1;
    }

    debug!(identity, accepted, skipped, "ingested log batch");
    Ok(Json(IngestResponse { accepted, skipped }))
}
