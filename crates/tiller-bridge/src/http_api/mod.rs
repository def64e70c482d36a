// ---------------------------------------------------------------------------
// HTTP API module directory
// ---------------------------------------------------------------------------
//
// Domain-oriented handler sub-modules wired together by the router below.
// Unsupported methods on any registered path fall through to axum's 405.

mod audit;
mod events;
mod history;
mod ingest;
mod misc;
mod runs;
pub mod state;
mod tasks;
pub mod types;

pub use state::ApiState;

use axum::{
    routing::{delete, get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Build the full API router.
pub fn api_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/status", get(misc::get_status))
        .route("/tasks", post(tasks::create_task))
        .route("/tasks", get(tasks::list_tasks))
        .route("/tasks/{id}", patch(tasks::update_task))
        .route("/runs", post(runs::create_run))
        .route("/runs", get(runs::list_runs))
        .route("/runs/{id}/status", post(runs::transition_run))
        .route("/audit", get(audit::list_audit))
        .route("/audit/ingest", post(ingest::ingest_logs))
        .route("/history", get(history::list_history))
        .route("/history", post(history::create_history))
        .route("/history", delete(history::delete_history))
        .route("/events/tail", get(events::tail_events))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::AllowOrigin::predicate(
                    |origin: &axum::http::HeaderValue, _| {
                        origin
                            .to_str()
                            .map(|origin| {
                                origin.starts_with("http://localhost")
                                    || origin.starts_with("http://127.0.0.1")
                            })
                            .unwrap_or(false)
                    },
                ))
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::PATCH,
                    axum::http::Method::DELETE,
                ])
                .allow_headers([
                    axum::http::header::CONTENT_TYPE,
                    axum::http::header::IF_MATCH,
                ]),
        )
        .with_state(state)
}
