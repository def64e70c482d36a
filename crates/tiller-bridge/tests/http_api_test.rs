use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Value};
use tiller_bridge::http_api::{api_router, ApiState};
use tiller_core::config::Config;
use tiller_engine::alerts::AlertSink;

/// Spin up an API server on a random port, return the base URL and state.
async fn start_test_server_with(config: Config, state_override: Option<Arc<ApiState>>) -> (String, Arc<ApiState>) {
    let state = state_override.unwrap_or_else(|| Arc::new(ApiState::new(&config)));
    let router = api_router(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind to ephemeral port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (format!("http://{addr}"), state)
}

async fn start_test_server() -> (String, Arc<ApiState>) {
    start_test_server_with(Config::default(), None).await
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_task_returns_201_with_etag() {
    let (base, _state) = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/tasks"))
        .json(&json!({"title": "T1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    assert_eq!(resp.headers().get("etag").unwrap(), "\"1\"");

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["title"], "T1");
    assert_eq!(body["status"], "pending");
    assert_eq!(body["version"], 1);
    assert!(body["id"].is_string());
}

#[tokio::test]
async fn empty_title_is_rejected() {
    let (base, _state) = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/tasks"))
        .json(&json!({"title": "  "}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn update_with_fresh_version_succeeds_and_stale_conflicts() {
    let (base, state) = start_test_server().await;
    let client = reqwest::Client::new();

    let created: Value = client
        .post(format!("{base}/tasks"))
        .json(&json!({"title": "T1"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = created["id"].as_str().unwrap().to_string();

    // Fresh version: applied, version bumped, new ETag.
    let resp = client
        .patch(format!("{base}/tasks/{id}"))
        .header("If-Match", "\"1\"")
        .json(&json!({"status": "in-progress"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers().get("etag").unwrap(), "\"2\"");
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["version"], 2);
    assert_eq!(updated["status"], "in-progress");

    // Stale version: 409, nothing applied.
    let resp = client
        .patch(format!("{base}/tasks/{id}"))
        .header("If-Match", "1")
        .json(&json!({"status": "done"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    let tasks: Value = client
        .get(format!("{base}/tasks"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(tasks["items"][0]["version"], 2);
    assert_eq!(tasks["items"][0]["status"], "in-progress");

    // One audit entry per successful mutation: create + one update.
    assert_eq!(state.engine.audit().len(), 2);
}

#[tokio::test]
async fn update_without_if_match_is_400_and_unknown_id_404() {
    let (base, _state) = start_test_server().await;
    let client = reqwest::Client::new();

    let created: Value = client
        .post(format!("{base}/tasks"))
        .json(&json!({"title": "T1"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = created["id"].as_str().unwrap();

    let resp = client
        .patch(format!("{base}/tasks/{id}"))
        .json(&json!({"status": "done"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = client
        .patch(format!(
            "{base}/tasks/00000000-0000-0000-0000-000000000000"
        ))
        .header("If-Match", "\"1\"")
        .json(&json!({"status": "done"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn unsupported_method_is_405() {
    let (base, _state) = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .put(format!("{base}/tasks"))
        .json(&json!({"title": "nope"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 405);

    let resp = client
        .post(format!("{base}/events/tail"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 405);
}

// ---------------------------------------------------------------------------
// Runs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn run_creation_and_transitions() {
    let (base, _state) = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/runs"))
        .json(&json!({
            "mode": "plan",
            "target": {"repo": "acme/widgets", "branch": "main", "revision": "abc123"},
            "labels": ["nightly"]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let run: Value = resp.json().await.unwrap();
    assert_eq!(run["status"], "started");
    let id = run["id"].as_str().unwrap().to_string();

    let resp = client
        .post(format!("{base}/runs/{id}/status"))
        .json(&json!({"status": "running"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // Revisiting `started` is illegal.
    let resp = client
        .post(format!("{base}/runs/{id}/status"))
        .json(&json!({"status": "started"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    let resp = client
        .post(format!("{base}/runs/{id}/status"))
        .json(&json!({"status": "completed"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let done: Value = resp.json().await.unwrap();
    assert!(done["completed_at"].is_string());
    assert!(done["duration_ms"].is_number());
}

// ---------------------------------------------------------------------------
// Audit
// ---------------------------------------------------------------------------

#[tokio::test]
async fn audit_query_filters_by_mode() {
    let (base, state) = start_test_server().await;
    let client = reqwest::Client::new();

    // Task mutations write mode "task"; run mutations write the run mode.
    let created: Value = client
        .post(format!("{base}/tasks"))
        .json(&json!({"title": "T1"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = created["id"].as_str().unwrap();
    client
        .patch(format!("{base}/tasks/{id}"))
        .header("If-Match", "\"1\"")
        .json(&json!({"status": "done"}))
        .send()
        .await
        .unwrap();
    client
        .post(format!("{base}/runs"))
        .json(&json!({
            "mode": "critic",
            "target": {"repo": "acme/widgets", "branch": "main", "revision": "abc123"}
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(state.engine.audit().len(), 3);

    let body: Value = client
        .get(format!("{base}/audit?limit=2&mode=task"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["action"], "update-task");
    assert_eq!(items[1]["action"], "create-task");
    assert_eq!(items[0]["payload_hash"].as_str().unwrap().len(), 64);
}

#[tokio::test]
async fn audit_rejects_bad_time_bounds() {
    let (base, _state) = start_test_server().await;
    let resp = reqwest::get(format!("{base}/audit?from=yesterday"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

#[tokio::test]
async fn history_append_list_delete_roundtrip() {
    let (base, _state) = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/history"))
        .json(&json!({
            "target": "acme/widgets#12",
            "mode": "plan",
            "packet": {"body": "proposal"}
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let packet: Value = resp.json().await.unwrap();
    let id = packet["id"].as_str().unwrap().to_string();
    assert_eq!(packet["packet"]["body"], "proposal");

    let listed: Value = client
        .get(format!("{base}/history?limit=10"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed["items"].as_array().unwrap().len(), 1);

    let first: Value = client
        .delete(format!("{base}/history?id={id}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(first["ok"], true);

    let second: Value = client
        .delete(format!("{base}/history?id={id}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(second["ok"], false);
}

#[tokio::test]
async fn history_validates_body_and_delete_id() {
    let (base, _state) = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/history"))
        .json(&json!({"target": 42, "mode": "plan"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = client
        .post(format!("{base}/history"))
        .json(&json!({"target": "acme/widgets#12"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = client
        .delete(format!("{base}/history"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

// ---------------------------------------------------------------------------
// Ingest
// ---------------------------------------------------------------------------

#[derive(Default)]
struct RecordingSink {
    seen: Mutex<Vec<String>>,
}

impl AlertSink for RecordingSink {
    fn alert(&self, entry_id: &str, _entry_type: &str, _detail: &Value) {
        self.seen.lock().unwrap().push(entry_id.to_string());
    }
}

#[tokio::test]
async fn ingest_skips_malformed_entries_and_alerts_on_security() {
    let sink = Arc::new(RecordingSink::default());
    let state = Arc::new(ApiState::with_alert_sink(&Config::default(), sink.clone()));
    let (base, state) = start_test_server_with(Config::default(), Some(state)).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/audit/ingest"))
        .json(&json!({
            "logs": [
                {"id": "log-1", "timestamp": "2026-08-30T10:00:00Z", "type": "login", "message": "ok"},
                {"id": "log-2", "timestamp": "2026-08-30T10:00:01Z", "type": "privilege-change", "security": true},
                {"id": "log-3", "type": "missing-timestamp"},
                {"timestamp": "2026-08-30T10:00:02Z", "type": "missing-id"}
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["accepted"], 2);
    assert_eq!(body["skipped"], 2);

    assert_eq!(state.engine.audit().len(), 2);
    assert_eq!(sink.seen.lock().unwrap().as_slice(), ["log-2"]);
}

#[tokio::test]
async fn ingest_rejects_non_array_logs() {
    let (base, _state) = start_test_server().await;
    let resp = reqwest::Client::new()
        .post(format!("{base}/audit/ingest"))
        .json(&json!({"logs": "not-a-list"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn ingest_is_rate_limited_per_identity() {
    let mut config = Config::default();
    config.limits.max_requests = 2;
    let (base, _state) = start_test_server_with(config, None).await;
    let client = reqwest::Client::new();

    for _ in 0..2 {
        let resp = client
            .post(format!("{base}/audit/ingest"))
            .header("x-forwarded-for", "10.0.0.7")
            .json(&json!({"logs": []}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
    }

    let resp = client
        .post(format!("{base}/audit/ingest"))
        .header("x-forwarded-for", "10.0.0.7")
        .json(&json!({"logs": []}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 429);
    assert!(resp.headers().contains_key("retry-after"));

    // A different identity still has its own window.
    let resp = client
        .post(format!("{base}/audit/ingest"))
        .header("x-forwarded-for", "10.0.0.8")
        .json(&json!({"logs": []}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

// ---------------------------------------------------------------------------
// Event tail
// ---------------------------------------------------------------------------

#[tokio::test]
async fn event_tail_streams_published_events() {
    let (base, _state) = start_test_server().await;
    let client = reqwest::Client::new();

    let mut tail = client
        .get(format!("{base}/events/tail"))
        .send()
        .await
        .unwrap();
    assert_eq!(tail.status(), 200);
    assert!(tail
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));

    client
        .post(format!("{base}/tasks"))
        .json(&json!({"title": "streamed"}))
        .send()
        .await
        .unwrap();

    let mut received = String::new();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !received.contains("task_created") {
        let chunk = tokio::time::timeout_at(deadline, tail.chunk())
            .await
            .expect("event not received in time")
            .unwrap()
            .expect("stream ended early");
        received.push_str(&String::from_utf8_lossy(&chunk));
    }
    assert!(received.contains("streamed"));
}
