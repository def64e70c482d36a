use std::sync::Arc;
use std::time::{Duration, Instant};

use tiller_core::config::Config;
use tiller_engine::alerts::{AlertSink, TracingAlertSink};
use tiller_engine::audit::AuditLog;
use tiller_engine::engine::StateEngine;
use tiller_engine::events::EventBus;
use tiller_engine::history::HistoryStore;
use tiller_engine::rate_limit::{FixedWindowLimiter, RateLimitConfig};

/// Shared application state for all HTTP handlers.
///
/// Constructed once at process start and torn down at shutdown; nothing in
/// here is a hidden static.
pub struct ApiState {
    pub engine: StateEngine,
    pub history: Arc<HistoryStore>,
    pub limiter: FixedWindowLimiter,
    pub alerts: Arc<dyn AlertSink>,
    pub keep_alive: Duration,
    pub start_time: Instant,
}

impl ApiState {
    pub fn new(config: &Config) -> Self {
        Self::with_alert_sink(config, Arc::new(TracingAlertSink))
    }

    /// Inject a custom alert sink (any notification backend satisfies the
    /// ingestion alert contract).
    pub fn with_alert_sink(config: &Config, alerts: Arc<dyn AlertSink>) -> Self {
        let audit = Arc::new(AuditLog::new(config.retention.audit_max_entries));
        let events = EventBus::new(config.events.queue_capacity);
        Self {
            engine: StateEngine::new(audit, events),
            history: Arc::new(HistoryStore::new(config.retention.history_max_entries)),
            limiter: FixedWindowLimiter::new(RateLimitConfig {
                window: Duration::from_secs(config.limits.window_secs),
                max_requests: config.limits.max_requests,
            }),
            alerts,
            keep_alive: Duration::from_secs(config.events.keep_alive_secs),
            start_time: Instant::now(),
        }
    }
}
