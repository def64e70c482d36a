use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures_util::stream::{Stream, StreamExt};
use std::sync::Arc;
use tracing::debug;

use super::state::ApiState;

/// GET /events/tail -- live server-push stream of domain events.
///
/// Each subscriber gets its own bounded queue on the event bus; the
/// publisher never waits on this connection. Keep-alive comments are
/// emitted on the configured idle interval so proxies can tell a quiet
/// stream from a dead one. Client disconnect drops the subscription, which
/// the bus prunes on its next publish.
pub(crate) async fn tail_events(
    State(state): State<Arc<ApiState>>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let subscription = state.engine.events().subscribe();
    debug!(
        subscribers = state.engine.events().subscriber_count(),
        "event tail subscribed"
    );

    let stream = subscription
        .into_receiver()
        .into_stream()
        .map(|event| Event::default().json_data(event.as_ref()));

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(state.keep_alive)
            .text("keep-alive"),
    )
}
