//! Server-sent event feed of integration events.
//!
//! Host-side subscribers receive `keg_updated` and `notification` events and
//! re-read `/kegs` or `/entities` as needed. Lagged subscribers skip events.
//! Every stream ends once the server begins shutting down.

use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures_util::{Stream, StreamExt};
use tokio::sync::{broadcast, watch};
use tokio_stream::wrappers::BroadcastStream;

use super::AppState;
use crate::publisher::IntegrationEvent;

// ---

pub fn router() -> Router<AppState> {
    Router::new().route("/events", get(events))
}

async fn events(State(state): State<AppState>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // ---
    tracing::debug!("GET /events - new subscriber");
    let stopping = shutdown_requested(state.shutdown.subscribe());
    let stream = to_sse(state.handle.subscribe()).take_until(stopping);
    Sse::new(stream).keep_alive(KeepAlive::new())
}

fn to_sse(rx: broadcast::Receiver<IntegrationEvent>) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(|msg| async move {
        let event = msg.ok()?;
        let name = match &event {
            IntegrationEvent::KegUpdated { .. } => "keg_updated",
            IntegrationEvent::Notification(_) => "notification",
        };
        let data = serde_json::to_string(&event).ok()?;
        Some(Ok(Event::default().event(name).data(data)))
    })
}

/// Resolves once the shutdown flag is set or its sender is gone.
async fn shutdown_requested(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stopping| *stopping).await;
}
