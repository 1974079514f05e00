// src/routes/health.rs
//! Liveness endpoint for the keg bridge.
//!
//! `GET /health` answers as long as the HTTP server runs. It does not touch
//! the database, the keg device, or the coordinator, so it stays green while
//! the stream reconnects.
//!
//! EMBP: the handler is internal; the gateway (`mod.rs`) merges the exported
//! subrouter.

use axum::{routing::get, Json, Router};
use serde::Serialize;

/// JSON response body for the `/health` endpoint.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Subrouter with the `/health` route, generic over the gateway state.
pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/health", get(health))
}
