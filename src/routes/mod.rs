//! HTTP gateway for the keg bridge.
//!
//! Each sibling module owns its handlers and exports a subrouter; this
//! gateway merges them and attaches the shared [`AppState`] (EMBP).

use std::{path::PathBuf, sync::Arc};

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json, Router};
use serde_json::json;
use tokio::sync::watch;

use crate::config::ConfigError;
use crate::coordinator::{CoordinatorError, CoordinatorHandle};
use crate::preferences::PreferenceError;
use crate::sources::KegApiClient;

mod entities;
mod events;
mod health;
mod kegs;
mod options;
mod preferences;
mod services;

// ---

#[derive(Clone)]
pub struct AppState {
    pub handle: CoordinatorHandle,
    pub client: KegApiClient,
    pub static_dir: PathBuf,
    /// Flipped to `true` when the server starts draining; ends open event streams.
    pub shutdown: Arc<watch::Sender<bool>>,
}

impl AppState {
    pub fn new(handle: CoordinatorHandle, client: KegApiClient, static_dir: PathBuf) -> Self {
        Self {
            handle,
            client,
            static_dir,
            shutdown: Arc::new(watch::channel(false).0),
        }
    }

    /// Signal long-lived responses to finish so graceful shutdown can complete.
    pub fn begin_shutdown(&self) {
        self.shutdown.send_replace(true);
    }
}

pub fn router(state: AppState) -> Router {
    // ---
    Router::new()
        .merge(kegs::router())
        .merge(entities::router())
        .merge(services::router())
        .merge(preferences::router())
        .merge(options::router())
        .merge(events::router())
        .merge(health::router())
        .with_state(state)
}

/// Error body shared by all handlers: `{"error": "..."}`.
#[derive(Debug)]
pub(crate) struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub(crate) fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub(crate) fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<CoordinatorError> for ApiError {
    fn from(e: CoordinatorError) -> Self {
        // ---
        let status = match &e {
            CoordinatorError::Stopped => StatusCode::SERVICE_UNAVAILABLE,
            CoordinatorError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CoordinatorError::Preference(PreferenceError::UnknownKeg(_)) => StatusCode::NOT_FOUND,
            CoordinatorError::Preference(_) => StatusCode::UNPROCESSABLE_ENTITY,
        };
        if status.is_server_error() {
            tracing::error!("Request failed: {}", e);
        }
        Self::new(status, e.to_string())
    }
}

impl From<ConfigError> for ApiError {
    fn from(e: ConfigError) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::config::KegOptions;
    use crate::coordinator::KegCoordinator;
    use crate::store::MemoryStore;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    pub(crate) async fn create_test_app() -> (Router, CoordinatorHandle, tempfile::TempDir) {
        // ---
        let (state, dir) = create_test_state().await;
        let handle = state.handle.clone();
        (router(state), handle, dir)
    }

    pub(crate) async fn create_test_state() -> (AppState, tempfile::TempDir) {
        // ---
        let dir = tempfile::tempdir().unwrap();
        let coordinator = KegCoordinator::load(
            Arc::new(MemoryStore::new()),
            KegOptions::default(),
            500,
            dir.path().to_path_buf(),
        )
        .await;
        let (handle, _task) = coordinator.spawn();

        // Nothing listens here; refresh simply finds no kegs.
        let client = KegApiClient::new("http://127.0.0.1:9").unwrap();
        let state = AppState::new(handle, client, dir.path().to_path_buf());
        (state, dir)
    }

    pub(crate) async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        // ---
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_health_through_gateway() {
        // ---
        let (app, _handle, _dir) = create_test_app().await;
        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[test]
    fn test_error_status_mapping() {
        // ---
        assert_eq!(
            ApiError::from(CoordinatorError::Stopped).status,
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::from(CoordinatorError::Preference(PreferenceError::UnknownKeg("x".into()))).status,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(ConfigError::InvalidPerKegMap("bad".into())).status,
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
