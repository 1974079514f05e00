//! User-invoked services and the exported history file.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::{error, info};

use super::{ApiError, AppState};
use crate::export;
use crate::sources;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/services/refresh_kegs", post(refresh_kegs))
        .route("/services/export_history", post(export_history))
        .route(export::EXPORT_URL, get(exported_history))
}

#[derive(Serialize)]
struct RefreshResponse {
    refreshed: usize,
}

#[derive(Serialize)]
struct ExportResponse {
    url: &'static str,
    entries: usize,
}

async fn refresh_kegs(State(state): State<AppState>) -> Result<Json<RefreshResponse>, ApiError> {
    // ---
    info!("POST /services/refresh_kegs");
    let refreshed = sources::refresh_kegs(&state.client, &state.handle).await?;
    Ok(Json(RefreshResponse { refreshed }))
}

async fn export_history(State(state): State<AppState>) -> Result<Json<ExportResponse>, ApiError> {
    // ---
    info!("POST /services/export_history");
    state.handle.export_history().await?;
    let entries = state.handle.view().await.history.len();
    Ok(Json(ExportResponse {
        url: export::EXPORT_URL,
        entries,
    }))
}

async fn exported_history(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    // ---
    match export::read_export(&state.static_dir).await {
        Ok(Some(body)) => Ok(([(header::CONTENT_TYPE, "application/json")], body)),
        Ok(None) => Err(ApiError::not_found("history has not been exported yet")),
        Err(e) => {
            error!("Failed to read history export: {:#}", e);
            Err(ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to read history export",
            ))
        }
    }
}
