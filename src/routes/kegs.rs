//! Keg read endpoints, per-keg configuration, and the pour history.

use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use tracing::debug;

use super::{ApiError, AppState};
use crate::models::{canonical_keg_id, KegDisplayRecord, PourHistoryEntry};
use crate::preferences::{KegConfig, KegConfigUpdate};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/kegs", get(list_kegs))
        .route("/kegs/{keg_id}", get(get_keg))
        .route("/kegs/{keg_id}/config", put(update_config))
        .route("/history", get(history))
}

async fn list_kegs(State(state): State<AppState>) -> Json<Vec<KegDisplayRecord>> {
    // ---
    let view = state.handle.view().await;
    debug!("GET /kegs - {} kegs", view.kegs.len());
    Json(view.kegs.into_values().collect())
}

async fn get_keg(
    Path(keg_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<KegDisplayRecord>, ApiError> {
    // ---
    let keg_id = canonical_keg_id(&keg_id);
    state
        .handle
        .display(&keg_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("unknown keg '{}'", keg_id)))
}

/// Apply a partial keg configuration; returns the stored configuration.
async fn update_config(
    Path(keg_id): Path<String>,
    State(state): State<AppState>,
    Json(update): Json<KegConfigUpdate>,
) -> Result<Json<KegConfig>, ApiError> {
    // ---
    let keg_id = canonical_keg_id(&keg_id);
    debug!("PUT /kegs/{}/config", keg_id);
    state.handle.update_keg_config(keg_id.clone(), update).await?;

    let view = state.handle.view().await;
    Ok(Json(view.preferences.keg(&keg_id).cloned().unwrap_or_default()))
}

/// Pour history, oldest first.
async fn history(State(state): State<AppState>) -> Json<Vec<PourHistoryEntry>> {
    Json(state.handle.view().await.history)
}
