//! Runtime keg options. Changes live until restart; the environment stays
//! the durable source.

use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use tracing::info;

use super::{ApiError, AppState};
use crate::config::{KegOptions, OptionsForm};

// ---

pub fn router() -> Router<AppState> {
    Router::new().route("/options", get(get_options).put(set_options))
}

async fn get_options(State(state): State<AppState>) -> Json<KegOptions> {
    Json(state.handle.view().await.options)
}

async fn set_options(
    State(state): State<AppState>,
    Json(form): Json<OptionsForm>,
) -> Result<Json<KegOptions>, ApiError> {
    // ---
    let options = KegOptions::from_form(form)?;
    info!("PUT /options");
    state.handle.set_options(options.clone()).await?;
    Ok(Json(options))
}
