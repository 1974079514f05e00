//! Entity catalogue as seen by the home-automation host.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use super::AppState;
use crate::entities::{catalogue, EntityState};

// ---

pub fn router() -> Router<AppState> {
    Router::new().route("/entities", get(list_entities))
}

#[derive(Debug, Deserialize)]
struct EntityQuery {
    /// Restrict the result to one keg's entities.
    keg_id: Option<String>,
}

async fn list_entities(
    Query(params): Query<EntityQuery>,
    State(state): State<AppState>,
) -> Json<Vec<EntityState>> {
    // ---
    let view = state.handle.view().await;
    let instance = state.handle.instance_id().simple().to_string();

    let mut entities = catalogue(&instance, &view);
    if let Some(keg_id) = params.keg_id.as_deref() {
        entities.retain(|e| e.keg_id.as_deref() == Some(keg_id));
    }
    Json(entities)
}
