//! Display-unit and device selects.

use axum::{
    extract::State,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use tracing::debug;

use super::{ApiError, AppState};
use crate::preferences::{Preferences, UnitKind};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/preferences", get(get_preferences))
        .route("/preferences/display_units", put(set_display_unit))
        .route("/select/keg_device", put(select_device))
}

#[derive(Debug, Deserialize)]
struct UnitSelection {
    kind: UnitKind,
    option: String,
}

#[derive(Debug, Deserialize)]
struct DeviceSelection {
    option: String,
}

async fn get_preferences(State(state): State<AppState>) -> Json<Preferences> {
    Json(state.handle.view().await.preferences)
}

async fn set_display_unit(
    State(state): State<AppState>,
    Json(selection): Json<UnitSelection>,
) -> Result<Json<Preferences>, ApiError> {
    // ---
    debug!("PUT /preferences/display_units {:?}", selection);
    state
        .handle
        .set_display_unit(selection.kind, selection.option)
        .await?;
    Ok(Json(state.handle.view().await.preferences))
}

async fn select_device(
    State(state): State<AppState>,
    Json(selection): Json<DeviceSelection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    // ---
    debug!("PUT /select/keg_device {}", selection.option);
    state.handle.select_device(selection.option.clone()).await?;
    Ok(Json(serde_json::json!({ "selected": selection.option })))
}

#[cfg(test)]
mod tests {
    // ---
    use super::super::tests::{create_test_app, send};
    use crate::coordinator::Source;
    use crate::models::RawKegRecord;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_display_unit_selection() {
        // ---
        let (app, _handle, _dir) = create_test_app().await;

        let (status, body) = send(
            &app,
            "PUT",
            "/preferences/display_units",
            Some(json!({"kind": "weight", "option": "lb"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["display_units"]["weight"], "lb");

        let (status, _) = send(
            &app,
            "PUT",
            "/preferences/display_units",
            Some(json!({"kind": "pour", "option": "pints"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (_, body) = send(&app, "GET", "/preferences", None).await;
        assert_eq!(body["display_units"]["pour"], "oz");
    }

    #[tokio::test]
    async fn test_device_selection() {
        // ---
        let (app, handle, _dir) = create_test_app().await;
        handle
            .process(Source::Stream, vec![RawKegRecord(json!({"id": "left", "weight": 10.0}))])
            .await
            .unwrap();

        let (status, _) = send(&app, "PUT", "/select/keg_device", Some(json!({"option": "left"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(handle.view().await.selected_device.as_deref(), Some("left"));

        let (status, _) = send(&app, "PUT", "/select/keg_device", Some(json!({"option": "ghost"}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
