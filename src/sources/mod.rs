//! Data acquisition for the keg pipeline.
//!
//! Sources never touch keg state: they fetch or receive raw records and hand
//! them to the coordinator. Failures stay inside the source that hit them.

use serde_json::Value;

use crate::coordinator::{CoordinatorError, CoordinatorHandle, Source};
use crate::models::RawKegRecord;
use crate::publisher::Notification;

mod discovery;
mod schedule;
mod stream;

pub use discovery::KegApiClient;
pub use schedule::{run_daily_reset, run_poll};
pub use stream::run_stream_listener;

// ---

/// Keg records carried by a payload: a bare array or `{"kegs": [...]}`.
///
/// Returns `None` for any other shape. Non-object elements are dropped.
pub fn extract_records(payload: &Value) -> Option<Vec<RawKegRecord>> {
    // ---
    let items = match payload {
        Value::Array(items) => items,
        Value::Object(obj) => obj.get("kegs")?.as_array()?,
        _ => return None,
    };

    Some(
        items
            .iter()
            .filter(|item| item.is_object())
            .cloned()
            .map(RawKegRecord)
            .collect(),
    )
}

/// Initial discovery at startup; an empty result is only logged.
pub async fn discover(client: &KegApiClient, handle: &CoordinatorHandle) -> Result<usize, CoordinatorError> {
    // ---
    let records = client.fetch_kegs().await;
    if records.is_empty() {
        tracing::warn!("No kegs found via REST API");
        return Ok(0);
    }
    handle.process(Source::Discovery, records).await
}

/// Manual refresh: fetch, reprocess everything, and notify the user.
pub async fn refresh_kegs(client: &KegApiClient, handle: &CoordinatorHandle) -> Result<usize, CoordinatorError> {
    // ---
    let records = client.fetch_kegs().await;
    let count = handle.process(Source::Refresh, records).await?;

    handle.publisher().notify(Notification {
        title: "Beer Keg Refresh".to_string(),
        message: format!("Refreshed {} kegs", count),
    });
    Ok(count)
}
