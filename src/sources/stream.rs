//! WebSocket listener for live keg updates.

use std::time::Duration;

use anyhow::Result;
use futures_util::StreamExt;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use super::extract_records;
use crate::coordinator::{CoordinatorError, CoordinatorHandle, Source};
use crate::models::RawKegRecord;

// ---

/// Records carried by one text frame; `None` when there is nothing to apply.
pub fn parse_frame(text: &str) -> Option<Vec<RawKegRecord>> {
    // ---
    let payload: serde_json::Value = match serde_json::from_str(text) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::debug!("Ignoring malformed stream frame: {}", e);
            return None;
        }
    };
    extract_records(&payload).filter(|records| !records.is_empty())
}

/// Listen forever, reconnecting after `reconnect_delay` on error or close.
///
/// Returns only when the coordinator has stopped.
pub async fn run_stream_listener(url: String, handle: CoordinatorHandle, reconnect_delay: Duration) {
    // ---
    loop {
        match listen_once(&url, &handle).await {
            Ok(()) => tracing::info!("Keg stream {} closed", url),
            Err(e) => {
                if matches!(e.downcast_ref::<CoordinatorError>(), Some(CoordinatorError::Stopped)) {
                    tracing::debug!("Coordinator stopped, leaving stream listener");
                    return;
                }
                tracing::warn!("Keg stream error: {:#}", e);
            }
        }
        tokio::time::sleep(reconnect_delay).await;
    }
}

async fn listen_once(url: &str, handle: &CoordinatorHandle) -> Result<()> {
    // ---
    let (mut ws_stream, _) = connect_async(url).await?;
    tracing::info!("Connected to keg stream {}", url);

    while let Some(frame) = ws_stream.next().await {
        match frame? {
            Message::Text(text) => {
                if let Some(records) = parse_frame(&text) {
                    tracing::trace!("Stream frame with {} kegs", records.len());
                    handle.submit(Source::Stream, records).await?;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
    Ok(())
}
