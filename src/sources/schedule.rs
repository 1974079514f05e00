//! Timers: periodic REST poll and the daily consumption reset.

use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::KegApiClient;
use crate::coordinator::{CoordinatorHandle, Source};

// ---

fn ticker(period: Duration) -> tokio::time::Interval {
    // ---
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// Re-fetch the keg list every `period`; empty results change nothing.
pub async fn run_poll(client: KegApiClient, handle: CoordinatorHandle, period: Duration) {
    // ---
    let mut ticker = ticker(period);
    loop {
        ticker.tick().await;

        let records = client.fetch_kegs().await;
        if records.is_empty() {
            tracing::trace!("Poll returned no kegs");
            continue;
        }
        if handle.submit(Source::Poll, records).await.is_err() {
            tracing::debug!("Coordinator stopped, leaving poll loop");
            return;
        }
    }
}

/// Zero every keg's daily consumption every `period`.
pub async fn run_daily_reset(handle: CoordinatorHandle, period: Duration) {
    // ---
    let mut ticker = ticker(period);
    loop {
        ticker.tick().await;
        tracing::info!("Resetting daily consumption");
        if handle.daily_reset().await.is_err() {
            tracing::debug!("Coordinator stopped, leaving reset loop");
            return;
        }
    }
}
