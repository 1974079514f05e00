//! Fire-and-forget change notifications.
//!
//! Subscribers learn *which* keg changed and re-read the shared view; the
//! payload never travels with the event. Publishing without subscribers is a
//! silent no-op, and slow subscribers may miss events (lagged receivers).

use serde::Serialize;
use tokio::sync::broadcast;

// ---

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IntegrationEvent {
    /// Derived data or preferences of one keg changed.
    KegUpdated { keg_id: String },

    /// User-visible notification following an explicit user action.
    Notification(Notification),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct UpdatePublisher {
    sender: broadcast::Sender<IntegrationEvent>,
}

impl Default for UpdatePublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl UpdatePublisher {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<IntegrationEvent> {
        self.sender.subscribe()
    }

    pub fn keg_updated(&self, keg_id: &str) {
        self.send(IntegrationEvent::KegUpdated {
            keg_id: keg_id.to_string(),
        });
    }

    pub fn notify(&self, notification: Notification) {
        tracing::info!("{}: {}", notification.title, notification.message);
        self.send(IntegrationEvent::Notification(notification));
    }

    fn send(&self, event: IntegrationEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("No subscribers for integration event");
        }
    }
}
