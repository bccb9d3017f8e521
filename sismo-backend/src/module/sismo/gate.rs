///! Last-notified event marker
///!
///! One slot, in memory only. A restart starts from "nothing notified", so the
///! event that is newest at startup gets notified again.

use tokio::sync::Mutex;

use super::EventRecord;

#[derive(Debug, Default)]
pub struct NotificationGate {
    last_notified: Mutex<Option<String>>,
}

impl NotificationGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identifier of the last event a dispatch was attempted for.
    pub async fn current(&self) -> Option<String> {
        self.last_notified.lock().await.clone()
    }

    /// Whether `event` still needs a dispatch.
    pub async fn should_notify(&self, event: &EventRecord) -> bool {
        self.last_notified.lock().await.as_deref() != Some(event.id.as_str())
    }

    /// Move the marker to `next` only if it still holds `expected`.
    ///
    /// Returns `false` and leaves the marker untouched when another writer got
    /// there first.
    pub async fn compare_and_set(&self, expected: Option<&str>, next: &str) -> bool {
        let mut marker = self.last_notified.lock().await;
        if marker.as_deref() != expected {
            return false;
        }
        *marker = Some(next.to_string());
        true
    }
}
