//! Notifications shown in response to push messages.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::RwLock;

use shellcache_core::Notification;

/// A notification currently on display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShownNotification {
    pub id: u64,
    #[serde(flatten)]
    pub notification: Notification,
    pub shown_at: String,
}

/// Notifications kept on display when no capacity is given.
pub const DEFAULT_CAPACITY: usize = 100;

/// In-memory list of displayed notifications, oldest first.
///
/// Holds at most `capacity` entries; showing one more closes the oldest.
#[derive(Debug)]
pub struct NotificationCenter {
    next_id: AtomicU64,
    capacity: usize,
    shown: RwLock<Vec<ShownNotification>>,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A center that keeps at most `capacity` notifications (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        Self { next_id: AtomicU64::new(0), capacity: capacity.max(1), shown: RwLock::new(Vec::new()) }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Display a notification. Ids start at 1 and only increase.
    pub async fn show(&self, notification: Notification) -> ShownNotification {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let shown = ShownNotification { id, notification, shown_at: chrono::Utc::now().to_rfc3339() };
        tracing::info!(id, title = %shown.notification.title, "notification shown");

        let mut list = self.shown.write().await;
        list.push(shown.clone());
        if list.len() > self.capacity {
            let excess = list.len() - self.capacity;
            for dropped in list.drain(..excess) {
                tracing::debug!(id = dropped.id, "notification closed to make room");
            }
        }
        shown
    }

    pub async fn list(&self) -> Vec<ShownNotification> {
        self.shown.read().await.clone()
    }

    /// Close a notification and return the URL to open, if `id` is displayed.
    pub async fn click(&self, id: u64) -> Option<String> {
        let mut shown = self.shown.write().await;
        let index = shown.iter().position(|n| n.id == id)?;
        let closed = shown.remove(index);
        tracing::info!(id, url = %closed.notification.data, "notification clicked");
        Some(closed.notification.data)
    }
}
