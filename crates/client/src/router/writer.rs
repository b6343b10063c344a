//! Background cache writes.
//!
//! A runtime-cache write starts after the response has been handed back,
//! so it must never hold the response up. The handles are kept so the
//! host can wait for outstanding writes before shutting down.
//!
//! Once closed, no new write starts. The closed flag is read and set under
//! the task lock, so a write either lands in the list that
//! [`PendingWrites::wait_until_idle`] drains or never starts.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use shellcache_core::{CacheStorage, Snapshot};

#[derive(Default)]
struct Tasks {
    handles: Vec<JoinHandle<()>>,
    closed: bool,
}

#[derive(Clone, Default)]
pub struct PendingWrites {
    tasks: Arc<Mutex<Tasks>>,
}

impl PendingWrites {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `snapshot` into `cache_name` in the background. Failures are
    /// logged and otherwise ignored. Does nothing once closed.
    pub async fn spawn(&self, storage: Arc<dyn CacheStorage>, cache_name: String, snapshot: Snapshot) {
        let mut tasks = self.tasks.lock().await;
        if tasks.closed {
            tracing::debug!(cache = %cache_name, url = %snapshot.url, "writes closed, dropping cache write");
            return;
        }

        let handle = tokio::spawn(async move {
            match storage.put(&cache_name, &snapshot).await {
                Ok(()) => tracing::debug!(cache = %cache_name, url = %snapshot.url, "cached runtime response"),
                Err(e) => tracing::debug!(cache = %cache_name, url = %snapshot.url, error = %e, "cache write failed"),
            }
        });

        tasks.handles.retain(|t| !t.is_finished());
        tasks.handles.push(handle);
    }

    /// Refuse every later [`PendingWrites::spawn`].
    pub async fn close(&self) {
        self.tasks.lock().await.closed = true;
    }

    pub async fn is_closed(&self) -> bool {
        self.tasks.lock().await.closed
    }

    /// Number of writes not yet finished.
    pub async fn pending(&self) -> usize {
        self.tasks.lock().await.handles.iter().filter(|t| !t.is_finished()).count()
    }

    /// Wait until every write spawned so far has settled.
    pub async fn wait_until_idle(&self) {
        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut self.tasks.lock().await.handles);
        for task in handles {
            if let Err(e) = task.await {
                tracing::debug!(error = %e, "cache write task did not complete");
            }
        }
    }
}

impl std::fmt::Debug for PendingWrites {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingWrites").finish_non_exhaustive()
    }
}
