//! One versioned worker: its policy, router and lifecycle state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tokio::sync::RwLock;
use url::Url;

use shellcache_core::{CacheStorage, Error, PolicyConfig, WorkerState};

use crate::fetch::Network;
use crate::router::Router;

/// Point-in-time view of a worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerStatus {
    pub version: String,
    pub cache_name: String,
    pub state: WorkerState,
}

/// A worker for one cache version.
///
/// Created in `installing`; see [`Worker::install`] and [`Worker::activate`].
pub struct Worker {
    pub(crate) policy: Arc<PolicyConfig>,
    pub(crate) origin: Url,
    pub(crate) storage: Arc<dyn CacheStorage>,
    pub(crate) network: Arc<dyn Network>,
    router: Router,
    state: RwLock<WorkerState>,
    claimed: AtomicBool,
}

impl Worker {
    pub fn new(policy: PolicyConfig, origin: Url, storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>) -> Self {
        let policy = Arc::new(policy);
        let router = Router::new(policy.clone(), origin.clone(), storage.clone(), network.clone());
        Self {
            policy,
            origin,
            storage,
            network,
            router,
            state: RwLock::new(WorkerState::Installing),
            claimed: AtomicBool::new(false),
        }
    }

    pub fn version(&self) -> &str {
        &self.policy.cache_version
    }

    pub fn cache_name(&self) -> String {
        self.policy.cache_name()
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    pub async fn status(&self) -> WorkerStatus {
        WorkerStatus { version: self.version().to_string(), cache_name: self.cache_name(), state: self.state().await }
    }

    /// Whether this worker has taken control of open clients.
    pub fn clients_claimed(&self) -> bool {
        self.claimed.load(Ordering::SeqCst)
    }

    pub(crate) fn claim_clients(&self) {
        self.claimed.store(true, Ordering::SeqCst);
    }

    /// Move to `next`, failing if the transition is not allowed.
    pub(crate) async fn transition(&self, next: WorkerState) -> Result<(), Error> {
        let mut state = self.state.write().await;
        *state = state.transition(next)?;
        tracing::info!(version = %self.policy.cache_version, state = %next, "worker state changed");
        Ok(())
    }

    /// Retire this worker. Safe to call on a worker that is already redundant.
    pub async fn mark_redundant(&self) {
        let mut state = self.state.write().await;
        if *state != WorkerState::Redundant {
            *state = WorkerState::Redundant;
            tracing::info!(version = %self.policy.cache_version, "worker redundant");
        }
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("version", &self.policy.cache_version)
            .field("origin", &self.origin.as_str())
            .finish_non_exhaustive()
    }
}
