//! Install and activate steps of a worker.
//!
//! Install opens the worker's cache store and precaches the configured URLs
//! on a best-effort basis. Activate deletes every other cache store and
//! claims clients.

use serde::Serialize;

use shellcache_core::{Error, Request, WorkerState};

use crate::fetch::resolve;
use crate::worker::Worker;

/// Result of [`Worker::install`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub cache_name: String,
    /// Precache URLs stored.
    pub cached: Vec<String>,
    /// Precache URLs that could not be fetched, came back non-2xx, or may not be cached.
    pub failed: Vec<String>,
}

/// Result of [`Worker::activate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivateReport {
    pub cache_name: String,
    /// Stale cache stores deleted.
    pub deleted: Vec<String>,
}

impl Worker {
    /// Run the install step: `installing → installed`.
    ///
    /// A precache entry that fails is logged and skipped; install still
    /// completes. Only a storage failure opening the cache store aborts it,
    /// leaving the worker redundant.
    ///
    /// # Errors
    ///
    /// `Error::Lifecycle` if the worker is not installing, or the storage error.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        let current = self.state().await;
        if current != WorkerState::Installing {
            return Err(Error::Lifecycle { from: current, to: WorkerState::Installed });
        }

        let cache_name = self.cache_name();
        if let Err(e) = self.storage.open(&cache_name).await {
            self.mark_redundant().await;
            return Err(e);
        }

        let mut report = InstallReport { cache_name: cache_name.clone(), ..Default::default() };

        for path in &self.policy.precache_urls {
            match self.precache(&cache_name, path).await {
                Ok(()) => report.cached.push(path.clone()),
                Err(e) => {
                    tracing::warn!(cache = %cache_name, url = %path, error = %e, "precache failed");
                    report.failed.push(path.clone());
                }
            }
        }

        self.transition(WorkerState::Installed).await?;
        tracing::info!(
            cache = %cache_name,
            cached = report.cached.len(),
            failed = report.failed.len(),
            "worker installed"
        );

        Ok(report)
    }

    async fn precache(&self, cache_name: &str, path: &str) -> Result<(), Error> {
        let url = resolve(&self.origin, path).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let response = self.network.fetch(&Request::get(url)).await?;
        if !response.is_ok() {
            return Err(Error::Network(format!("status {}", response.status)));
        }
        let shared = response
            .shareable()
            .ok_or_else(|| Error::InvalidInput("response is marked private or no-store".into()))?;
        self.storage.put(cache_name, &shared).await
    }

    /// Run the activate step: `installed → activating → activated`.
    ///
    /// Deletes every cache store whose name differs from this worker's,
    /// then claims clients.
    ///
    /// # Errors
    ///
    /// `Error::Lifecycle` if the worker is not installed, or the storage error.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        self.transition(WorkerState::Activating).await?;

        let cache_name = self.cache_name();
        let mut deleted = Vec::new();
        for name in self.storage.keys().await? {
            if name != cache_name && self.storage.delete(&name).await? {
                tracing::info!(cache = %name, "deleted stale cache");
                deleted.push(name);
            }
        }

        self.transition(WorkerState::Activated).await?;
        self.claim_clients();

        Ok(ActivateReport { cache_name, deleted })
    }
}
