//! Registration: the active worker, at most one waiting worker, and the
//! entry points for fetches, control messages and push messages.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use url::Url;

use shellcache_core::{
    AppConfig, CacheStorage, ControlMessage, Error, Notification, NotificationDefaults, PolicyConfig, PushPayload,
    Request, WorkerState,
};

use crate::fetch::{Network, canonicalize_origin, resolve};
use crate::lifecycle::{ActivateReport, InstallReport};
use crate::notify::{NotificationCenter, ShownNotification};
use crate::router::{Outcome, Source};
use crate::worker::{Worker, WorkerStatus};

/// Settings shared by every worker of a registration.
#[derive(Debug, Clone)]
pub struct RegistrationConfig {
    /// Policy of the first worker. Later versions reuse it with a new `cache_version`.
    pub policy: PolicyConfig,
    pub origin: Url,
    /// Activate a freshly installed worker without waiting for `SKIP_WAITING`.
    pub skip_waiting_on_install: bool,
    pub notifications: NotificationDefaults,
    /// Notifications kept on display before the oldest is closed.
    pub max_notifications: usize,
}

impl RegistrationConfig {
    /// Build from the application configuration.
    ///
    /// # Errors
    ///
    /// `Error::InvalidUrl` if the configured origin cannot be parsed.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = canonicalize_origin(&config.origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self {
            policy: config.policy(),
            origin,
            skip_waiting_on_install: config.skip_waiting_on_install,
            notifications: config.notification_defaults(),
            max_notifications: config.max_notifications,
        })
    }
}

/// Result of [`Registration::install_version`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallOutcome {
    pub version: String,
    pub install: InstallReport,
    /// Present when the new worker became active right away.
    pub activate: Option<ActivateReport>,
}

/// Result of handling a control message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MessageOutcome {
    /// A waiting worker was promoted.
    Activated { version: String, deleted: Vec<String> },
    /// `SKIP_WAITING` with no waiting worker.
    NothingWaiting,
    /// Every cache store was deleted.
    Cleared { deleted: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationStatus {
    pub active: Option<WorkerStatus>,
    pub waiting: Option<WorkerStatus>,
    pub caches: Vec<String>,
}

#[derive(Default)]
struct Slots {
    active: Option<Arc<Worker>>,
    waiting: Option<Arc<Worker>>,
}

pub struct Registration {
    config: RegistrationConfig,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    slots: RwLock<Slots>,
    notifications: NotificationCenter,
}

impl Registration {
    /// A registration with no workers. See [`Registration::register`].
    pub fn new(config: RegistrationConfig, storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>) -> Self {
        let notifications = NotificationCenter::with_capacity(config.max_notifications);
        Self { config, storage, network, slots: RwLock::new(Slots::default()), notifications }
    }

    /// Create a registration and install its first worker, which becomes active.
    ///
    /// # Errors
    ///
    /// The storage error if the first worker cannot open its cache store.
    pub async fn register(
        config: RegistrationConfig, storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>,
    ) -> Result<Self, Error> {
        let version = config.policy.cache_version.clone();
        let registration = Self::new(config, storage, network);
        registration.install_version(&version).await?;
        Ok(registration)
    }

    pub fn config(&self) -> &RegistrationConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.storage
    }

    /// Install a worker for `version`.
    ///
    /// The worker is activated at once when `skip_waiting_on_install` is set
    /// or nothing is active yet; otherwise it waits for `SKIP_WAITING`,
    /// replacing any worker already waiting.
    ///
    /// # Errors
    ///
    /// `Error::InvalidInput` for an empty version, or the install error.
    pub async fn install_version(&self, version: &str) -> Result<InstallOutcome, Error> {
        let version = version.trim();
        if version.is_empty() {
            return Err(Error::InvalidInput("version must not be empty".into()));
        }

        let policy = self.config.policy.with_version(version);
        let worker = Arc::new(Worker::new(
            policy,
            self.config.origin.clone(),
            self.storage.clone(),
            self.network.clone(),
        ));
        let install = worker.install().await?;

        let mut slots = self.slots.write().await;
        if let Some(previous) = slots.waiting.take() {
            previous.mark_redundant().await;
        }

        let activate = if self.config.skip_waiting_on_install || slots.active.is_none() {
            Some(Self::promote(&mut slots, worker).await?)
        } else {
            tracing::info!(version, "worker waiting");
            slots.waiting = Some(worker);
            None
        };

        Ok(InstallOutcome { version: version.to_string(), install, activate })
    }

    /// Activate `worker` and make it the active worker.
    async fn promote(slots: &mut Slots, worker: Arc<Worker>) -> Result<ActivateReport, Error> {
        // Any write from the outgoing worker that lands after activate would recreate its store.
        if let Some(current) = &slots.active {
            current.router().close_writes().await;
            current.router().wait_until_idle().await;
        }

        let report = match worker.activate().await {
            Ok(report) => report,
            Err(e) => {
                worker.mark_redundant().await;
                return Err(e);
            }
        };

        if let Some(previous) = slots.active.replace(worker) {
            previous.mark_redundant().await;
        }
        Ok(report)
    }

    /// Route a request through the active worker.
    ///
    /// Without an activated worker the request goes straight to the network
    /// and the outcome carries no strategy.
    ///
    /// # Errors
    ///
    /// The router or network error.
    pub async fn fetch(&self, request: &Request) -> Result<Outcome, Error> {
        let active = self.slots.read().await.active.clone();
        if let Some(worker) = active
            && worker.state().await.handles_fetches()
        {
            return worker.router().handle(request).await;
        }

        tracing::debug!(url = %request.url, "no active worker, fetching directly");
        let response = self.network.fetch(request).await?;
        Ok(Outcome { strategy: None, source: Source::Network, response })
    }

    /// Handle a control message posted by the application.
    ///
    /// # Errors
    ///
    /// The storage or activate error.
    pub async fn message(&self, message: ControlMessage) -> Result<MessageOutcome, Error> {
        tracing::info!(?message, "control message");
        let mut slots = self.slots.write().await;

        match message {
            ControlMessage::SkipWaiting => match slots.waiting.take() {
                Some(worker) => {
                    let version = worker.version().to_string();
                    let report = Self::promote(&mut slots, worker).await?;
                    Ok(MessageOutcome::Activated { version, deleted: report.deleted })
                }
                None => Ok(MessageOutcome::NothingWaiting),
            },
            ControlMessage::ClearCache => {
                if let Some(active) = &slots.active {
                    active.router().wait_until_idle().await;
                }
                let mut deleted = Vec::new();
                for name in self.storage.keys().await? {
                    if self.storage.delete(&name).await? {
                        deleted.push(name);
                    }
                }
                tracing::info!(count = deleted.len(), "cleared all caches");
                Ok(MessageOutcome::Cleared { deleted })
            }
        }
    }

    /// Decode a push message and show its notification.
    ///
    /// # Errors
    ///
    /// `Error::InvalidInput` if the payload is not valid JSON, or its `url`
    /// is not a path on the registration's origin.
    pub async fn push(&self, data: &[u8]) -> Result<ShownNotification, Error> {
        let payload = PushPayload::parse(data)?;
        let notification = Notification::from_payload(payload, &self.config.notifications);
        self.check_target(notification.target_url())?;
        Ok(self.notifications.show(notification).await)
    }

    /// A notification may only lead to a page of this origin.
    fn check_target(&self, target: &str) -> Result<(), Error> {
        let resolved =
            resolve(&self.config.origin, target).map_err(|e| Error::InvalidInput(format!("notification url: {e}")))?;
        if resolved.origin() != self.config.origin.origin() {
            return Err(Error::InvalidInput(format!("notification url leaves the origin: {target}")));
        }
        Ok(())
    }

    pub async fn notifications(&self) -> Vec<ShownNotification> {
        self.notifications.list().await
    }

    /// Close a notification and return the URL to open.
    ///
    /// # Errors
    ///
    /// `Error::NotFound` if no notification with `id` is displayed.
    pub async fn notification_click(&self, id: u64) -> Result<String, Error> {
        self.notifications
            .click(id)
            .await
            .ok_or_else(|| Error::NotFound(format!("notification {id}")))
    }

    /// # Errors
    ///
    /// The storage error listing cache stores.
    pub async fn status(&self) -> Result<RegistrationStatus, Error> {
        let (active, waiting) = {
            let slots = self.slots.read().await;
            (slots.active.clone(), slots.waiting.clone())
        };
        Ok(RegistrationStatus {
            active: match active {
                Some(w) => Some(w.status().await),
                None => None,
            },
            waiting: match waiting {
                Some(w) => Some(w.status().await),
                None => None,
            },
            caches: self.storage.keys().await?,
        })
    }

    /// State of the active worker, if any.
    pub async fn active_state(&self) -> Option<WorkerState> {
        let active = self.slots.read().await.active.clone();
        match active {
            Some(w) => Some(w.state().await),
            None => None,
        }
    }

    /// Wait for background cache writes of the current workers to settle.
    pub async fn wait_until_idle(&self) {
        let slots = self.slots.read().await;
        for worker in slots.active.iter().chain(slots.waiting.iter()) {
            worker.router().wait_until_idle().await;
        }
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("origin", &self.config.origin.as_str())
            .field("skip_waiting_on_install", &self.config.skip_waiting_on_install)
            .finish_non_exhaustive()
    }
}
