//! Upstream stub for the gateway tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use url::Url;

use shellcache_client::{Network, Registration, RegistrationConfig};
use shellcache_core::{Error, MemoryStorage, NotificationDefaults, PolicyConfig, Request, Snapshot};

pub struct StubNetwork {
    routes: Mutex<HashMap<String, (u16, String, String)>>,
    online: AtomicBool,
}

impl StubNetwork {
    /// Serves the default precache list.
    pub fn app_shell() -> Self {
        let stub = Self { routes: Mutex::new(HashMap::new()), online: AtomicBool::new(true) };
        stub.route("/", 200, "text/html", "<html><div id=\"root\"></div></html>");
        stub.route("/index.html", 200, "text/html", "<html><div id=\"root\"></div></html>");
        stub.route("/manifest.json", 200, "application/manifest+json", "{}");
        stub
    }

    pub fn route(&self, path: &str, status: u16, content_type: &str, body: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), (status, content_type.to_string(), body.to_string()));
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

#[async_trait]
impl Network for StubNetwork {
    async fn fetch(&self, request: &Request) -> Result<Snapshot, Error> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(Error::Network("connection refused".into()));
        }
        let route = self.routes.lock().unwrap().get(request.path()).cloned();
        let (status, content_type, body) =
            route.unwrap_or_else(|| (404, "text/plain".to_string(), "not found".to_string()));
        Ok(Snapshot::new(request.cache_key(), status, vec![("content-type".into(), content_type)], body))
    }
}

pub fn config(skip_waiting: bool) -> RegistrationConfig {
    RegistrationConfig {
        policy: PolicyConfig::default(),
        origin: Url::parse("http://app.test/").unwrap(),
        skip_waiting_on_install: skip_waiting,
        notifications: NotificationDefaults::default(),
        max_notifications: 100,
    }
}

/// A registered `v1` worker over in-memory storage.
pub async fn registration(network: Arc<StubNetwork>) -> Registration {
    Registration::register(config(true), Arc::new(MemoryStorage::new()), network).await.unwrap()
}
