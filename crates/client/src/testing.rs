//! Test doubles shared by the client unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Notify;
use url::Url;

use shellcache_core::{Error, Request, Snapshot};

use crate::fetch::Network;

pub fn origin() -> Url {
    Url::parse("http://app.test/").unwrap()
}

/// The app shell as it would sit in the cache after precaching.
pub fn shell_snapshot() -> Snapshot {
    Snapshot {
        url: origin().join("/index.html").unwrap().to_string(),
        status: 200,
        headers: vec![("content-type".into(), "text/html".into())],
        body: "<html><div id=\"root\"></div></html>".into(),
        fetched_at: "2026-01-01T00:00:00+00:00".into(),
    }
}

type Route = (u16, Vec<(String, String)>, String);

/// Holds requests for one path until released.
pub struct Gate {
    path: String,
    /// Signalled when a request reaches the gate.
    pub entered: Notify,
    /// Signal to let the held request through.
    pub release: Notify,
}

/// An origin that serves fixed routes and can be switched offline.
pub struct FakeNetwork {
    routes: Mutex<HashMap<String, Route>>,
    online: AtomicBool,
    calls: AtomicUsize,
    gate: Option<Gate>,
}

impl FakeNetwork {
    pub fn new() -> Self {
        Self {
            routes: Mutex::new(HashMap::new()),
            online: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
            gate: None,
        }
    }

    /// A fake that serves the default precache list.
    pub fn with_app_shell() -> Self {
        let network = Self::new();
        network.route("/", 200, "text/html", "<html><div id=\"root\"></div></html>");
        network.route("/index.html", 200, "text/html", "<html><div id=\"root\"></div></html>");
        network.route("/manifest.json", 200, "application/manifest+json", "{\"name\":\"Exam Prep\"}");
        network
    }

    /// Hold every request for `path` at a [`Gate`].
    pub fn gated(mut self, path: &str) -> Self {
        self.gate = Some(Gate { path: path.to_string(), entered: Notify::new(), release: Notify::new() });
        self
    }

    pub fn gate(&self) -> &Gate {
        self.gate.as_ref().unwrap()
    }

    pub fn route(&self, path: &str, status: u16, content_type: &str, body: &str) {
        self.route_with_headers(path, status, vec![("content-type", content_type)], body);
    }

    pub fn route_with_headers(&self, path: &str, status: u16, headers: Vec<(&str, &str)>, body: &str) {
        let headers = headers.into_iter().map(|(n, v)| (n.to_string(), v.to_string())).collect();
        self.routes.lock().unwrap().insert(path.to_string(), (status, headers, body.to_string()));
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Network for FakeNetwork {
    async fn fetch(&self, request: &Request) -> Result<Snapshot, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate
            && gate.path == request.path()
        {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        if !self.online.load(Ordering::SeqCst) {
            return Err(Error::Network("offline".into()));
        }

        let route = self.routes.lock().unwrap().get(request.path()).cloned();
        let (status, headers, body) = route.unwrap_or_else(|| {
            (404, vec![("content-type".to_string(), "text/plain".to_string())], "not found".to_string())
        });
        Ok(Snapshot::new(request.cache_key(), status, headers, body))
    }
}
