//! Request router: executes the strategy chosen by [`classify`].
//!
//! Classification is pure and lives in `shellcache_core::policy`. This
//! module does the I/O for each strategy:
//!
//! | strategy | first | on network failure |
//! |---|---|---|
//! | network-only | network | synthesized 503 JSON, cache untouched |
//! | navigation | network | cached app shell, else the error |
//! | runtime-cacheable | cache | (miss) network, 200 stored in background; cached app shell, else the error |
//! | passthrough | network | cached copy, else the error |

pub mod writer;

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use url::Url;

use shellcache_core::{CacheStorage, Error, PolicyConfig, Request, Snapshot, Strategy, classify};

use crate::fetch::{Network, resolve};

pub use writer::PendingWrites;

/// Body `error` field of the synthesized offline response.
pub const OFFLINE_ERROR: &str = "Network unavailable";

/// Body `message` field of the synthesized offline response.
pub const OFFLINE_MESSAGE: &str = "Please check your internet connection";

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Source {
    Network,
    Cache,
    /// The cached app shell stood in for the requested resource.
    ShellFallback,
    /// Built locally, e.g. the offline JSON envelope.
    Synthesized,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Network => "network",
            Source::Cache => "cache",
            Source::ShellFallback => "shell-fallback",
            Source::Synthesized => "synthesized",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A response together with how it was obtained.
#[derive(Debug, Clone)]
pub struct Outcome {
    /// `None` when no activated worker controlled the request.
    pub strategy: Option<Strategy>,
    pub source: Source,
    pub response: Snapshot,
}

/// The 503 response returned for a network-only request while offline.
pub fn offline_response(request: &Request) -> Snapshot {
    Snapshot::json(
        request.cache_key(),
        503,
        &serde_json::json!({ "error": OFFLINE_ERROR, "message": OFFLINE_MESSAGE }),
    )
}

/// Executes routing strategies against a network and a cache storage.
pub struct Router {
    policy: Arc<PolicyConfig>,
    origin: Url,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    writes: PendingWrites,
}

impl Router {
    pub fn new(
        policy: Arc<PolicyConfig>, origin: Url, storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>,
    ) -> Self {
        Self { policy, origin, storage, network, writes: PendingWrites::new() }
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    pub fn classify(&self, request: &Request) -> Strategy {
        classify(&self.policy, request)
    }

    /// Classify and execute.
    pub async fn handle(&self, request: &Request) -> Result<Outcome, Error> {
        let strategy = self.classify(request);
        tracing::debug!(method = %request.method, url = %request.url, mode = %request.mode, %strategy, "classified");
        self.execute(strategy, request).await
    }

    /// Execute a strategy for a request.
    ///
    /// # Errors
    ///
    /// The network error, when the strategy has nothing to fall back on.
    pub async fn execute(&self, strategy: Strategy, request: &Request) -> Result<Outcome, Error> {
        let (source, response) = match strategy {
            Strategy::NetworkOnly => self.network_only(request).await,
            Strategy::Navigation => self.navigation(request).await?,
            Strategy::RuntimeCacheable => self.runtime_cacheable(request).await?,
            Strategy::Passthrough => self.passthrough(request).await?,
        };
        Ok(Outcome { strategy: Some(strategy), source, response })
    }

    /// Wait for background cache writes to settle.
    pub async fn wait_until_idle(&self) {
        self.writes.wait_until_idle().await;
    }

    /// Stop starting cache writes. Responses still in flight are served but
    /// no longer stored; writes already started are unaffected.
    pub async fn close_writes(&self) {
        self.writes.close().await;
    }

    async fn network_only(&self, request: &Request) -> (Source, Snapshot) {
        match self.network.fetch(request).await {
            Ok(response) => (Source::Network, response),
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "network-only request failed, returning offline response");
                (Source::Synthesized, offline_response(request))
            }
        }
    }

    async fn navigation(&self, request: &Request) -> Result<(Source, Snapshot), Error> {
        match self.network.fetch(request).await {
            Ok(response) => Ok((Source::Network, response)),
            Err(e) => match self.shell().await {
                Some(shell) => {
                    tracing::warn!(url = %request.url, error = %e, "navigation failed, serving app shell");
                    Ok((Source::ShellFallback, shell))
                }
                None => Err(e),
            },
        }
    }

    async fn runtime_cacheable(&self, request: &Request) -> Result<(Source, Snapshot), Error> {
        if let Some(cached) = self.cached(request).await {
            tracing::debug!(url = %request.url, "cache hit");
            return Ok((Source::Cache, cached));
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                if response.status == 200 && request.is_get() {
                    match response.shareable() {
                        Some(copy) => self.writes.spawn(self.storage.clone(), self.policy.cache_name(), copy).await,
                        None => tracing::debug!(url = %request.url, "private response, not cached"),
                    }
                }
                Ok((Source::Network, response))
            }
            Err(e) => match self.shell().await {
                Some(shell) => {
                    tracing::warn!(url = %request.url, error = %e, "asset fetch failed, serving app shell");
                    Ok((Source::ShellFallback, shell))
                }
                None => Err(e),
            },
        }
    }

    async fn passthrough(&self, request: &Request) -> Result<(Source, Snapshot), Error> {
        match self.network.fetch(request).await {
            Ok(response) => Ok((Source::Network, response)),
            Err(e) => match self.cached(request).await {
                Some(cached) => {
                    tracing::debug!(url = %request.url, "network failed, serving cached copy");
                    Ok((Source::Cache, cached))
                }
                None => Err(e),
            },
        }
    }

    /// Cached response for a request in any store. Only `GET` is ever cached.
    async fn cached(&self, request: &Request) -> Option<Snapshot> {
        if !request.is_get() {
            return None;
        }
        self.lookup(&request.cache_key()).await
    }

    /// The cached app shell, if any store holds it.
    async fn shell(&self) -> Option<Snapshot> {
        let url = match resolve(&self.origin, &self.policy.shell_url) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(shell_url = %self.policy.shell_url, error = %e, "invalid shell url");
                return None;
            }
        };
        self.lookup(&shellcache_core::cache::key::cache_key(&url)).await
    }

    async fn lookup(&self, key: &str) -> Option<Snapshot> {
        match self.storage.match_any(key).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::debug!(url = %key, error = %e, "cache lookup failed");
                None
            }
        }
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("policy", &self.policy)
            .field("origin", &self.origin.as_str())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeNetwork, origin, shell_snapshot};
    use shellcache_core::{MemoryStorage, RequestMode};

    struct Fixture {
        storage: Arc<MemoryStorage>,
        network: Arc<FakeNetwork>,
        router: Router,
    }

    fn fixture() -> Fixture {
        let storage = Arc::new(MemoryStorage::new());
        let network = Arc::new(FakeNetwork::new());
        let router =
            Router::new(Arc::new(PolicyConfig::default()), origin(), storage.clone(), network.clone());
        Fixture { storage, network, router }
    }

    fn get(path: &str) -> Request {
        Request::get(origin().join(path).unwrap())
    }

    #[tokio::test]
    async fn test_api_offline_returns_json_503() {
        let f = fixture();
        f.network.set_online(false);

        let outcome = f.router.handle(&get("/api/topics/")).await.unwrap();

        assert_eq!(outcome.strategy, Some(Strategy::NetworkOnly));
        assert_eq!(outcome.source, Source::Synthesized);
        assert_eq!(outcome.response.status, 503);
        assert_eq!(outcome.response.content_type(), Some("application/json"));
        let body: serde_json::Value = serde_json::from_slice(&outcome.response.body).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"error": "Network unavailable", "message": "Please check your internet connection"})
        );
    }

    #[tokio::test]
    async fn test_network_only_never_touches_cache() {
        let f = fixture();
        let url = origin().join("/api/topics/").unwrap();
        f.storage
            .put("exam-prep-v1", &Snapshot::new(url.as_str(), 200, vec![], "stale"))
            .await
            .unwrap();
        f.network.route("/api/topics/", 200, "application/json", "[]");

        let outcome = f.router.handle(&get("/api/topics/")).await.unwrap();
        f.router.wait_until_idle().await;
        assert_eq!(outcome.source, Source::Network);
        assert_eq!(outcome.response.body, "[]");

        f.network.set_online(false);
        let outcome = f.router.handle(&get("/api/topics/")).await.unwrap();
        assert_eq!(outcome.source, Source::Synthesized);

        let stored = f.storage.match_url("exam-prep-v1", url.as_str()).await.unwrap().unwrap();
        assert_eq!(stored.body, "stale");
    }

    #[tokio::test]
    async fn test_static_asset_cached_then_served_offline() {
        let f = fixture();
        f.network.route("/static/app.js", 200, "application/javascript", "console.log('app')");

        let first = f.router.handle(&get("/static/app.js")).await.unwrap();
        assert_eq!(first.strategy, Some(Strategy::RuntimeCacheable));
        assert_eq!(first.source, Source::Network);
        f.router.wait_until_idle().await;

        let key = origin().join("/static/app.js").unwrap();
        assert!(f.storage.match_url("exam-prep-v1", key.as_str()).await.unwrap().is_some());

        f.network.set_online(false);
        let calls_before = f.network.calls();
        let second = f.router.handle(&get("/static/app.js")).await.unwrap();
        assert_eq!(second.source, Source::Cache);
        assert_eq!(second.response.body, first.response.body);
        assert_eq!(f.network.calls(), calls_before);
    }

    #[tokio::test]
    async fn test_cache_first_skips_network_when_online() {
        let f = fixture();
        f.network.route("/assets/logo.svg", 200, "image/svg+xml", "<svg/>");

        f.router.handle(&get("/assets/logo.svg")).await.unwrap();
        f.router.wait_until_idle().await;
        let calls = f.network.calls();

        let outcome = f.router.handle(&get("/assets/logo.svg")).await.unwrap();
        assert_eq!(outcome.source, Source::Cache);
        assert_eq!(f.network.calls(), calls);
    }

    #[tokio::test]
    async fn test_non_200_asset_not_cached() {
        let f = fixture();
        f.network.route("/static/missing.js", 404, "text/plain", "not found");
        f.network.route("/static/partial.js", 206, "application/javascript", "part");

        let outcome = f.router.handle(&get("/static/missing.js")).await.unwrap();
        assert_eq!(outcome.response.status, 404);
        f.router.handle(&get("/static/partial.js")).await.unwrap();
        f.router.wait_until_idle().await;

        assert!(f.storage.entries("exam-prep-v1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cached_asset_never_replays_cookies() {
        let f = fixture();
        f.network.route_with_headers(
            "/static/app.js",
            200,
            vec![("content-type", "application/javascript"), ("set-cookie", "sessionid=alice-secret; HttpOnly")],
            "console.log('app')",
        );

        let first = f.router.handle(&get("/static/app.js")).await.unwrap();
        assert_eq!(first.response.header("set-cookie"), Some("sessionid=alice-secret; HttpOnly"));
        f.router.wait_until_idle().await;

        f.network.set_online(false);
        let second = f.router.handle(&get("/static/app.js")).await.unwrap();
        assert_eq!(second.source, Source::Cache);
        assert_eq!(second.response.header("set-cookie"), None);
        assert_eq!(second.response.content_type(), Some("application/javascript"));
    }

    #[tokio::test]
    async fn test_private_asset_not_cached() {
        let f = fixture();
        f.network.route_with_headers("/static/me.js", 200, vec![("cache-control", "private, max-age=60")], "me");
        f.network.route_with_headers("/assets/report.pdf", 200, vec![("Cache-Control", "no-store")], "pdf");

        let outcome = f.router.handle(&get("/static/me.js")).await.unwrap();
        assert_eq!(outcome.source, Source::Network);
        f.router.handle(&get("/assets/report.pdf")).await.unwrap();
        f.router.wait_until_idle().await;

        assert!(f.storage.entries("exam-prep-v1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_get_asset_not_cached() {
        let f = fixture();
        f.network.route("/static/upload", 200, "text/plain", "ok");

        let request = Request::new("POST", origin().join("/static/upload").unwrap()).with_body("data");
        let outcome = f.router.handle(&request).await.unwrap();
        f.router.wait_until_idle().await;

        assert_eq!(outcome.source, Source::Network);
        assert!(f.storage.entries("exam-prep-v1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_offline_navigation_serves_shell() {
        let f = fixture();
        f.storage.put("exam-prep-v1", &shell_snapshot()).await.unwrap();
        f.network.set_online(false);

        let request = Request::navigate(origin().join("/test/42").unwrap());
        let outcome = f.router.handle(&request).await.unwrap();

        assert_eq!(outcome.strategy, Some(Strategy::Navigation));
        assert_eq!(outcome.source, Source::ShellFallback);
        assert_eq!(outcome.response, shell_snapshot());
    }

    #[tokio::test]
    async fn test_offline_navigation_without_shell_fails() {
        let f = fixture();
        f.network.set_online(false);

        let request = Request::navigate(origin().join("/test/42").unwrap());
        let result = f.router.handle(&request).await;
        assert!(matches!(result, Err(Error::Network(_))));
    }

    #[tokio::test]
    async fn test_online_navigation_uses_network() {
        let f = fixture();
        f.storage.put("exam-prep-v1", &shell_snapshot()).await.unwrap();
        f.network.route("/dashboard", 200, "text/html", "<html>fresh</html>");

        let request = Request::get(origin().join("/dashboard").unwrap()).with_mode(RequestMode::Navigate);
        let outcome = f.router.handle(&request).await.unwrap();
        assert_eq!(outcome.source, Source::Network);
        assert_eq!(outcome.response.body, "<html>fresh</html>");
    }

    #[tokio::test]
    async fn test_asset_miss_offline_falls_back_to_shell() {
        let f = fixture();
        f.storage.put("exam-prep-v1", &shell_snapshot()).await.unwrap();
        f.network.set_online(false);

        let outcome = f.router.handle(&get("/static/chunk-9.js")).await.unwrap();
        assert_eq!(outcome.source, Source::ShellFallback);
        assert_eq!(outcome.response.content_type(), Some("text/html"));
    }

    #[tokio::test]
    async fn test_asset_miss_offline_without_shell_fails() {
        let f = fixture();
        f.network.set_online(false);
        assert!(f.router.handle(&get("/static/chunk-9.js")).await.is_err());
    }

    #[tokio::test]
    async fn test_passthrough_falls_back_to_cache() {
        let f = fixture();
        let manifest = origin().join("/manifest.json").unwrap();
        f.storage
            .put("exam-prep-v1", &Snapshot::new(manifest.as_str(), 200, vec![], "{}"))
            .await
            .unwrap();
        f.network.set_online(false);

        let outcome = f.router.handle(&get("/manifest.json")).await.unwrap();
        assert_eq!(outcome.strategy, Some(Strategy::Passthrough));
        assert_eq!(outcome.source, Source::Cache);
    }

    #[tokio::test]
    async fn test_passthrough_offline_without_cache_fails() {
        let f = fixture();
        f.network.set_online(false);
        assert!(matches!(f.router.handle(&get("/favicon.ico")).await, Err(Error::Network(_))));
    }

    #[tokio::test]
    async fn test_passthrough_online_does_not_write_cache() {
        let f = fixture();
        f.network.route("/favicon.ico", 200, "image/x-icon", "ico");

        let outcome = f.router.handle(&get("/favicon.ico")).await.unwrap();
        f.router.wait_until_idle().await;
        assert_eq!(outcome.source, Source::Network);
        assert!(f.storage.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_execute_honours_given_strategy() {
        let f = fixture();
        f.network.set_online(false);
        let outcome = f.router.execute(Strategy::NetworkOnly, &get("/favicon.ico")).await.unwrap();
        assert_eq!(outcome.source, Source::Synthesized);
    }
}
