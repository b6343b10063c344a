//! Upstream HTTP fetching.
//!
//! ### Network trait
//! - [`Network`] is the seam between the router and the outside world; the
//!   router never talks to reqwest directly.
//! - Any HTTP response, whatever its status, is `Ok`. Only a request that
//!   produced no response (refused, reset, timed out, oversized) is `Err`.
//!
//! ### Forwarding
//! - Hop-by-hop headers are stripped in both directions.
//! - `accept-encoding` is left to reqwest so bodies arrive decoded.
//! - Redirects are passed back to the caller unless `max_redirects` > 0.
//! - Max body bytes: 10MB (configurable)

pub mod url;

use async_trait::async_trait;
use reqwest::{Client, Method};
use std::time::{Duration, Instant};

pub use url::{UrlError, canonicalize_origin, resolve};

use shellcache_core::{AppConfig, Error, Request, Snapshot};

/// Headers that describe a single connection and must not be forwarded.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
];

/// Whether a header may be copied between the client and upstream legs.
pub fn is_forwardable_header(name: &str) -> bool {
    !HOP_BY_HOP.iter().any(|h| name.eq_ignore_ascii_case(h))
}

/// Something that can turn a request into a response.
#[async_trait]
pub trait Network: Send + Sync {
    /// Perform the request.
    ///
    /// # Errors
    ///
    /// `Error::Network` when no response was received at all.
    async fn fetch(&self, request: &Request) -> Result<Snapshot, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent for requests that do not carry one (default: "shellcache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 10MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 0, redirects go back to the browser)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "shellcache/0.1".to_string(),
            max_bytes: 10 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 0,
        }
    }
}

impl FetchConfig {
    /// Fetch settings from the application configuration.
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Self::default()
        }
    }
}

/// reqwest-backed [`Network`].
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let redirect = if config.max_redirects == 0 {
            reqwest::redirect::Policy::none()
        } else {
            reqwest::redirect::Policy::limited(config.max_redirects)
        };

        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(redirect)
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn build(&self, request: &Request) -> Result<reqwest::RequestBuilder, Error> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| Error::InvalidInput(format!("invalid method: {}", request.method)))?;

        let mut builder = self.http.request(method, request.url.as_str());
        for (name, value) in &request.headers {
            if is_forwardable_header(name) && !name.eq_ignore_ascii_case("accept-encoding") {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }
        Ok(builder)
    }
}

#[async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &Request) -> Result<Snapshot, Error> {
        let start = Instant::now();

        let response = self.build(request)?.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Network(format!("timed out after {}ms", self.config.timeout.as_millis()))
            } else {
                Error::Network(format!("network error: {e}"))
            }
        })?;

        let status = response.status();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter(|(name, _)| is_forwardable_header(name.as_str()))
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("failed to read response: {e}")))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", bytes.len(), self.config.max_bytes)));
        }

        tracing::debug!(
            method = %request.method,
            url = %request.url,
            status = status.as_u16(),
            bytes = bytes.len(),
            fetch_ms = start.elapsed().as_millis() as u64,
            "upstream response"
        );

        Ok(Snapshot::new(request.cache_key(), status.as_u16(), headers, bytes))
    }
}

impl std::fmt::Debug for FetchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchClient").field("config", &self.config).finish()
    }
}
