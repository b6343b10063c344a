//! Request classification.
//!
//! Every intercepted request is tagged with exactly one [`Strategy`], derived
//! from its URL path and request mode alone. Rules are checked in a fixed
//! order and the first match wins, since the path patterns may overlap:
//!
//! 1. path starts with a network-only prefix → [`Strategy::NetworkOnly`]
//! 2. request mode is `navigate` → [`Strategy::Navigation`]
//! 3. path contains a runtime-cache pattern → [`Strategy::RuntimeCacheable`]
//! 4. anything else → [`Strategy::Passthrough`]

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::request::Request;

/// How an intercepted request is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Network only; the cache is never read or written.
    NetworkOnly,
    /// Network first, cached app shell on failure.
    Navigation,
    /// Cache first, network on miss, successful responses stored.
    RuntimeCacheable,
    /// Network first, any cached copy on failure.
    Passthrough,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::NetworkOnly => "network-only",
            Strategy::Navigation => "navigation",
            Strategy::RuntimeCacheable => "runtime-cacheable",
            Strategy::Passthrough => "passthrough",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification rules and cache naming for one worker version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Prefix of the cache store name.
    pub app_prefix: String,
    /// Version suffix of the cache store name. Changing it invalidates
    /// every previously cached entry on the next activation.
    pub cache_version: String,
    /// Path prefixes that must never touch the cache.
    pub network_only_prefixes: Vec<String>,
    /// Path substrings marking static asset directories.
    pub runtime_cache_patterns: Vec<String>,
    /// Paths fetched and stored at install time.
    pub precache_urls: Vec<String>,
    /// Path of the app shell served when a navigation fails.
    pub shell_url: String,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            app_prefix: "exam-prep".into(),
            cache_version: "v1".into(),
            network_only_prefixes: vec!["/api/".into(), "/admin/".into(), "/auth/".into()],
            runtime_cache_patterns: vec!["/static/".into(), "/assets/".into(), "/icons/".into()],
            precache_urls: vec!["/".into(), "/index.html".into(), "/manifest.json".into()],
            shell_url: "/index.html".into(),
        }
    }
}

impl PolicyConfig {
    /// Name of the cache store owned by this version: `<app_prefix>-<cache_version>`.
    pub fn cache_name(&self) -> String {
        format!("{}-{}", self.app_prefix, self.cache_version)
    }

    /// Same rules, different version.
    pub fn with_version(&self, version: impl Into<String>) -> Self {
        Self { cache_version: version.into(), ..self.clone() }
    }

    pub fn is_network_only(&self, path: &str) -> bool {
        self.network_only_prefixes.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }

    pub fn is_runtime_cacheable(&self, path: &str) -> bool {
        self.runtime_cache_patterns.iter().any(|pattern| path.contains(pattern.as_str()))
    }
}

/// Classify a request. Pure: no I/O, no state.
pub fn classify(config: &PolicyConfig, request: &Request) -> Strategy {
    let path = request.path();

    if config.is_network_only(path) {
        Strategy::NetworkOnly
    } else if request.is_navigation() {
        Strategy::Navigation
    } else if config.is_runtime_cacheable(path) {
        Strategy::RuntimeCacheable
    } else {
        Strategy::Passthrough
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::RequestMode;
    use url::Url;

    fn get(path: &str) -> Request {
        Request::get(Url::parse("https://app.test").unwrap().join(path).unwrap())
    }

    fn navigate(path: &str) -> Request {
        get(path).with_mode(RequestMode::Navigate)
    }

    #[test]
    fn test_cache_name() {
        let config = PolicyConfig::default();
        assert_eq!(config.cache_name(), "exam-prep-v1");
        assert_eq!(config.with_version("v2").cache_name(), "exam-prep-v2");
    }

    #[test]
    fn test_api_paths_are_network_only() {
        let config = PolicyConfig::default();
        assert_eq!(classify(&config, &get("/api/topics/")), Strategy::NetworkOnly);
        assert_eq!(classify(&config, &get("/auth/login/")), Strategy::NetworkOnly);
        assert_eq!(classify(&config, &get("/admin/")), Strategy::NetworkOnly);
    }

    #[test]
    fn test_network_only_wins_over_navigation() {
        let config = PolicyConfig::default();
        assert_eq!(classify(&config, &navigate("/admin/users/")), Strategy::NetworkOnly);
    }

    #[test]
    fn test_navigation_wins_over_runtime_pattern() {
        let config = PolicyConfig::default();
        assert_eq!(classify(&config, &navigate("/static/help.html")), Strategy::Navigation);
        assert_eq!(classify(&config, &navigate("/test/42")), Strategy::Navigation);
    }

    #[test]
    fn test_static_assets_are_runtime_cacheable() {
        let config = PolicyConfig::default();
        assert_eq!(classify(&config, &get("/static/app.js")), Strategy::RuntimeCacheable);
        assert_eq!(classify(&config, &get("/nested/assets/logo.svg")), Strategy::RuntimeCacheable);
        assert_eq!(classify(&config, &get("/icons/icon-192x192.png")), Strategy::RuntimeCacheable);
    }

    #[test]
    fn test_everything_else_passes_through() {
        let config = PolicyConfig::default();
        assert_eq!(classify(&config, &get("/manifest.json")), Strategy::Passthrough);
        assert_eq!(classify(&config, &get("/favicon.ico")), Strategy::Passthrough);
    }

    #[test]
    fn test_prefix_is_not_substring_match() {
        let config = PolicyConfig::default();
        assert_eq!(classify(&config, &get("/docs/api/")), Strategy::Passthrough);
    }

    #[test]
    fn test_query_string_ignored() {
        let config = PolicyConfig::default();
        assert_eq!(classify(&config, &get("/index.html?next=/api/")), Strategy::Passthrough);
    }

    #[test]
    fn test_custom_rules() {
        let config = PolicyConfig {
            network_only_prefixes: vec!["/graphql".into()],
            runtime_cache_patterns: vec![".woff2".into()],
            ..Default::default()
        };
        assert_eq!(classify(&config, &get("/graphql")), Strategy::NetworkOnly);
        assert_eq!(classify(&config, &get("/fonts/inter.woff2")), Strategy::RuntimeCacheable);
        assert_eq!(classify(&config, &get("/api/topics/")), Strategy::Passthrough);
    }

    #[test]
    fn test_strategy_display() {
        assert_eq!(Strategy::RuntimeCacheable.to_string(), "runtime-cacheable");
        assert_eq!(serde_json::to_string(&Strategy::NetworkOnly).unwrap(), "\"network-only\"");
    }
}
