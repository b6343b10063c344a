//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SHELLCACHE_*)
//! 2. TOML config file (if SHELLCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::policy::PolicyConfig;
use crate::push::NotificationDefaults;

mod validation;

pub use validation::ConfigError;

/// Which cache storage backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Sqlite,
    Memory,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SHELLCACHE_*)
/// 2. TOML config file (if SHELLCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application name, used as the default notification title.
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Cache store name prefix.
    ///
    /// Set via SHELLCACHE_APP_PREFIX environment variable.
    #[serde(default = "default_app_prefix")]
    pub app_prefix: String,

    /// Cache version. Bumping it drops every older cache store on activation.
    ///
    /// Set via SHELLCACHE_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Origin serving the single-page app and its API.
    ///
    /// Set via SHELLCACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Address the gateway listens on.
    ///
    /// Set via SHELLCACHE_BIND_ADDR environment variable.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Cache storage backend.
    #[serde(default = "default_storage")]
    pub storage: StorageKind,

    /// Path to SQLite cache database.
    ///
    /// Set via SHELLCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for upstream requests without one.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to accept per upstream response.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Upstream request timeout in milliseconds.
    ///
    /// Set via SHELLCACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Path prefixes that always go to the network and are never cached.
    #[serde(default = "default_network_only_prefixes")]
    pub network_only_prefixes: Vec<String>,

    /// Path substrings of static asset directories, served cache-first.
    #[serde(default = "default_runtime_cache_patterns")]
    pub runtime_cache_patterns: Vec<String>,

    /// Paths fetched and cached at install time.
    #[serde(default = "default_precache_urls")]
    pub precache_urls: Vec<String>,

    /// App shell served for navigations while offline.
    #[serde(default = "default_shell_url")]
    pub shell_url: String,

    /// Activate a new version as soon as it is installed.
    #[serde(default = "default_true")]
    pub skip_waiting_on_install: bool,

    /// Icon shown with push notifications.
    #[serde(default)]
    pub notification_icon: Option<String>,

    /// Badge shown with push notifications.
    #[serde(default)]
    pub notification_badge: Option<String>,

    /// Most notifications kept on display; the oldest is dropped beyond this.
    #[serde(default = "default_max_notifications")]
    pub max_notifications: usize,

    /// Bearer token required on the `/__sw` control routes. Without one,
    /// only loopback peers may use them.
    ///
    /// Set via SHELLCACHE_CONTROL_TOKEN environment variable.
    #[serde(default)]
    pub control_token: Option<String>,
}

fn default_app_name() -> String {
    "Exam Prep".into()
}

fn default_app_prefix() -> String {
    PolicyConfig::default().app_prefix
}

fn default_cache_version() -> String {
    PolicyConfig::default().cache_version
}

fn default_origin() -> String {
    "http://127.0.0.1:5173".into()
}

fn default_bind_addr() -> String {
    "127.0.0.1:8080".into()
}

fn default_storage() -> StorageKind {
    StorageKind::Sqlite
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./shellcache.sqlite")
}

fn default_user_agent() -> String {
    "shellcache/0.1".into()
}

fn default_max_bytes() -> usize {
    10_485_760 // 10MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_network_only_prefixes() -> Vec<String> {
    PolicyConfig::default().network_only_prefixes
}

fn default_runtime_cache_patterns() -> Vec<String> {
    PolicyConfig::default().runtime_cache_patterns
}

fn default_precache_urls() -> Vec<String> {
    PolicyConfig::default().precache_urls
}

fn default_shell_url() -> String {
    PolicyConfig::default().shell_url
}

fn default_true() -> bool {
    true
}

fn default_max_notifications() -> usize {
    100
}

impl Default for AppConfig {
    fn default() -> Self {
        let defaults = NotificationDefaults::default();
        Self {
            app_name: default_app_name(),
            app_prefix: default_app_prefix(),
            cache_version: default_cache_version(),
            origin: default_origin(),
            bind_addr: default_bind_addr(),
            storage: default_storage(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            network_only_prefixes: default_network_only_prefixes(),
            runtime_cache_patterns: default_runtime_cache_patterns(),
            precache_urls: default_precache_urls(),
            shell_url: default_shell_url(),
            skip_waiting_on_install: true,
            notification_icon: defaults.icon,
            notification_badge: defaults.badge,
            max_notifications: default_max_notifications(),
            control_token: None,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Name of the current cache store.
    pub fn cache_name(&self) -> String {
        self.policy().cache_name()
    }

    /// Classification rules for the router.
    pub fn policy(&self) -> PolicyConfig {
        PolicyConfig {
            app_prefix: self.app_prefix.clone(),
            cache_version: self.cache_version.clone(),
            network_only_prefixes: self.network_only_prefixes.clone(),
            runtime_cache_patterns: self.runtime_cache_patterns.clone(),
            precache_urls: self.precache_urls.clone(),
            shell_url: self.shell_url.clone(),
        }
    }

    pub fn notification_defaults(&self) -> NotificationDefaults {
        NotificationDefaults {
            title: self.app_name.clone(),
            icon: self.notification_icon.clone(),
            badge: self.notification_badge.clone(),
        }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SHELLCACHE_`
    /// 2. TOML file from `SHELLCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SHELLCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SHELLCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        Self::from_figment(figment)
    }

    /// Extract and validate a configuration from a prepared figment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::LoadFailed` if extraction fails, or the
    /// validation error.
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
