//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

fn require_paths(field: &str, paths: &[String]) -> Result<(), ConfigError> {
    match paths.iter().find(|p| !p.starts_with('/')) {
        Some(bad) => Err(invalid(field, format!("'{bad}' must start with '/'"))),
        None => Ok(()),
    }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `app_prefix`, `cache_version` or `user_agent` is empty
    /// - `origin` is not an absolute http(s) URL
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - a prefix, precache URL or the shell URL does not start with `/`
    /// - a runtime cache pattern is empty
    /// - `max_notifications` is outside `1..=10000`
    /// - `control_token` is set but blank
    ///
    /// Returns `ConfigError::Missing` if `db_path` is empty while SQLite
    /// storage is selected.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app_prefix.is_empty() {
            return Err(invalid("app_prefix", "must not be empty"));
        }
        if self.cache_version.is_empty() {
            return Err(invalid("cache_version", "must not be empty"));
        }

        match url::Url::parse(&self.origin) {
            Ok(origin) if matches!(origin.scheme(), "http" | "https") && origin.host_str().is_some() => {}
            Ok(_) => return Err(invalid("origin", "must be an absolute http(s) URL")),
            Err(e) => return Err(invalid("origin", e.to_string())),
        }

        if self.storage == super::StorageKind::Sqlite && self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::Missing {
                field: "db_path".into(),
                hint: "Set SHELLCACHE_DB_PATH or use SHELLCACHE_STORAGE=memory".into(),
            });
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        require_paths("network_only_prefixes", &self.network_only_prefixes)?;
        if self.runtime_cache_patterns.iter().any(String::is_empty) {
            return Err(invalid("runtime_cache_patterns", "patterns must not be empty"));
        }
        require_paths("precache_urls", &self.precache_urls)?;
        require_paths("shell_url", std::slice::from_ref(&self.shell_url))?;

        if self.max_notifications == 0 || self.max_notifications > 10_000 {
            return Err(invalid("max_notifications", "must be between 1 and 10000"));
        }

        if self.control_token.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(invalid("control_token", "must not be blank when set"));
        }

        if !self.precache_urls.contains(&self.shell_url) {
            tracing::warn!(
                shell_url = %self.shell_url,
                "shell_url is not in precache_urls; offline navigations will fail until it is cached"
            );
        }

        Ok(())
    }
}
