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

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `cache_prefix` or `cache_version` is empty
    /// - `origin`/`base_path` do not form an http(s) URL
    /// - `map_tile_host_pattern` is not a valid regex
    /// - `offline_page` is not one of the `static_assets`
    /// - a `cdn_assets` entry is not hosted on one of the `cdn_origins`
    /// - `max_bytes`, `timeout_ms` or `install_concurrency` are out of range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_prefix.is_empty() {
            return Err(ConfigError::Invalid { field: "cache_prefix".into(), reason: "must not be empty".into() });
        }
        if self.cache_version.is_empty() {
            return Err(ConfigError::Missing {
                field: "cache_version".into(),
                hint: "Set FIXIE_SW_CACHE_VERSION environment variable".into(),
            });
        }

        let base = self.base_url()?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid { field: "origin".into(), reason: "must be http or https".into() });
        }

        if let Err(e) = regex::Regex::new(&self.map_tile_host_pattern) {
            return Err(ConfigError::Invalid { field: "map_tile_host_pattern".into(), reason: e.to_string() });
        }

        if !self.static_assets.iter().any(|a| a == &self.offline_page) {
            return Err(ConfigError::Invalid {
                field: "offline_page".into(),
                reason: format!("{} must be listed in static_assets", self.offline_page),
            });
        }
        self.static_asset_urls()?;

        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 50MB".into() });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.install_concurrency == 0 || self.install_concurrency > 16 {
            return Err(ConfigError::Invalid {
                field: "install_concurrency".into(),
                reason: "must be between 1 and 16".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        let cdn_hosts = self.cdn_hosts();
        if cdn_hosts.len() != self.cdn_origins.len() {
            tracing::warn!(
                configured = self.cdn_origins.len(),
                usable = cdn_hosts.len(),
                "Some cdn_origins could not be parsed and will be treated as static assets"
            );
        }

        for asset in &self.cdn_assets {
            let url = base
                .join(asset)
                .map_err(|e| ConfigError::Invalid { field: "cdn_assets".into(), reason: format!("{asset}: {e}") })?;
            let host = url.host_str().map(str::to_lowercase).unwrap_or_default();
            if !cdn_hosts.contains(&host) {
                return Err(ConfigError::Invalid {
                    field: "cdn_assets".into(),
                    reason: format!("{asset} is not served from one of cdn_origins"),
                });
            }
        }

        Ok(())
    }
}
