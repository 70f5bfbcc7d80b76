//! Worker configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (FIXIE_SW_*)
//! 2. TOML config file (if FIXIE_SW_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cache::Generation;

mod validation;

pub use validation::ConfigError;

/// Worker configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (FIXIE_SW_*)
/// 2. TOML config file (if FIXIE_SW_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Prefix shared by every partition name.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Generation version; bump on every deploy.
    ///
    /// Set via FIXIE_SW_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Origin the app shell is served from.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path prefix static asset paths are resolved against.
    #[serde(default = "default_base_path")]
    pub base_path: String,

    /// App shell assets precached at install. Relative to `origin` + `base_path`.
    #[serde(default = "default_static_assets")]
    pub static_assets: Vec<String>,

    /// Origins whose responses are served stale-while-revalidate.
    #[serde(default = "default_cdn_origins")]
    pub cdn_origins: Vec<String>,

    /// Absolute CDN URLs precached (best effort) at install.
    #[serde(default)]
    pub cdn_assets: Vec<String>,

    /// Document served to navigation requests when offline.
    #[serde(default = "default_offline_page")]
    pub offline_page: String,

    /// Regular expression matched against request hosts to detect map tiles.
    #[serde(default = "default_map_tile_host_pattern")]
    pub map_tile_host_pattern: String,

    /// Path to SQLite cache database.
    ///
    /// Set via FIXIE_SW_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to buffer per response.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Per-attempt network timeout in milliseconds.
    ///
    /// Set via FIXIE_SW_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum concurrent fetches while precaching.
    #[serde(default = "default_install_concurrency")]
    pub install_concurrency: usize,

    /// Whether install takes over immediately instead of waiting for a
    /// SKIP_WAITING message.
    #[serde(default = "default_true")]
    pub auto_skip_waiting: bool,

    /// Whether the binary runs install on startup.
    #[serde(default = "default_true")]
    pub install_on_start: bool,
}

fn default_cache_prefix() -> String {
    "fixierun-pwa".into()
}

fn default_cache_version() -> String {
    "v1".into()
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_base_path() -> String {
    "/".into()
}

fn default_static_assets() -> Vec<String> {
    ["./", "./index.html", "./style.css", "./app.js", "./manifest.json", "./offline.html"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_cdn_origins() -> Vec<String> {
    vec!["https://unpkg.com".into(), "https://cdn.jsdelivr.net".into()]
}

fn default_offline_page() -> String {
    "./offline.html".into()
}

fn default_map_tile_host_pattern() -> String {
    r"^([a-z0-9-]+\.)?tile\.openstreetmap\.org$".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./fixie-sw-cache.sqlite")
}

fn default_user_agent() -> String {
    "fixie-sw/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_install_concurrency() -> usize {
    4
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_prefix: default_cache_prefix(),
            cache_version: default_cache_version(),
            origin: default_origin(),
            base_path: default_base_path(),
            static_assets: default_static_assets(),
            cdn_origins: default_cdn_origins(),
            cdn_assets: Vec::new(),
            offline_page: default_offline_page(),
            map_tile_host_pattern: default_map_tile_host_pattern(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            install_concurrency: default_install_concurrency(),
            auto_skip_waiting: true,
            install_on_start: true,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The generation this configuration deploys.
    pub fn generation(&self) -> Generation {
        Generation::new(&self.cache_prefix, &self.cache_version)
    }

    /// Absolute URL that static asset paths are joined onto.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `origin` or `base_path` do not form a URL.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let origin = Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;
        let mut base = self.base_path.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        origin
            .join(&base)
            .map_err(|e| ConfigError::Invalid { field: "base_path".into(), reason: e.to_string() })
    }

    /// Resolve a static asset path against the base URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the path cannot be joined.
    pub fn resolve_asset(&self, path: &str) -> Result<Url, ConfigError> {
        self.base_url()?
            .join(path)
            .map_err(|e| ConfigError::Invalid { field: "static_assets".into(), reason: format!("{path}: {e}") })
    }

    /// Absolute URLs of every static asset, in configuration order.
    pub fn static_asset_urls(&self) -> Result<Vec<Url>, ConfigError> {
        self.static_assets.iter().map(|p| self.resolve_asset(p)).collect()
    }

    /// Absolute URL of the offline fallback document.
    pub fn offline_url(&self) -> Result<Url, ConfigError> {
        self.resolve_asset(&self.offline_page)
    }

    /// Hosts of the configured CDN origins, lowercased.
    pub fn cdn_hosts(&self) -> Vec<String> {
        self.cdn_origins
            .iter()
            .filter_map(|o| Url::parse(o).ok())
            .filter_map(|u| u.host_str().map(str::to_lowercase))
            .collect()
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `FIXIE_SW_`
    /// 2. TOML file from `FIXIE_SW_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("FIXIE_SW_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("FIXIE_SW_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.cache_prefix, "fixierun-pwa");
        assert_eq!(config.cache_version, "v1");
        assert_eq!(config.db_path, PathBuf::from("./fixie-sw-cache.sqlite"));
        assert_eq!(config.user_agent, "fixie-sw/0.1");
        assert_eq!(config.timeout_ms, 10_000);
        assert_eq!(config.install_concurrency, 4);
        assert!(config.auto_skip_waiting);
        assert!(config.cdn_assets.is_empty());
        assert!(config.static_assets.contains(&config.offline_page));
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(10_000));
    }

    #[test]
    fn test_generation_from_config() {
        let config = AppConfig { cache_version: "v1.2.0".into(), ..Default::default() };
        assert_eq!(config.generation().static_partition(), "fixierun-pwa-static-v1.2.0");
    }

    #[test]
    fn test_resolve_assets_under_base_path() {
        let config = AppConfig {
            origin: "https://fixie.run".into(),
            base_path: "/app".into(),
            ..Default::default()
        };
        assert_eq!(config.resolve_asset("./").unwrap().as_str(), "https://fixie.run/app/");
        assert_eq!(config.resolve_asset("./style.css").unwrap().as_str(), "https://fixie.run/app/style.css");
        assert_eq!(config.offline_url().unwrap().as_str(), "https://fixie.run/app/offline.html");
    }

    #[test]
    fn test_cdn_hosts() {
        let config = AppConfig {
            cdn_origins: vec!["https://UNPKG.com".into(), "not a url".into()],
            ..Default::default()
        };
        assert_eq!(config.cdn_hosts(), vec!["unpkg.com".to_string()]);
    }
}
