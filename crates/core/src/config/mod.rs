//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (OFFCACHE_*)
//! 2. TOML config file (if OFFCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cache::{DEFAULT_MAX_ENTRIES, Generation};
use crate::route::RouteTable;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (OFFCACHE_*)
/// 2. TOML config file (if OFFCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application id used as the store name prefix.
    ///
    /// Set via OFFCACHE_APP_ID environment variable.
    #[serde(default = "default_app_id")]
    pub app_id: String,

    /// Store generation deployed by this build. Must increase per deploy.
    ///
    /// Set via OFFCACHE_GENERATION environment variable.
    #[serde(default = "default_generation")]
    pub generation: u32,

    /// Base URL of the cached application; manifest paths resolve against it.
    ///
    /// Set via OFFCACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path to SQLite store database.
    ///
    /// Set via OFFCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for network requests.
    ///
    /// Set via OFFCACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Network timeout in milliseconds. A fetch that runs longer is a failure.
    ///
    /// Set via OFFCACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum response body size in bytes.
    ///
    /// Set via OFFCACHE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Eviction ceiling for the dynamic store.
    ///
    /// Set via OFFCACHE_MAX_DYNAMIC_ENTRIES environment variable.
    #[serde(default = "default_max_dynamic_entries")]
    pub max_dynamic_entries: usize,

    /// Path prefixes that are always served network-first.
    ///
    /// Set via OFFCACHE_API_PREFIXES environment variable (comma-separated).
    #[serde(default = "default_api_prefixes")]
    pub api_prefixes: Vec<String>,

    /// Root-relative asset paths provisioned into the static store at install.
    ///
    /// Set via OFFCACHE_STATIC_MANIFEST environment variable (comma-separated).
    #[serde(default = "default_static_manifest")]
    pub static_manifest: Vec<String>,

    /// Document served to navigations when both network and cache fail.
    ///
    /// Set via OFFCACHE_OFFLINE_DOCUMENT environment variable.
    #[serde(default = "default_offline_document")]
    pub offline_document: Option<String>,

    /// Whether successful API responses are written to the dynamic store.
    ///
    /// Set via OFFCACHE_CACHE_API_RESPONSES environment variable.
    #[serde(default = "default_true")]
    pub cache_api_responses: bool,

    /// Whether a cache-first hit triggers a background refresh.
    ///
    /// Set via OFFCACHE_REVALIDATE_ON_HIT environment variable.
    #[serde(default = "default_true")]
    pub revalidate_on_hit: bool,
}

fn default_app_id() -> String {
    "knower-life".into()
}

fn default_generation() -> u32 {
    3
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./offcache.sqlite")
}

fn default_user_agent() -> String {
    "offcache/0.1".into()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_max_dynamic_entries() -> usize {
    DEFAULT_MAX_ENTRIES
}

fn default_api_prefixes() -> Vec<String> {
    vec!["/api".into()]
}

fn default_static_manifest() -> Vec<String> {
    [
        "/",
        "/index.html",
        "/styles.css",
        "/script.js",
        "/manifest.json",
        "/icon-144.png",
        "/icon-192.png",
        "/icon-512.png",
        "/offline.html",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_offline_document() -> Option<String> {
    Some("/offline.html".into())
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_id: default_app_id(),
            generation: default_generation(),
            origin: default_origin(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            max_dynamic_entries: default_max_dynamic_entries(),
            api_prefixes: default_api_prefixes(),
            static_manifest: default_static_manifest(),
            offline_document: default_offline_document(),
            cache_api_responses: true,
            revalidate_on_hit: true,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The generation this configuration deploys.
    pub fn current_generation(&self) -> Generation {
        Generation::new(self.app_id.clone(), self.generation)
    }

    /// Parsed origin URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `origin` is not an absolute URL.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })
    }

    /// Resolve a root-relative path against the origin.
    pub fn resolve(&self, path: &str) -> Result<Url, ConfigError> {
        self.origin_url()?
            .join(path)
            .map_err(|e| ConfigError::Invalid { field: "static_manifest".into(), reason: format!("{path}: {e}") })
    }

    /// Classification rules derived from the API prefixes and static manifest.
    pub fn route_table(&self) -> Result<RouteTable, ConfigError> {
        Ok(RouteTable::new(self.origin_url()?, &self.api_prefixes, &self.static_manifest))
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `OFFCACHE_`
    /// 2. TOML file from `OFFCACHE_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("OFFCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("OFFCACHE_")
                .ignore(&["config_file", "api_prefixes", "static_manifest"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let mut config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        if let Ok(prefixes) = std::env::var("OFFCACHE_API_PREFIXES") {
            config.api_prefixes = split_list(&prefixes);
        }
        if let Ok(manifest) = std::env::var("OFFCACHE_STATIC_MANIFEST") {
            config.static_manifest = split_list(&manifest);
        }

        config.validate()?;

        Ok(config)
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
