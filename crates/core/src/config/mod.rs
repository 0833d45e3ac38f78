//! Worker configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (HAVEN_*)
//! 2. TOML config file (if HAVEN_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! The loaded value is immutable; the worker shares it behind an `Arc`.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

mod validation;

pub use validation::ConfigError;

/// Worker configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (HAVEN_*, `__` separates nested keys)
/// 2. TOML config file (if HAVEN_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Path to the SQLite database holding every cache store.
    ///
    /// Set via HAVEN_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin of the application the worker serves.
    ///
    /// Relative request URLs resolve against it and responses from it are
    /// classified as same-origin.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Version tag of the pre-populated store.
    #[serde(default = "default_static_cache_name")]
    pub static_cache_name: String,

    /// Version tag of the runtime store. Reported by `GET_VERSION`.
    #[serde(default = "default_dynamic_cache_name")]
    pub dynamic_cache_name: String,

    /// URLs fetched and stored at install time. `/` is always skipped.
    #[serde(default = "default_precache_manifest")]
    pub precache_manifest: Vec<String>,

    /// Substrings that keep a request away from the cache entirely.
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,

    /// Substrings that make a fresh network response worth storing.
    #[serde(default = "default_cacheable_patterns")]
    pub cacheable_patterns: Vec<String>,

    /// Document served to failed navigations before the offline page.
    #[serde(default = "default_root_document")]
    pub root_document: String,

    /// Background sync tag that triggers backup reconciliation.
    #[serde(default = "default_sync_tag")]
    pub sync_tag: String,

    /// Host storage key holding the backup records.
    #[serde(default = "default_backup_storage_key")]
    pub backup_storage_key: String,

    /// User-Agent string for network requests.
    ///
    /// Set via HAVEN_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via HAVEN_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to read per response.
    ///
    /// Set via HAVEN_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Concurrent manifest fetches during install.
    #[serde(default = "default_install_concurrency")]
    pub install_concurrency: usize,

    /// Push notification presentation.
    #[serde(default)]
    pub notification: NotificationConfig,
}

/// Fixed presentation of push notifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_notification_title")]
    pub title: String,

    /// Body used when the push carries no payload.
    #[serde(default = "default_notification_body")]
    pub default_body: String,

    #[serde(default = "default_icon")]
    pub icon: String,

    #[serde(default = "default_icon")]
    pub badge: String,

    #[serde(default = "default_vibrate")]
    pub vibrate: Vec<u32>,

    /// Window opened or focused by the primary action.
    #[serde(default = "default_app_url")]
    pub app_url: String,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./haven-cache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_static_cache_name() -> String {
    "request-system-static-v1.0.0".into()
}

fn default_dynamic_cache_name() -> String {
    "request-system-v1.0.0".into()
}

fn default_precache_manifest() -> Vec<String> {
    [
        "/",
        "/index.html",
        "/manifest.json",
        "https://www.gstatic.com/firebasejs/10.7.1/firebase-app.js",
        "https://www.gstatic.com/firebasejs/10.7.1/firebase-firestore.js",
        "https://www.gstatic.com/firebasejs/10.7.1/firebase-auth.js",
        "https://unpkg.com/xlsx@0.18.5/dist/xlsx.full.min.js",
        "/icon-192.png",
        "/icon-512.png",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_exclude_patterns() -> Vec<String> {
    vec!["/admin".into(), "firebase".into(), "firestore".into()]
}

fn default_cacheable_patterns() -> Vec<String> {
    vec![".html".into(), ".js".into(), ".css".into(), "firebase".into()]
}

fn default_root_document() -> String {
    "/index.html".into()
}

fn default_sync_tag() -> String {
    "background-sync".into()
}

fn default_backup_storage_key() -> String {
    "requests_backup".into()
}

fn default_user_agent() -> String {
    "haven-worker/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    10_485_760 // 10MB
}

fn default_install_concurrency() -> usize {
    4
}

fn default_notification_title() -> String {
    "Request Manager".into()
}

fn default_notification_body() -> String {
    "A new request has been registered.".into()
}

fn default_icon() -> String {
    "/icon-192.png".into()
}

fn default_vibrate() -> Vec<u32> {
    vec![200, 100, 200]
}

fn default_app_url() -> String {
    "/".into()
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            title: default_notification_title(),
            default_body: default_notification_body(),
            icon: default_icon(),
            badge: default_icon(),
            vibrate: default_vibrate(),
            app_url: default_app_url(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            static_cache_name: default_static_cache_name(),
            dynamic_cache_name: default_dynamic_cache_name(),
            precache_manifest: default_precache_manifest(),
            exclude_patterns: default_exclude_patterns(),
            cacheable_patterns: default_cacheable_patterns(),
            root_document: default_root_document(),
            sync_tag: default_sync_tag(),
            backup_storage_key: default_backup_storage_key(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            install_concurrency: default_install_concurrency(),
            notification: NotificationConfig::default(),
        }
    }
}

impl WorkerConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The parsed application origin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `origin` is not an absolute http(s) URL.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(ConfigError::Invalid { field: "origin".into(), reason: format!("unsupported scheme {scheme}") }),
        }
    }

    /// Whether a store name is one of the two current version tags.
    pub fn is_current_cache(&self, name: &str) -> bool {
        name == self.static_cache_name || name == self.dynamic_cache_name
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `HAVEN_`
    /// 2. TOML file from `HAVEN_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("HAVEN_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("HAVEN_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
