//! Configuration validation rules.
//!
//! This module provides validation logic for `WorkerConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::WorkerConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl WorkerConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - either cache name is empty, or both are the same
    /// - `origin` is not an absolute http(s) URL
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `install_concurrency` is 0
    /// - `user_agent` or `root_document` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("static_cache_name", &self.static_cache_name),
            ("dynamic_cache_name", &self.dynamic_cache_name),
            ("user_agent", &self.user_agent),
            ("root_document", &self.root_document),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid { field: field.into(), reason: "must not be empty".into() });
            }
        }

        if self.static_cache_name == self.dynamic_cache_name {
            return Err(ConfigError::Invalid {
                field: "dynamic_cache_name".into(),
                reason: "must differ from static_cache_name".into(),
            });
        }

        self.origin_url()?;

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

        if self.install_concurrency == 0 {
            return Err(ConfigError::Invalid {
                field: "install_concurrency".into(),
                reason: "must be at least 1".into(),
            });
        }

        if self.exclude_patterns.iter().any(|p| p.is_empty()) {
            tracing::warn!("exclude_patterns contains an empty pattern; every request will bypass the cache");
        }

        Ok(())
    }
}
