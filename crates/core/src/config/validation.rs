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
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `app_id` is empty or contains whitespace
    /// - `generation` is 0
    /// - `origin` is not an http(s) URL
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `max_dynamic_entries` is 0
    /// - a manifest path or API prefix does not start with `/`
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app_id.is_empty() || self.app_id.chars().any(char::is_whitespace) {
            return Err(invalid("app_id", "must be non-empty without whitespace"));
        }

        if self.generation == 0 {
            return Err(invalid("generation", "must be at least 1"));
        }

        let origin = self.origin_url()?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(invalid("origin", format!("unsupported scheme: {}", origin.scheme())));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.max_dynamic_entries == 0 {
            return Err(invalid("max_dynamic_entries", "must be greater than 0"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if let Some(path) = self.static_manifest.iter().find(|p| !p.starts_with('/')) {
            return Err(invalid("static_manifest", format!("{path} is not root-relative")));
        }

        if let Some(prefix) = self.api_prefixes.iter().find(|p| !p.starts_with('/')) {
            return Err(invalid("api_prefixes", format!("{prefix} is not root-relative")));
        }

        if let Some(offline) = &self.offline_document
            && !self.static_manifest.contains(offline)
        {
            tracing::warn!(
                offline_document = %offline,
                "offline_document is not in static_manifest; it will only be served if cached at runtime"
            );
        }

        Ok(())
    }
}
