//! Configuration validation rules.
//!
//! Runs once after loading; the resolver and cache trust validated values.

use thiserror::Error;

use crate::config::{AppConfig, DomainConfig};

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - any domain's `ttl_secs` or `max_entries` is 0
    /// - any similarity threshold is outside `(0, 1]`
    /// - `partial_threshold` is outside `[0, 1)`
    /// - `ai_timeout_ms` is below 100ms or above 5 minutes
    /// - `default_language` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, domain) in [
            ("action", &self.action),
            ("describe", &self.describe),
            ("summarize", &self.summarize),
        ] {
            validate_domain(name, domain)?;
        }

        if !(0.0..1.0).contains(&self.partial_threshold) {
            return Err(invalid("partial_threshold", "must be in [0, 1)"));
        }

        if self.ai_timeout_ms < 100 {
            return Err(invalid("ai_timeout_ms", "must be at least 100ms"));
        }
        if self.ai_timeout_ms > 300_000 {
            return Err(invalid("ai_timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.default_language.trim().is_empty() {
            return Err(invalid("default_language", "must not be empty"));
        }

        if !self.action.enabled && !self.describe.enabled && !self.summarize.enabled {
            tracing::warn!("all cache domains are disabled; every resolution will bypass the store");
        }

        Ok(())
    }
}

fn validate_domain(name: &str, domain: &DomainConfig) -> Result<(), ConfigError> {
    if domain.ttl_secs < 1 {
        return Err(invalid(&format!("{name}.ttl_secs"), "must be at least 1 second"));
    }
    if !(0.0 < domain.similarity_threshold && domain.similarity_threshold <= 1.0) {
        return Err(invalid(&format!("{name}.similarity_threshold"), "must be in (0, 1]"));
    }
    if domain.max_entries == 0 {
        return Err(invalid(&format!("{name}.max_entries"), "must be at least 1"));
    }
    Ok(())
}
