//! Engine configuration with layered loading.
//!
//! Loading precedence (highest wins):
//! 1. Environment variables (WAYFINDER_*)
//! 2. TOML config file (if WAYFINDER_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! Each cache domain carries its own strongly-typed record; values are
//! validated once at load time, never re-checked on the hot path.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::snapshot::Domain;

mod validation;

pub use validation::ConfigError;

/// Per-domain cache tuning.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DomainConfig {
    /// Whether caching is active for this domain. When disabled the
    /// resolver skips CACHE_LOOKUP and never writes back.
    pub enabled: bool,
    /// Entry lifetime in seconds; expiry is checked before similarity.
    pub ttl_secs: i64,
    /// Minimum fingerprint similarity for a stored entry to count as valid.
    pub similarity_threshold: f64,
    /// Capacity bound; overflow evicts least-recently-used entries.
    pub max_entries: usize,
}

impl DomainConfig {
    fn new(ttl_secs: i64, similarity_threshold: f64, max_entries: usize) -> Self {
        DomainConfig { enabled: true, ttl_secs, similarity_threshold, max_entries }
    }
}

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite cache database.
    ///
    /// Set via WAYFINDER_DB_PATH.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Fallback language for normalization and dictionaries when a page's
    /// language is unknown or has no shipped tables.
    ///
    /// Set via WAYFINDER_DEFAULT_LANGUAGE.
    #[serde(default = "default_language")]
    pub default_language: String,

    /// Deadline for one AI adapter round trip, in milliseconds.
    ///
    /// Set via WAYFINDER_AI_TIMEOUT_MS.
    #[serde(default = "default_ai_timeout_ms")]
    pub ai_timeout_ms: u64,

    /// When the AI adapter fails, the best non-AI candidate is still
    /// offered if it scored at least this much.
    ///
    /// Set via WAYFINDER_PARTIAL_THRESHOLD.
    #[serde(default = "default_partial_threshold")]
    pub partial_threshold: f64,

    /// Action-mapping cache tuning (WAYFINDER_ACTION__*).
    #[serde(default = "default_action")]
    pub action: DomainConfig,

    /// Description cache tuning (WAYFINDER_DESCRIBE__*).
    #[serde(default = "default_describe")]
    pub describe: DomainConfig,

    /// Summary cache tuning (WAYFINDER_SUMMARIZE__*).
    #[serde(default = "default_summarize")]
    pub summarize: DomainConfig,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./wayfinder-cache.sqlite")
}

fn default_language() -> String {
    "en".into()
}

fn default_ai_timeout_ms() -> u64 {
    15_000
}

fn default_partial_threshold() -> f64 {
    0.5
}

fn default_action() -> DomainConfig {
    DomainConfig::new(7 * 86_400, 0.80, 512)
}

fn default_describe() -> DomainConfig {
    DomainConfig::new(7 * 86_400, 0.85, 256)
}

fn default_summarize() -> DomainConfig {
    DomainConfig::new(14 * 86_400, 0.90, 256)
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            default_language: default_language(),
            ai_timeout_ms: default_ai_timeout_ms(),
            partial_threshold: default_partial_threshold(),
            action: default_action(),
            describe: default_describe(),
            summarize: default_summarize(),
        }
    }
}

impl AppConfig {
    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a source cannot be read or validation
    /// fails after merging.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("WAYFINDER_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("WAYFINDER_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Tuning record for one cache domain.
    pub fn domain(&self, domain: Domain) -> &DomainConfig {
        match domain {
            Domain::Action => &self.action,
            Domain::Describe => &self.describe,
            Domain::Summarize => &self.summarize,
        }
    }

    /// AI deadline as a Duration for use with tokio.
    pub fn ai_timeout(&self) -> Duration {
        Duration::from_millis(self.ai_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./wayfinder-cache.sqlite"));
        assert_eq!(config.default_language, "en");
        assert_eq!(config.ai_timeout_ms, 15_000);
        assert_eq!(config.partial_threshold, 0.5);
        assert_eq!(config.action.similarity_threshold, 0.80);
        assert_eq!(config.describe.similarity_threshold, 0.85);
        assert_eq!(config.summarize.similarity_threshold, 0.90);
        assert!(config.action.enabled && config.describe.enabled && config.summarize.enabled);
    }

    #[test]
    fn test_domain_lookup() {
        let config = AppConfig::default();
        assert_eq!(config.domain(Domain::Action).max_entries, 512);
        assert_eq!(config.domain(Domain::Summarize).ttl_secs, 14 * 86_400);
    }

    #[test]
    fn test_ai_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.ai_timeout(), Duration::from_millis(15_000));
    }
}
