//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Every section and key has a default, so a partial file (or no file
//! at all) still yields a runnable configuration.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub cache: CacheConfig,
    pub prefs: PrefsConfig,
    pub scheduler: SchedulerConfig,
    pub evaluation: EvaluationConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ApiConfig {
    pub url: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: "https://api.tarkov.dev/graphql".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub path: String,
    /// Snapshot freshness window; a cached snapshot younger than this
    /// is served instead of hitting the API.
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: "flipscan_cache.json".to_string(),
            ttl_secs: 300,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PrefsConfig {
    pub path: String,
}

impl Default for PrefsConfig {
    fn default() -> Self {
        Self {
            path: "flipscan_prefs.json".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Countdown/reset-check cadence.
    pub tick_interval_secs: u64,
    /// Global minimum spacing between reset-triggered silent refreshes.
    pub refresh_debounce_secs: u64,
    /// Quiet period before a parameter change triggers re-evaluation.
    pub input_debounce_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 1,
            refresh_debounce_secs: 60,
            input_debounce_ms: 300,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EvaluationConfig {
    pub player_level: i64,
    pub min_profit: i64,
    /// "total", "unit", "roi", or "cost".
    pub sort: String,
    /// Restrict to a single trader; absent means all.
    pub trader: Option<String>,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            player_level: 71,
            min_profit: 0,
            sort: "total".to_string(),
            trader: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Load configuration, falling back to defaults when the file is
    /// absent. A present-but-invalid file is still an error.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            info!(path, "No config file found, using defaults");
            Ok(Self::default())
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let raw = r#"
            [api]
            url = "https://example.test/graphql"
            timeout_secs = 10

            [cache]
            path = "/tmp/cache.json"
            ttl_secs = 120

            [prefs]
            path = "/tmp/prefs.json"

            [scheduler]
            tick_interval_secs = 2
            refresh_debounce_secs = 90
            input_debounce_ms = 250

            [evaluation]
            player_level = 42
            min_profit = 5000
            sort = "roi"
            trader = "therapist"
        "#;
        let config: AppConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.api.url, "https://example.test/graphql");
        assert_eq!(config.cache.ttl_secs, 120);
        assert_eq!(config.scheduler.refresh_debounce_secs, 90);
        assert_eq!(config.evaluation.player_level, 42);
        assert_eq!(config.evaluation.trader.as_deref(), Some("therapist"));
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let raw = r#"
            [evaluation]
            min_profit = 10000
        "#;
        let config: AppConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.evaluation.min_profit, 10_000);
        assert_eq!(config.evaluation.player_level, 71);
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.scheduler.input_debounce_ms, 300);
    }

    #[test]
    fn test_empty_config_is_valid() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.cache.ttl_secs, 300);
        assert_eq!(config.evaluation.sort, "total");
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = AppConfig::load_or_default("/tmp/flipscan_no_such_config.toml").unwrap();
        assert_eq!(config.scheduler.tick_interval_secs, 1);
    }
}
