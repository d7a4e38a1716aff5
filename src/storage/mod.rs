//! Persistence layer.
//!
//! Two JSON files on disk: the snapshot cache (so restarts within the
//! TTL skip the network entirely) and the user preferences (favorites
//! and hidden items). Both are small and rewritten wholesale.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::types::{MarketSnapshot, Prefs};

/// Default file paths, overridable via configuration.
const DEFAULT_CACHE_FILE: &str = "flipscan_cache.json";
const DEFAULT_PREFS_FILE: &str = "flipscan_prefs.json";

// ---------------------------------------------------------------------------
// Snapshot cache
// ---------------------------------------------------------------------------

/// A fetched snapshot together with its fetch time, for TTL checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedSnapshot {
    pub fetched_at: DateTime<Utc>,
    pub snapshot: MarketSnapshot,
}

impl CachedSnapshot {
    pub fn new(snapshot: MarketSnapshot) -> Self {
        Self {
            fetched_at: Utc::now(),
            snapshot,
        }
    }

    pub fn is_fresh(&self, ttl: std::time::Duration, now: DateTime<Utc>) -> bool {
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => now - self.fetched_at < ttl,
            Err(_) => false,
        }
    }
}

/// Save a fetched snapshot to the cache file.
pub fn save_cache(cached: &CachedSnapshot, path: Option<&str>) -> Result<()> {
    let path = path.unwrap_or(DEFAULT_CACHE_FILE);
    let json = serde_json::to_string(cached).context("Failed to serialise snapshot cache")?;

    std::fs::write(path, &json).context(format!("Failed to write cache to {path}"))?;

    debug!(path, fetched_at = %cached.fetched_at, "Snapshot cache saved");
    Ok(())
}

/// Load the cached snapshot, if any.
/// Returns None when the file doesn't exist; a corrupt cache file is
/// discarded with a warning rather than failing startup.
pub fn load_cache(path: Option<&str>) -> Result<Option<CachedSnapshot>> {
    let path = path.unwrap_or(DEFAULT_CACHE_FILE);

    if !Path::new(path).exists() {
        info!(path, "No snapshot cache found");
        return Ok(None);
    }

    let json =
        std::fs::read_to_string(path).context(format!("Failed to read cache from {path}"))?;

    match serde_json::from_str::<CachedSnapshot>(&json) {
        Ok(cached) => {
            info!(path, fetched_at = %cached.fetched_at, "Snapshot cache loaded");
            Ok(Some(cached))
        }
        Err(err) => {
            warn!(path, %err, "Discarding corrupt snapshot cache");
            delete_cache(Some(path))?;
            Ok(None)
        }
    }
}

/// Delete the cache file (for testing or forced refresh).
pub fn delete_cache(path: Option<&str>) -> Result<()> {
    let path = path.unwrap_or(DEFAULT_CACHE_FILE);
    if Path::new(path).exists() {
        std::fs::remove_file(path).context(format!("Failed to delete cache file {path}"))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Preferences
// ---------------------------------------------------------------------------

/// Save user preferences to a JSON file.
pub fn save_prefs(prefs: &Prefs, path: Option<&str>) -> Result<()> {
    let path = path.unwrap_or(DEFAULT_PREFS_FILE);
    let json = serde_json::to_string_pretty(prefs).context("Failed to serialise preferences")?;

    std::fs::write(path, &json).context(format!("Failed to write preferences to {path}"))?;

    debug!(
        path,
        favorites = prefs.favorites.len(),
        hidden = prefs.hidden.len(),
        "Preferences saved"
    );
    Ok(())
}

/// Load user preferences from a JSON file.
/// Returns defaults if the file doesn't exist (fresh start).
pub fn load_prefs(path: Option<&str>) -> Result<Prefs> {
    let path = path.unwrap_or(DEFAULT_PREFS_FILE);

    if !Path::new(path).exists() {
        info!(path, "No saved preferences found, starting fresh");
        return Ok(Prefs::default());
    }

    let json =
        std::fs::read_to_string(path).context(format!("Failed to read preferences from {path}"))?;

    let prefs: Prefs =
        serde_json::from_str(&json).context(format!("Failed to parse preferences from {path}"))?;

    info!(
        path,
        favorites = prefs.favorites.len(),
        hidden = prefs.hidden.len(),
        "Preferences loaded from disk"
    );

    Ok(prefs)
}

/// Delete the preferences file (for testing or reset).
pub fn delete_prefs(path: Option<&str>) -> Result<()> {
    let path = path.unwrap_or(DEFAULT_PREFS_FILE);
    if Path::new(path).exists() {
        std::fs::remove_file(path).context(format!("Failed to delete preferences file {path}"))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MarketSnapshot, TraderNode};

    fn temp_path(tag: &str) -> String {
        let mut p = std::env::temp_dir();
        p.push(format!("flipscan_test_{tag}_{}.json", uuid::Uuid::new_v4()));
        p.to_string_lossy().to_string()
    }

    fn sample_snapshot() -> MarketSnapshot {
        MarketSnapshot {
            currencies: Vec::new(),
            traders: vec![TraderNode {
                name: "prapor".to_string(),
                reset_time: "2026-08-30T12:00:00Z".parse().ok(),
                cash_offers: Vec::new(),
            }],
            barters: Vec::new(),
        }
    }

    #[test]
    fn test_cache_save_and_load() {
        let path = temp_path("cache");
        let cached = CachedSnapshot::new(sample_snapshot());
        save_cache(&cached, Some(&path)).unwrap();

        let loaded = load_cache(Some(&path)).unwrap().unwrap();
        assert_eq!(loaded.snapshot.traders.len(), 1);
        assert_eq!(loaded.snapshot.traders[0].name, "prapor");
        assert_eq!(loaded.fetched_at, cached.fetched_at);

        delete_cache(Some(&path)).unwrap();
    }

    #[test]
    fn test_cache_load_nonexistent() {
        let loaded = load_cache(Some("/tmp/flipscan_nonexistent_cache_12345.json")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_cache_corrupt_file_discarded() {
        let path = temp_path("corrupt");
        std::fs::write(&path, "{not json").unwrap();

        let loaded = load_cache(Some(&path)).unwrap();
        assert!(loaded.is_none());
        assert!(!Path::new(&path).exists());
    }

    #[test]
    fn test_cache_freshness() {
        let ttl = std::time::Duration::from_secs(300);
        let cached = CachedSnapshot {
            fetched_at: Utc::now(),
            snapshot: sample_snapshot(),
        };
        assert!(cached.is_fresh(ttl, cached.fetched_at + chrono::Duration::seconds(299)));
        assert!(!cached.is_fresh(ttl, cached.fetched_at + chrono::Duration::seconds(301)));
    }

    #[test]
    fn test_prefs_save_and_load() {
        let path = temp_path("prefs");
        let mut prefs = Prefs::default();
        prefs.favorites.insert("Gold chain".to_string());
        prefs.hidden.insert("Bolts".to_string());

        save_prefs(&prefs, Some(&path)).unwrap();
        let loaded = load_prefs(Some(&path)).unwrap();

        assert!(loaded.favorites.contains("Gold chain"));
        assert!(loaded.hidden.contains("Bolts"));

        delete_prefs(Some(&path)).unwrap();
    }

    #[test]
    fn test_prefs_load_nonexistent_defaults() {
        let prefs = load_prefs(Some("/tmp/flipscan_nonexistent_prefs_12345.json")).unwrap();
        assert!(prefs.favorites.is_empty());
        assert!(prefs.hidden.is_empty());
    }

    #[test]
    fn test_delete_nonexistent_ok() {
        assert!(delete_cache(Some("/tmp/flipscan_does_not_exist_xyz.json")).is_ok());
        assert!(delete_prefs(Some("/tmp/flipscan_does_not_exist_xyz.json")).is_ok());
    }
}
