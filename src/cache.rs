//! Local response cache
//!
//! Small JSON key-value store for catalogue and info responses. Entries expire
//! after a TTL and the store is trimmed to a fixed number of entries, oldest
//! first, on every write.
//! Stored at ~/.cache/anistream/cache.json

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_MAX_ENTRIES: usize = 200;
pub const DEFAULT_TTL_SECS: i64 = 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    stored_at: DateTime<Utc>,
    value: serde_json::Value,
}

/// TTL + size-bounded key-value cache
#[derive(Debug)]
pub struct LocalCache {
    path: Option<PathBuf>,
    max_entries: usize,
    ttl: Duration,
    entries: BTreeMap<String, CacheEntry>,
}

impl LocalCache {
    /// Default cache file path
    pub fn default_path() -> Option<PathBuf> {
        dirs::cache_dir().map(|p| p.join("anistream").join("cache.json"))
    }

    /// Load the cache file; an unreadable file starts an empty cache
    pub fn open(path: impl AsRef<Path>, max_entries: usize, ttl_secs: i64) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = std::fs::read_to_string(&path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();

        Self {
            path: Some(path),
            max_entries: max_entries.max(1),
            ttl: Duration::seconds(ttl_secs.max(0)),
            entries,
        }
    }

    /// Cache that never touches disk
    pub fn in_memory(max_entries: usize, ttl_secs: i64) -> Self {
        Self {
            path: None,
            max_entries: max_entries.max(1),
            ttl: Duration::seconds(ttl_secs.max(0)),
            entries: BTreeMap::new(),
        }
    }

    /// Build a cache key from its parts, e.g. `["search", "frieren", "1"]`
    pub fn key(parts: &[&str]) -> String {
        parts
            .iter()
            .map(|p| p.trim().to_lowercase())
            .collect::<Vec<_>>()
            .join(":")
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fresh value for `key`, if any
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get_at(key, Utc::now())
    }

    fn get_at<T: DeserializeOwned>(&self, key: &str, now: DateTime<Utc>) -> Option<T> {
        let entry = self.entries.get(key)?;
        if now - entry.stored_at > self.ttl {
            debug!(key, "cache entry expired");
            return None;
        }
        serde_json::from_value(entry.value.clone()).ok()
    }

    /// Store a value, trim, and write the file
    pub fn put<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        self.put_at(key, value, Utc::now())?;
        self.save()
    }

    fn put_at<T: Serialize>(&mut self, key: &str, value: &T, now: DateTime<Utc>) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                stored_at: now,
                value,
            },
        );
        self.trim(now);
        Ok(())
    }

    /// Drop expired entries, then the oldest ones beyond capacity
    fn trim(&mut self, now: DateTime<Utc>) {
        let ttl = self.ttl;
        self.entries.retain(|_, e| now - e.stored_at <= ttl);

        while self.entries.len() > self.max_entries {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, e)| e.stored_at)
                .map(|(k, _)| k.clone());
            match oldest {
                Some(key) => {
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }

    /// Write the cache file (no-op for in-memory caches)
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string(&self.entries)?)?;
        Ok(())
    }

    pub fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_normalized() {
        assert_eq!(LocalCache::key(&["Search", " Frieren ", "1"]), "search:frieren:1");
    }

    #[test]
    fn test_roundtrip_fresh_value() {
        let mut cache = LocalCache::in_memory(10, 60);
        cache.put("a", &vec!["x".to_string()]).unwrap();
        let got: Option<Vec<String>> = cache.get("a");
        assert_eq!(got, Some(vec!["x".to_string()]));
        assert!(cache.get::<Vec<String>>("missing").is_none());
    }

    #[test]
    fn test_expired_value_hidden() {
        let mut cache = LocalCache::in_memory(10, 60);
        let then = Utc::now() - Duration::seconds(120);
        cache.put_at("old", &1u32, then).unwrap();
        assert_eq!(cache.get_at::<u32>("old", then), Some(1));
        assert!(cache.get::<u32>("old").is_none());
    }

    #[test]
    fn test_trim_evicts_oldest() {
        let mut cache = LocalCache::in_memory(2, 3600);
        let base = Utc::now();
        cache.put_at("first", &1u32, base - Duration::seconds(30)).unwrap();
        cache.put_at("second", &2u32, base - Duration::seconds(20)).unwrap();
        cache.put_at("third", &3u32, base - Duration::seconds(10)).unwrap();
        assert_eq!(cache.len(), 2);
        assert!(cache.get::<u32>("first").is_none());
        assert_eq!(cache.get::<u32>("third"), Some(3));
    }

    #[test]
    fn test_wrong_type_is_miss() {
        let mut cache = LocalCache::in_memory(10, 60);
        cache.put("n", &"text").unwrap();
        assert!(cache.get::<u32>("n").is_none());
    }
}
