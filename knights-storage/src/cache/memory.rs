//! In-process cache store.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use knights_core::{CacheError, KnightsResult};

use super::{CacheKey, CacheStats, CacheStore};

fn poisoned() -> CacheError {
    CacheError::Backend {
        reason: "cache lock poisoned".to_string(),
    }
}

/// `HashMap`-backed cache with hit/miss accounting.
#[derive(Debug, Default)]
pub struct InMemoryCacheStore {
    entries: RwLock<HashMap<String, String>>,
    stats: RwLock<CacheStats>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when `key` currently holds a value.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries
            .read()
            .map(|entries| entries.contains_key(&key.encode()))
            .unwrap_or(false)
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn record(&self, hit: bool) {
        if let Ok(mut stats) = self.stats.write() {
            if hit {
                stats.hits += 1;
            } else {
                stats.misses += 1;
            }
        }
    }

    fn refresh_size(&self, entries: &HashMap<String, String>) {
        if let Ok(mut stats) = self.stats.write() {
            stats.entry_count = entries.len() as u64;
            stats.memory_bytes = entries
                .iter()
                .map(|(k, v)| (k.len() + v.len()) as u64)
                .sum();
        }
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &CacheKey) -> KnightsResult<Option<String>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        let value = entries.get(&key.encode()).cloned();
        self.record(value.is_some());
        Ok(value)
    }

    async fn set(&self, key: &CacheKey, value: String) -> KnightsResult<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.insert(key.encode(), value);
        self.refresh_size(&entries);
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> KnightsResult<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        if entries.remove(&key.encode()).is_some() {
            self.refresh_size(&entries);
        }
        Ok(())
    }

    fn stats(&self) -> CacheStats {
        self.stats.read().map(|s| s.clone()).unwrap_or_default()
    }
}
