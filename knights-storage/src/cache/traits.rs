//! Cache store trait and statistics.

use async_trait::async_trait;
use knights_core::KnightsResult;

use super::CacheKey;

/// Key-value store consumed by the cache-aside protocol.
///
/// Implementations must be thread-safe. A `get` that finds the key returns
/// the stored string as-is, even if it is empty.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get the raw value under `key`.
    async fn get(&self, key: &CacheKey) -> KnightsResult<Option<String>>;

    /// Store `value` under `key`, overwriting any previous entry.
    async fn set(&self, key: &CacheKey, value: String) -> KnightsResult<()>;

    /// Remove `key`. Deleting an absent key is not an error.
    async fn delete(&self, key: &CacheKey) -> KnightsResult<()>;

    /// Usage statistics, when the implementation tracks them.
    fn stats(&self) -> CacheStats {
        CacheStats::default()
    }
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of entries currently in cache.
    pub entry_count: u64,
    /// Approximate size of stored values in bytes.
    pub memory_bytes: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
