//! Cache contract for the cache-aside protocol.
//!
//! The cache is an opaque string key-value store. Values are JSON strings
//! produced and parsed by the record service; the store never interprets
//! them. There is no TTL: entries live until explicitly deleted.

mod keys;
mod memory;
mod traits;

pub use keys::{CacheKey, ALL_KNIGHTS_KEY, KNIGHT_KEY_PREFIX};
pub use memory::InMemoryCacheStore;
pub use traits::{CacheStats, CacheStore};
