//! Knights Storage - Store Contracts and Implementations
//!
//! Defines the async contracts the record service consumes (primary store,
//! hall-of-heroes archive, cache store) together with in-memory and LMDB
//! implementations of them.

pub mod cache;
pub mod lmdb;
pub mod memory;

pub use cache::{CacheKey, CacheStats, CacheStore, InMemoryCacheStore, ALL_KNIGHTS_KEY};
pub use lmdb::{LmdbDocumentStore, LmdbStoreError};
pub use memory::{InMemoryHeroArchive, InMemoryKnightStore};

use async_trait::async_trait;
use knights_core::{Hero, Knight, KnightId, KnightsResult, NewKnight};

// ============================================================================
// PRIMARY STORE
// ============================================================================

/// Document store for live knights.
///
/// "Not found" is reported as `Ok(None)`; turning it into an error is the
/// caller's decision.
#[async_trait]
pub trait KnightStore: Send + Sync {
    /// Insert a new knight, assigning its id and timestamps.
    async fn create(&self, knight: NewKnight) -> KnightsResult<Knight>;

    /// All knights, oldest first.
    async fn find_all(&self) -> KnightsResult<Vec<Knight>>;

    /// Get a knight by id.
    async fn find_by_id(&self, id: KnightId) -> KnightsResult<Option<Knight>>;

    /// Replace the stored document and return the new value.
    ///
    /// Keeps the stored `created_at`, stamps `updated_at`. Returns `None`
    /// when the id no longer exists at write time.
    async fn find_by_id_and_replace(
        &self,
        id: KnightId,
        knight: Knight,
    ) -> KnightsResult<Option<Knight>>;

    /// Delete a knight and return its last stored value.
    async fn find_by_id_and_delete(&self, id: KnightId) -> KnightsResult<Option<Knight>>;
}

// ============================================================================
// HALL OF HEROES
// ============================================================================

/// Append-only archive of deleted knights.
#[async_trait]
pub trait HeroArchive: Send + Sync {
    /// Append a snapshot verbatim.
    async fn create(&self, hero: Hero) -> KnightsResult<Hero>;

    /// Every archived snapshot, in archival order.
    async fn find_all(&self) -> KnightsResult<Vec<Hero>>;
}
