//! Knight Service
//!
//! Record operations over the primary store, kept consistent with the cache
//! by cache-aside reads and invalidate-after-write mutations.
//!
//! # Cache protocol
//!
//! - Reads try the cache first. A present key is served as-is with no
//!   freshness check; a miss reads the store and populates the key.
//! - `create` drops `allKnights` before writing and never populates.
//! - `update` drops `allKnights` then `knight:{id}` after the replace.
//! - `remove` drops `knight:{id}` then `allKnights`, then archives.
//!
//! Nothing serializes a read's store fetch against a concurrent write, so a
//! reader can repopulate a key with data a writer has just invalidated.
//! Entries have no TTL; such a stale entry lives until the next mutation.

use std::sync::Arc;

use knights_core::{
    calculate_attack_and_experience, CacheError, Clock, CombatStats, Hero, Knight, KnightDraft,
    KnightId, KnightPatch, KnightsError, KnightsResult, NewKnight,
};
use knights_storage::{CacheKey, CacheStats, CacheStore, HeroArchive, KnightStore};
use serde::{de::DeserializeOwned, Serialize};

/// Encode a value for the cache.
fn to_cache_json<T: Serialize>(key: &CacheKey, value: &T) -> Result<String, CacheError> {
    serde_json::to_string(value).map_err(|e| CacheError::Serialization {
        key: key.encode(),
        reason: e.to_string(),
    })
}

/// Decode a cache hit. A value that does not parse is an error, not a miss.
fn from_cache_json<T: DeserializeOwned>(key: &CacheKey, raw: &str) -> Result<T, CacheError> {
    serde_json::from_str(raw).map_err(|e| CacheError::Deserialization {
        key: key.encode(),
        reason: e.to_string(),
    })
}

/// Record service for knights.
///
/// Handles are injected once and shared; the service holds no other state.
#[derive(Clone)]
pub struct KnightService {
    store: Arc<dyn KnightStore>,
    heroes: Arc<dyn HeroArchive>,
    cache: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
}

impl KnightService {
    pub fn new(
        store: Arc<dyn KnightStore>,
        heroes: Arc<dyn HeroArchive>,
        cache: Arc<dyn CacheStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            heroes,
            cache,
            clock,
        }
    }

    fn compute_stats(&self, draft: &KnightDraft) -> KnightsResult<CombatStats> {
        Ok(calculate_attack_and_experience(
            draft,
            self.clock.current_year(),
        )?)
    }

    async fn invalidate(&self, key: CacheKey) -> KnightsResult<()> {
        tracing::debug!(%key, "cache invalidate");
        self.cache.delete(&key).await
    }

    fn not_found(id: KnightId) -> KnightsError {
        tracing::warn!(%id, "knight not found");
        KnightsError::knight_not_found(id)
    }

    /// Create a knight.
    ///
    /// # Errors
    /// Returns a validation error if stats cannot be derived from `draft`.
    /// The `allKnights` entry is dropped even then.
    #[tracing::instrument(skip(self, draft), fields(name = %draft.name))]
    pub async fn create(&self, draft: KnightDraft) -> KnightsResult<Knight> {
        self.invalidate(CacheKey::AllKnights).await?;
        let stats = self.compute_stats(&draft)?;

        let knight = self.store.create(NewKnight { draft, stats }).await?;
        tracing::info!(
            id = %knight.id,
            attack = stats.attack,
            experience = stats.experience,
            "knight created"
        );
        Ok(knight)
    }

    /// All knights, served from `allKnights` when present.
    #[tracing::instrument(skip(self))]
    pub async fn find_all(&self) -> KnightsResult<Vec<Knight>> {
        let key = CacheKey::AllKnights;
        if let Some(raw) = self.cache.get(&key).await? {
            tracing::debug!(%key, "cache hit");
            return Ok(from_cache_json(&key, &raw)?);
        }

        tracing::debug!(%key, "cache miss");
        let knights = self.store.find_all().await?;
        self.cache.set(&key, to_cache_json(&key, &knights)?).await?;
        Ok(knights)
    }

    /// One knight, served from `knight:{id}` when present.
    ///
    /// # Errors
    /// Returns not-found if the id is absent from both cache and store.
    #[tracing::instrument(skip(self, id), fields(id = %id))]
    pub async fn find_one(&self, id: KnightId) -> KnightsResult<Knight> {
        let key = CacheKey::Knight(id);
        if let Some(raw) = self.cache.get(&key).await? {
            tracing::debug!(%key, "cache hit");
            return Ok(from_cache_json(&key, &raw)?);
        }

        tracing::debug!(%key, "cache miss");
        let knight = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| Self::not_found(id))?;
        self.cache.set(&key, to_cache_json(&key, &knight)?).await?;
        Ok(knight)
    }

    /// Merge `patch` over the stored knight and recompute its stats.
    ///
    /// # Errors
    /// Returns not-found, with no cache activity, if the id does not exist.
    /// Returns not-found if it vanishes before the replace lands.
    #[tracing::instrument(skip(self, id, patch), fields(id = %id))]
    pub async fn update(&self, id: KnightId, patch: KnightPatch) -> KnightsResult<Knight> {
        let existing = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| Self::not_found(id))?;

        let draft = patch.apply_to(existing.draft());
        let stats = self.compute_stats(&draft)?;
        let revised = existing.revise(draft, stats);

        let updated = self
            .store
            .find_by_id_and_replace(id, revised)
            .await?
            .ok_or_else(|| Self::not_found(id))?;

        self.invalidate(CacheKey::AllKnights).await?;
        self.invalidate(CacheKey::Knight(id)).await?;
        tracing::info!(
            attack = updated.attack,
            experience = updated.experience,
            "knight updated"
        );
        Ok(updated)
    }

    /// Delete a knight and archive it in the hall of heroes.
    ///
    /// # Errors
    /// Returns not-found if the id does not exist. An archive failure is
    /// returned after the delete has committed; the knight is then gone
    /// from both collections.
    #[tracing::instrument(skip(self, id), fields(id = %id))]
    pub async fn remove(&self, id: KnightId) -> KnightsResult<Knight> {
        let deleted = self
            .store
            .find_by_id_and_delete(id)
            .await?
            .ok_or_else(|| Self::not_found(id))?;

        self.invalidate(CacheKey::Knight(id)).await?;
        self.invalidate(CacheKey::AllKnights).await?;

        if let Err(err) = self.heroes.create(deleted.clone()).await {
            tracing::error!(error = %err, "archiving deleted knight failed");
            return Err(err);
        }
        tracing::info!("knight moved to hall of heroes");
        Ok(deleted)
    }

    /// Every archived knight. Not cached.
    #[tracing::instrument(skip(self))]
    pub async fn find_heroes(&self) -> KnightsResult<Vec<Hero>> {
        self.heroes.find_all().await
    }

    /// Statistics of the injected cache.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
