//! In-memory stores.
//!
//! Back the development server and the test suites. Each store guards its
//! collection with a single `RwLock`, which gives per-document atomicity and
//! nothing more.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use knights_core::{Hero, Knight, KnightId, KnightsResult, NewKnight, StorageError};

use crate::{HeroArchive, KnightStore};

/// In-memory primary store. Ids are UUIDv7, so map order is creation order.
#[derive(Debug, Default)]
pub struct InMemoryKnightStore {
    knights: RwLock<BTreeMap<KnightId, Knight>>,
}

impl InMemoryKnightStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored knights.
    pub fn count(&self) -> KnightsResult<usize> {
        let knights = self.knights.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(knights.len())
    }

    /// Drop every stored knight.
    pub fn clear(&self) -> KnightsResult<()> {
        self.knights
            .write()
            .map_err(|_| StorageError::LockPoisoned)?
            .clear();
        Ok(())
    }
}

#[async_trait]
impl KnightStore for InMemoryKnightStore {
    async fn create(&self, knight: NewKnight) -> KnightsResult<Knight> {
        let knight = Knight::from_new(KnightId::now_v7(), knight, Utc::now());
        let mut knights = self.knights.write().map_err(|_| StorageError::LockPoisoned)?;
        knights.insert(knight.id, knight.clone());
        Ok(knight)
    }

    async fn find_all(&self) -> KnightsResult<Vec<Knight>> {
        let knights = self.knights.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(knights.values().cloned().collect())
    }

    async fn find_by_id(&self, id: KnightId) -> KnightsResult<Option<Knight>> {
        let knights = self.knights.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(knights.get(&id).cloned())
    }

    async fn find_by_id_and_replace(
        &self,
        id: KnightId,
        mut knight: Knight,
    ) -> KnightsResult<Option<Knight>> {
        let mut knights = self.knights.write().map_err(|_| StorageError::LockPoisoned)?;
        let Some(stored) = knights.get_mut(&id) else {
            return Ok(None);
        };

        knight.id = id;
        knight.created_at = stored.created_at;
        knight.updated_at = Utc::now();
        *stored = knight.clone();
        Ok(Some(knight))
    }

    async fn find_by_id_and_delete(&self, id: KnightId) -> KnightsResult<Option<Knight>> {
        let mut knights = self.knights.write().map_err(|_| StorageError::LockPoisoned)?;
        Ok(knights.remove(&id))
    }
}

/// In-memory hall of heroes.
#[derive(Debug, Default)]
pub struct InMemoryHeroArchive {
    heroes: RwLock<Vec<Hero>>,
}

impl InMemoryHeroArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of archived snapshots.
    pub fn count(&self) -> KnightsResult<usize> {
        let heroes = self.heroes.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(heroes.len())
    }
}

#[async_trait]
impl HeroArchive for InMemoryHeroArchive {
    async fn create(&self, hero: Hero) -> KnightsResult<Hero> {
        let mut heroes = self.heroes.write().map_err(|_| StorageError::LockPoisoned)?;
        heroes.push(hero.clone());
        Ok(hero)
    }

    async fn find_all(&self) -> KnightsResult<Vec<Hero>> {
        let heroes = self.heroes.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(heroes.clone())
    }
}
