//! Knights Test Utilities
//!
//! Shared test infrastructure for the knights workspace:
//! - Instrumented store and cache wrappers
//! - Proptest generators for knight payloads
//! - Fixtures for common scenarios
//! - Assertions on `KnightsResult`

pub use knights_storage::{
    CacheKey, CacheStats, CacheStore, HeroArchive, InMemoryCacheStore, InMemoryHeroArchive,
    InMemoryKnightStore, KnightStore,
};

pub use knights_core::{
    Ability, Attributes, CombatStats, EntityType, FixedClock, Hero, Knight, KnightDraft,
    KnightId, KnightPatch, KnightsError, KnightsResult, NewKnight, StorageError,
    ValidationError, Weapon,
};

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

// ============================================================================
// INSTRUMENTED STORES
// ============================================================================

/// One call observed by [`RecordingCacheStore`], with the wire key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheOp {
    Get(String),
    Set(String),
    Delete(String),
}

/// Cache that logs every call before delegating to an in-memory store.
///
/// Lets tests assert the exact order of invalidations a mutation performs.
#[derive(Debug, Default)]
pub struct RecordingCacheStore {
    inner: InMemoryCacheStore,
    ops: Mutex<Vec<CacheOp>>,
}

impl RecordingCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls seen so far, oldest first.
    pub fn ops(&self) -> Vec<CacheOp> {
        self.ops.lock().map(|ops| ops.clone()).unwrap_or_default()
    }

    /// Forget the recorded calls. Cached values are kept.
    pub fn clear_ops(&self) {
        if let Ok(mut ops) = self.ops.lock() {
            ops.clear();
        }
    }

    /// Only the writes (sets and deletes), oldest first.
    pub fn mutations(&self) -> Vec<CacheOp> {
        self.ops()
            .into_iter()
            .filter(|op| !matches!(op, CacheOp::Get(_)))
            .collect()
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.inner.contains(key)
    }

    fn push(&self, op: CacheOp) {
        if let Ok(mut ops) = self.ops.lock() {
            ops.push(op);
        }
    }
}

#[async_trait]
impl CacheStore for RecordingCacheStore {
    async fn get(&self, key: &CacheKey) -> KnightsResult<Option<String>> {
        self.push(CacheOp::Get(key.encode()));
        self.inner.get(key).await
    }

    async fn set(&self, key: &CacheKey, value: String) -> KnightsResult<()> {
        self.push(CacheOp::Set(key.encode()));
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &CacheKey) -> KnightsResult<()> {
        self.push(CacheOp::Delete(key.encode()));
        self.inner.delete(key).await
    }

    fn stats(&self) -> CacheStats {
        self.inner.stats()
    }
}

/// Knight store whose `find_all` can be paused between reading its snapshot
/// and returning it.
///
/// Used to reproduce interleavings deterministically: arm the gate, start a
/// reader, wait for [`GatedKnightStore::snapshot_taken`], mutate, then
/// [`GatedKnightStore::release`].
#[derive(Debug, Default)]
pub struct GatedKnightStore {
    inner: InMemoryKnightStore,
    armed: AtomicBool,
    snapshot_taken: Notify,
    release: Notify,
}

impl GatedKnightStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pause the next `find_all` after it has read the store.
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Resolves once a gated `find_all` holds its snapshot.
    pub async fn snapshot_taken(&self) {
        self.snapshot_taken.notified().await;
    }

    /// Let the paused `find_all` return.
    pub fn release(&self) {
        self.release.notify_one();
    }

    pub fn count(&self) -> KnightsResult<usize> {
        self.inner.count()
    }
}

#[async_trait]
impl KnightStore for GatedKnightStore {
    async fn create(&self, knight: NewKnight) -> KnightsResult<Knight> {
        self.inner.create(knight).await
    }

    async fn find_all(&self) -> KnightsResult<Vec<Knight>> {
        let snapshot = self.inner.find_all().await?;
        if self.armed.swap(false, Ordering::SeqCst) {
            self.snapshot_taken.notify_one();
            self.release.notified().await;
        }
        Ok(snapshot)
    }

    async fn find_by_id(&self, id: KnightId) -> KnightsResult<Option<Knight>> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_id_and_replace(
        &self,
        id: KnightId,
        knight: Knight,
    ) -> KnightsResult<Option<Knight>> {
        self.inner.find_by_id_and_replace(id, knight).await
    }

    async fn find_by_id_and_delete(&self, id: KnightId) -> KnightsResult<Option<Knight>> {
        self.inner.find_by_id_and_delete(id).await
    }
}

/// Knight store that counts reads reaching it.
#[derive(Debug, Default)]
pub struct CountingKnightStore {
    inner: InMemoryKnightStore,
    find_all_calls: AtomicUsize,
    find_by_id_calls: AtomicUsize,
}

impl CountingKnightStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_all_calls(&self) -> usize {
        self.find_all_calls.load(Ordering::SeqCst)
    }

    pub fn find_by_id_calls(&self) -> usize {
        self.find_by_id_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KnightStore for CountingKnightStore {
    async fn create(&self, knight: NewKnight) -> KnightsResult<Knight> {
        self.inner.create(knight).await
    }

    async fn find_all(&self) -> KnightsResult<Vec<Knight>> {
        self.find_all_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.find_all().await
    }

    async fn find_by_id(&self, id: KnightId) -> KnightsResult<Option<Knight>> {
        self.find_by_id_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.find_by_id(id).await
    }

    async fn find_by_id_and_replace(
        &self,
        id: KnightId,
        knight: Knight,
    ) -> KnightsResult<Option<Knight>> {
        self.inner.find_by_id_and_replace(id, knight).await
    }

    async fn find_by_id_and_delete(&self, id: KnightId) -> KnightsResult<Option<Knight>> {
        self.inner.find_by_id_and_delete(id).await
    }
}

/// Knight store whose record disappears between `find_by_id` and
/// `find_by_id_and_replace`, as if a concurrent delete won the race.
#[derive(Debug, Default)]
pub struct VanishingKnightStore {
    inner: InMemoryKnightStore,
}

impl VanishingKnightStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KnightStore for VanishingKnightStore {
    async fn create(&self, knight: NewKnight) -> KnightsResult<Knight> {
        self.inner.create(knight).await
    }

    async fn find_all(&self) -> KnightsResult<Vec<Knight>> {
        self.inner.find_all().await
    }

    async fn find_by_id(&self, id: KnightId) -> KnightsResult<Option<Knight>> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_id_and_replace(
        &self,
        id: KnightId,
        knight: Knight,
    ) -> KnightsResult<Option<Knight>> {
        self.inner.find_by_id_and_delete(id).await?;
        self.inner.find_by_id_and_replace(id, knight).await
    }

    async fn find_by_id_and_delete(&self, id: KnightId) -> KnightsResult<Option<Knight>> {
        self.inner.find_by_id_and_delete(id).await
    }
}

/// Hero archive that rejects every write.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingHeroArchive;

#[async_trait]
impl HeroArchive for FailingHeroArchive {
    async fn create(&self, _hero: Hero) -> KnightsResult<Hero> {
        Err(StorageError::InsertFailed {
            entity_type: EntityType::Hero,
            reason: "archive unavailable".to_string(),
        }
        .into())
    }

    async fn find_all(&self) -> KnightsResult<Vec<Hero>> {
        Ok(Vec::new())
    }
}

/// Shared handles to a full set of in-memory backends.
#[derive(Debug, Clone, Default)]
pub struct TestBackends {
    pub store: Arc<InMemoryKnightStore>,
    pub heroes: Arc<InMemoryHeroArchive>,
    pub cache: Arc<RecordingCacheStore>,
}

impl TestBackends {
    pub fn new() -> Self {
        Self::default()
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for knight payloads.

    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    /// Generate one of the six abilities.
    pub fn arb_ability() -> impl Strategy<Value = Ability> {
        prop::sample::select(Ability::all().to_vec())
    }

    /// Generate an ability score inside the banded range.
    pub fn arb_score() -> impl Strategy<Value = i32> {
        0i32..=20
    }

    /// Generate a full set of six scores.
    pub fn arb_attributes() -> impl Strategy<Value = Attributes> {
        (
            arb_score(),
            arb_score(),
            arb_score(),
            arb_score(),
            arb_score(),
            arb_score(),
        )
            .prop_map(|(s, d, c, i, w, ch)| Attributes::new(s, d, c, i, w, ch))
    }

    /// Generate a weapon.
    pub fn arb_weapon() -> impl Strategy<Value = Weapon> {
        (
            "[A-Z][a-z]{2,12}",
            -3i32..=5,
            arb_ability(),
            any::<bool>(),
        )
            .prop_map(|(name, modifier, attr, equipped)| Weapon {
                name,
                modifier,
                attr: attr.name().to_string(),
                equipped,
            })
    }

    /// Generate a birthday between 1900 and 2024.
    pub fn arb_birthday() -> impl Strategy<Value = NaiveDate> {
        (1900i32..=2024, 1u32..=12, 1u32..=28).prop_map(|(y, m, d)| {
            NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN)
        })
    }

    /// Generate a draft the stat calculator accepts.
    pub fn arb_knight_draft() -> impl Strategy<Value = KnightDraft> {
        (
            "Sir [A-Z][a-z]{2,10}",
            "[A-Z][a-z]{1,8}",
            arb_birthday(),
            prop::collection::vec(arb_weapon(), 1..4),
            arb_attributes(),
            arb_ability(),
        )
            .prop_map(
                |(name, nickname, birthday, weapons, attributes, key)| KnightDraft {
                    name,
                    nickname,
                    birthday,
                    weapons,
                    attributes,
                    key_attribute: key.name().to_string(),
                },
            )
    }

    /// Generate a patch whose fields are each present or absent.
    ///
    /// When present, `attributes` is a full set, so any patch applied over a
    /// valid draft stays valid.
    pub fn arb_knight_patch() -> impl Strategy<Value = KnightPatch> {
        (
            prop::option::of("Sir [A-Z][a-z]{2,10}"),
            prop::option::of("[A-Z][a-z]{1,8}"),
            prop::option::of(arb_birthday()),
            prop::option::of(prop::collection::vec(arb_weapon(), 1..4)),
            prop::option::of(arb_attributes()),
            prop::option::of(arb_ability().prop_map(|a| a.name().to_string())),
        )
            .prop_map(
                |(name, nickname, birthday, weapons, attributes, key_attribute)| KnightPatch {
                    name,
                    nickname,
                    birthday,
                    weapons,
                    attributes,
                    key_attribute,
                },
            )
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built payloads for common scenarios.

    use super::*;
    use chrono::NaiveDate;

    /// Year the fixtures are evaluated in.
    pub const FIXTURE_YEAR: i32 = 2024;

    /// Clock pinned to [`FIXTURE_YEAR`].
    pub fn fixed_clock() -> FixedClock {
        FixedClock::new(FIXTURE_YEAR)
    }

    /// Sir Hubric: charisma 15 keyed, Montant +2 first. Attack 13, experience
    /// 2563 in [`FIXTURE_YEAR`].
    pub fn sir_hubric() -> KnightDraft {
        KnightDraft {
            name: "Sir Hubric".to_string(),
            nickname: "Hub".to_string(),
            birthday: NaiveDate::from_ymd_opt(1988, 2, 27).unwrap_or(NaiveDate::MIN),
            weapons: vec![
                Weapon {
                    name: "Montant".to_string(),
                    modifier: 2,
                    attr: "strength".to_string(),
                    equipped: true,
                },
                Weapon {
                    name: "Dagger".to_string(),
                    modifier: 1,
                    attr: "dexterity".to_string(),
                    equipped: false,
                },
            ],
            attributes: Attributes::new(15, 14, 12, 16, 12, 15),
            key_attribute: "charisma".to_string(),
        }
    }

    /// A young squire: strength 9 keyed, no weapon bonus, born 2020.
    pub fn squire() -> KnightDraft {
        KnightDraft {
            name: "Squire Tom".to_string(),
            nickname: "Tommy".to_string(),
            birthday: NaiveDate::from_ymd_opt(2020, 6, 1).unwrap_or(NaiveDate::MIN),
            weapons: vec![Weapon {
                name: "Stick".to_string(),
                modifier: 0,
                attr: "strength".to_string(),
                equipped: true,
            }],
            attributes: Attributes::new(9, 10, 10, 10, 10, 10),
            key_attribute: "strength".to_string(),
        }
    }

    /// Named variant of [`sir_hubric`].
    pub fn knight_named(name: &str) -> KnightDraft {
        KnightDraft {
            name: name.to_string(),
            ..sir_hubric()
        }
    }

    /// Hubric's stats in [`FIXTURE_YEAR`].
    pub fn sir_hubric_stats() -> CombatStats {
        CombatStats {
            attack: 13,
            experience: 2563,
        }
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions on `KnightsResult` values.

    use super::*;

    /// Assert that a KnightsResult is Ok.
    #[track_caller]
    pub fn assert_ok<T: std::fmt::Debug>(result: &KnightsResult<T>) {
        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result);
    }

    /// Assert that a KnightsResult is a NotFound storage error for `id`.
    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &KnightsResult<T>, id: KnightId) {
        match result {
            Err(KnightsError::Storage(StorageError::NotFound { id: found, .. })) => {
                assert_eq!(*found, id, "Wrong id in NotFound error");
            }
            other => panic!("Expected NotFound error for {}, got: {:?}", id, other),
        }
    }

    /// Assert that a KnightsResult is a Validation error.
    #[track_caller]
    pub fn assert_validation_error<T: std::fmt::Debug>(result: &KnightsResult<T>) {
        match result {
            Err(KnightsError::Validation(_)) => {}
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }

    /// Assert that a knight carries the given derived stats.
    #[track_caller]
    pub fn assert_stats(knight: &Knight, expected: CombatStats) {
        assert_eq!(
            knight.stats(),
            expected,
            "Stats mismatch for knight {}",
            knight.id
        );
    }
}

// ============================================================================
// TESTS
// ============================================================================
