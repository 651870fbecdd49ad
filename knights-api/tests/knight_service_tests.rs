//! Cache-consistency and lifecycle tests for the knight record service.

use std::sync::Arc;

use knights_api::KnightService;
use knights_core::calculate_attack_and_experience;
use knights_storage::LmdbDocumentStore;
use knights_test_utils::assertions::{assert_not_found, assert_stats, assert_validation_error};
use knights_test_utils::*;
use proptest::prelude::*;
use tempfile::TempDir;

const ALL_KNIGHTS: &str = "allKnights";

fn knight_key(id: KnightId) -> String {
    format!("knight:{}", id)
}

fn service_over(
    store: Arc<dyn KnightStore>,
    heroes: Arc<dyn HeroArchive>,
    cache: Arc<dyn CacheStore>,
) -> KnightService {
    KnightService::new(store, heroes, cache, Arc::new(fixtures::fixed_clock()))
}

fn service_with(backends: &TestBackends) -> KnightService {
    service_over(
        backends.store.clone(),
        backends.heroes.clone(),
        backends.cache.clone(),
    )
}

// ============================================================================
// CREATE
// ============================================================================

#[tokio::test]
async fn create_invalidates_collection_and_never_populates() -> KnightsResult<()> {
    let backends = TestBackends::new();
    let service = service_with(&backends);

    service.find_all().await?;
    assert!(backends.cache.contains(&CacheKey::AllKnights));
    backends.cache.clear_ops();

    let knight = service.create(fixtures::sir_hubric()).await?;

    assert_eq!(
        backends.cache.ops(),
        vec![CacheOp::Delete(ALL_KNIGHTS.to_string())]
    );
    assert!(!backends.cache.contains(&CacheKey::AllKnights));
    assert!(!backends.cache.contains(&CacheKey::Knight(knight.id)));
    Ok(())
}

#[tokio::test]
async fn create_derives_hubric_stats() -> KnightsResult<()> {
    let backends = TestBackends::new();
    let service = service_with(&backends);

    let knight = service.create(fixtures::sir_hubric()).await?;

    assert_stats(&knight, fixtures::sir_hubric_stats());
    assert_eq!(knight.name, "Sir Hubric");
    assert_eq!(knight.weapons.len(), 2);
    Ok(())
}

#[tokio::test]
async fn create_with_invalid_payload_still_drops_collection() -> KnightsResult<()> {
    let backends = TestBackends::new();
    let service = service_with(&backends);
    service.find_all().await?;

    let mut draft = fixtures::sir_hubric();
    draft.weapons.clear();
    let result = service.create(draft).await;

    assert_validation_error(&result);
    assert!(!backends.cache.contains(&CacheKey::AllKnights));
    assert_eq!(backends.store.count()?, 0);
    Ok(())
}

#[tokio::test]
async fn create_with_missing_key_score_is_rejected() {
    let backends = TestBackends::new();
    let service = service_with(&backends);

    let mut draft = fixtures::sir_hubric();
    draft.attributes.charisma = None;

    let result = service.create(draft).await;
    assert!(matches!(
        result,
        Err(KnightsError::Validation(ValidationError::MissingAttribute {
            ability: Ability::Charisma
        }))
    ));
}

// ============================================================================
// READ
// ============================================================================

#[tokio::test]
async fn repeated_find_all_reads_store_once() -> KnightsResult<()> {
    let store = Arc::new(CountingKnightStore::new());
    let service = service_over(
        store.clone(),
        Arc::new(InMemoryHeroArchive::new()),
        Arc::new(InMemoryCacheStore::new()),
    );
    service.create(fixtures::knight_named("Sir A")).await?;
    service.create(fixtures::knight_named("Sir B")).await?;

    let first = service.find_all().await?;
    let second = service.find_all().await?;
    let third = service.find_all().await?;

    assert_eq!(store.find_all_calls(), 1);
    assert_eq!(first.len(), 2);
    assert_eq!(first, second);
    assert_eq!(second, third);
    Ok(())
}

#[tokio::test]
async fn find_all_after_create_sees_new_knight() -> KnightsResult<()> {
    let backends = TestBackends::new();
    let service = service_with(&backends);

    assert!(service.find_all().await?.is_empty());
    let knight = service.create(fixtures::sir_hubric()).await?;

    assert_eq!(service.find_all().await?, vec![knight]);
    Ok(())
}

#[tokio::test]
async fn cached_knight_round_trips_losslessly() -> KnightsResult<()> {
    let store = Arc::new(CountingKnightStore::new());
    let service = service_over(
        store.clone(),
        Arc::new(InMemoryHeroArchive::new()),
        Arc::new(InMemoryCacheStore::new()),
    );
    let created = service.create(fixtures::sir_hubric()).await?;

    let from_store = service.find_one(created.id).await?;
    let from_cache = service.find_one(created.id).await?;

    assert_eq!(store.find_by_id_calls(), 1);
    assert_eq!(from_store, created);
    assert_eq!(from_cache, created);
    Ok(())
}

#[tokio::test]
async fn find_one_missing_is_not_found_and_sets_nothing() -> KnightsResult<()> {
    let backends = TestBackends::new();
    let service = service_with(&backends);
    let id = KnightId::now_v7();

    let result = service.find_one(id).await;

    assert_not_found(&result, id);
    assert_eq!(backends.cache.ops(), vec![CacheOp::Get(knight_key(id))]);
    Ok(())
}

// ============================================================================
// UPDATE
// ============================================================================

#[tokio::test]
async fn update_merges_and_recomputes() -> KnightsResult<()> {
    let backends = TestBackends::new();
    let service = service_with(&backends);
    let knight = service.create(fixtures::sir_hubric()).await?;

    let patch = KnightPatch {
        nickname: Some("The Bold".to_string()),
        attributes: Some(Attributes::new(15, 14, 12, 16, 12, 19)),
        ..Default::default()
    };
    let updated = service.update(knight.id, patch).await?;

    assert_eq!(updated.id, knight.id);
    assert_eq!(updated.name, knight.name);
    assert_eq!(updated.nickname, "The Bold");
    assert_eq!(updated.created_at, knight.created_at);
    // charisma 19 is +3, Montant +2
    assert_stats(
        &updated,
        CombatStats {
            attack: 15,
            experience: 2563,
        },
    );
    assert_eq!(backends.store.find_by_id(knight.id).await?, Some(updated));
    Ok(())
}

#[tokio::test]
async fn update_invalidates_collection_then_record() -> KnightsResult<()> {
    let backends = TestBackends::new();
    let service = service_with(&backends);
    let knight = service.create(fixtures::sir_hubric()).await?;
    service.find_all().await?;
    service.find_one(knight.id).await?;
    backends.cache.clear_ops();

    let patch = KnightPatch {
        name: Some("Sir Renamed".to_string()),
        ..Default::default()
    };
    service.update(knight.id, patch).await?;

    assert_eq!(
        backends.cache.ops(),
        vec![
            CacheOp::Delete(ALL_KNIGHTS.to_string()),
            CacheOp::Delete(knight_key(knight.id)),
        ]
    );
    assert_eq!(service.find_one(knight.id).await?.name, "Sir Renamed");
    assert_eq!(service.find_all().await?[0].name, "Sir Renamed");
    Ok(())
}

#[tokio::test]
async fn update_missing_id_has_no_cache_activity() -> KnightsResult<()> {
    let backends = TestBackends::new();
    let service = service_with(&backends);
    let id = KnightId::now_v7();

    let result = service.update(id, KnightPatch::default()).await;

    assert_not_found(&result, id);
    assert!(backends.cache.ops().is_empty());
    Ok(())
}

#[tokio::test]
async fn update_racing_delete_is_not_found() -> KnightsResult<()> {
    let store = Arc::new(VanishingKnightStore::new());
    let cache = Arc::new(RecordingCacheStore::new());
    let service = service_over(
        store.clone(),
        Arc::new(InMemoryHeroArchive::new()),
        cache.clone(),
    );
    let knight = service.create(fixtures::sir_hubric()).await?;
    cache.clear_ops();

    let result = service.update(knight.id, KnightPatch::default()).await;

    assert_not_found(&result, knight.id);
    assert!(cache.mutations().is_empty());
    Ok(())
}

#[tokio::test]
async fn update_into_invalid_state_is_rejected() -> KnightsResult<()> {
    let backends = TestBackends::new();
    let service = service_with(&backends);
    let knight = service.create(fixtures::sir_hubric()).await?;

    let patch = KnightPatch {
        key_attribute: Some("luck".to_string()),
        ..Default::default()
    };
    let result = service.update(knight.id, patch).await;

    assert_validation_error(&result);
    assert_eq!(backends.store.find_by_id(knight.id).await?, Some(knight));
    Ok(())
}

// ============================================================================
// REMOVE
// ============================================================================

#[tokio::test]
async fn remove_archives_exactly_one_hero() -> KnightsResult<()> {
    let backends = TestBackends::new();
    let service = service_with(&backends);
    let knight = service.create(fixtures::sir_hubric()).await?;
    let other = service.create(fixtures::squire()).await?;

    let deleted = service.remove(knight.id).await?;

    assert_eq!(deleted, knight);
    assert_eq!(service.find_heroes().await?, vec![knight.clone()]);
    assert_not_found(&service.find_one(knight.id).await, knight.id);
    assert_eq!(service.find_all().await?, vec![other]);
    Ok(())
}

#[tokio::test]
async fn remove_invalidates_record_then_collection() -> KnightsResult<()> {
    let backends = TestBackends::new();
    let service = service_with(&backends);
    let knight = service.create(fixtures::sir_hubric()).await?;
    service.find_all().await?;
    service.find_one(knight.id).await?;
    backends.cache.clear_ops();

    service.remove(knight.id).await?;

    assert_eq!(
        backends.cache.ops(),
        vec![
            CacheOp::Delete(knight_key(knight.id)),
            CacheOp::Delete(ALL_KNIGHTS.to_string()),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn remove_missing_id_archives_nothing() -> KnightsResult<()> {
    let backends = TestBackends::new();
    let service = service_with(&backends);
    let id = KnightId::now_v7();

    let result = service.remove(id).await;

    assert_not_found(&result, id);
    assert!(backends.cache.ops().is_empty());
    assert_eq!(backends.heroes.count()?, 0);
    Ok(())
}

#[tokio::test]
async fn remove_with_failing_archive_keeps_delete() -> KnightsResult<()> {
    let store = Arc::new(InMemoryKnightStore::new());
    let cache = Arc::new(RecordingCacheStore::new());
    let service = service_over(store.clone(), Arc::new(FailingHeroArchive), cache.clone());
    let knight = service.create(fixtures::sir_hubric()).await?;

    let result = service.remove(knight.id).await;

    assert!(matches!(
        result,
        Err(KnightsError::Storage(StorageError::InsertFailed {
            entity_type: EntityType::Hero,
            ..
        }))
    ));
    assert_eq!(store.count()?, 0);
    assert!(!cache.contains(&CacheKey::Knight(knight.id)));
    Ok(())
}

#[tokio::test]
async fn heroes_keep_repeated_archival() -> KnightsResult<()> {
    let backends = TestBackends::new();
    let service = service_with(&backends);

    let first = service.create(fixtures::knight_named("Sir A")).await?;
    let second = service.create(fixtures::knight_named("Sir B")).await?;
    service.remove(second.id).await?;
    service.remove(first.id).await?;

    let heroes = service.find_heroes().await?;
    assert_eq!(heroes, vec![second, first]);
    Ok(())
}

#[tokio::test]
async fn find_heroes_bypasses_cache() -> KnightsResult<()> {
    let backends = TestBackends::new();
    let service = service_with(&backends);

    service.find_heroes().await?;
    service.find_heroes().await?;

    assert!(backends.cache.ops().is_empty());
    Ok(())
}

// ============================================================================
// LMDB BACKEND
// ============================================================================

#[tokio::test]
async fn lifecycle_over_lmdb_store() -> KnightsResult<()> {
    let temp_dir = TempDir::new().expect("TempDir creation should succeed");
    let cache = Arc::new(RecordingCacheStore::new());
    let archived = {
        let lmdb = Arc::new(
            LmdbDocumentStore::open(temp_dir.path(), 10).map_err(KnightsError::from)?,
        );
        let service = service_over(lmdb.clone(), lmdb, cache.clone());

        let knight = service.create(fixtures::sir_hubric()).await?;
        assert_eq!(service.find_all().await?, vec![knight.clone()]);
        assert_eq!(service.find_one(knight.id).await?, knight);

        let patch = KnightPatch {
            weapons: Some(vec![Weapon {
                name: "Lance".to_string(),
                modifier: 3,
                attr: "strength".to_string(),
                equipped: true,
            }]),
            ..Default::default()
        };
        let updated = service.update(knight.id, patch).await?;
        assert_eq!(updated.attack, 14);
        assert_eq!(updated.created_at, knight.created_at);
        assert_eq!(service.find_one(knight.id).await?, updated);

        cache.clear_ops();
        let deleted = service.remove(knight.id).await?;
        assert_eq!(
            cache.ops(),
            vec![
                CacheOp::Delete(knight_key(knight.id)),
                CacheOp::Delete(ALL_KNIGHTS.to_string()),
            ]
        );
        assert_eq!(deleted, updated);
        assert_eq!(service.find_heroes().await?, vec![deleted.clone()]);
        assert_not_found(&service.find_one(knight.id).await, knight.id);
        assert!(service.find_all().await?.is_empty());
        deleted
    };

    let reopened = LmdbDocumentStore::open(temp_dir.path(), 10).map_err(KnightsError::from)?;
    assert_eq!(HeroArchive::find_all(&reopened).await?, vec![archived]);
    assert!(KnightStore::find_all(&reopened).await?.is_empty());
    Ok(())
}

// ============================================================================
// CONCURRENCY
// ============================================================================

/// A reader that fetched the store before a concurrent create completes
/// will write its pre-create snapshot into `allKnights` after the create's
/// invalidation. That stale list is served until the next mutation.
#[tokio::test]
async fn stale_populate_race_is_observable() -> KnightsResult<()> {
    let store = Arc::new(GatedKnightStore::new());
    let cache = Arc::new(RecordingCacheStore::new());
    let service = Arc::new(service_over(
        store.clone(),
        Arc::new(InMemoryHeroArchive::new()),
        cache.clone(),
    ));

    store.arm();
    let reader = tokio::spawn({
        let service = service.clone();
        async move { service.find_all().await }
    });
    store.snapshot_taken().await;

    service.create(fixtures::knight_named("Sir Late")).await?;
    store.release();

    let snapshot = reader.await.expect("reader task should not panic")?;
    assert!(snapshot.is_empty());

    assert_eq!(
        cache.mutations(),
        vec![
            CacheOp::Delete(ALL_KNIGHTS.to_string()),
            CacheOp::Set(ALL_KNIGHTS.to_string()),
        ]
    );
    assert!(service.find_all().await?.is_empty());
    assert_eq!(store.count()?, 1);

    // The next mutation clears the stale entry.
    service.create(fixtures::knight_named("Sir Later")).await?;
    assert_eq!(service.find_all().await?.len(), 2);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_all_land() -> KnightsResult<()> {
    let backends = TestBackends::new();
    let service = Arc::new(service_with(&backends));

    let mut handles = Vec::new();
    for i in 0..16 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service
                .create(fixtures::knight_named(&format!("Sir {}", i)))
                .await
        }));
    }
    for handle in handles {
        handle.await.expect("create task should not panic")?;
    }

    assert_eq!(backends.store.count()?, 16);
    assert_eq!(service.find_all().await?.len(), 16);
    Ok(())
}

// ============================================================================
// PROPERTIES
// ============================================================================

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime should build")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_created_knights_read_back_identically(draft in generators::arb_knight_draft()) {
        let expected = calculate_attack_and_experience(&draft, fixtures::FIXTURE_YEAR)
            .expect("generated drafts are valid");

        let result: KnightsResult<(Knight, Knight, Knight)> = runtime().block_on(async {
            let backends = TestBackends::new();
            let service = service_with(&backends);
            let created = service.create(draft).await?;
            let from_store = service.find_one(created.id).await?;
            let from_cache = service.find_one(created.id).await?;
            Ok((created, from_store, from_cache))
        });
        let (created, from_store, from_cache) = result.expect("service calls succeed");

        prop_assert_eq!(created.stats(), expected);
        prop_assert_eq!(&from_store, &created);
        prop_assert_eq!(&from_cache, &created);
    }

    #[test]
    fn prop_update_matches_calculator_on_merged_fields(
        draft in generators::arb_knight_draft(),
        patch in generators::arb_knight_patch(),
    ) {
        let merged = patch.clone().apply_to(draft.clone());
        let expected = calculate_attack_and_experience(&merged, fixtures::FIXTURE_YEAR)
            .expect("merged drafts are valid");

        let updated = runtime().block_on(async {
            let backends = TestBackends::new();
            let service = service_with(&backends);
            let created = service.create(draft).await?;
            service.update(created.id, patch).await
        }).expect("service calls succeed");

        prop_assert_eq!(updated.stats(), expected);
        prop_assert_eq!(updated.draft(), merged);
    }
}
