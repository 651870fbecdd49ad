//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use knights_core::{KnightsError, SystemClock};
use knights_storage::{
    CacheStore, HeroArchive, InMemoryCacheStore, InMemoryHeroArchive, InMemoryKnightStore,
    KnightStore, LmdbDocumentStore,
};

use crate::config::{ApiConfig, StorageBackend};
use crate::error::ApiResult;
use crate::services::KnightService;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    pub knights: Arc<KnightService>,
    pub start_time: Instant,
}

crate::impl_from_ref!(Arc<KnightService>, knights);
crate::impl_from_ref!(Instant, start_time);

impl AppState {
    pub fn new(knights: KnightService) -> Self {
        Self {
            knights: Arc::new(knights),
            start_time: Instant::now(),
        }
    }

    /// Build the stores the configuration asks for and wire them into a
    /// service running on the wall clock.
    ///
    /// The cache is always in-process.
    ///
    /// # Errors
    /// Returns an error if the LMDB environment cannot be opened.
    pub fn from_config(config: &ApiConfig) -> ApiResult<Self> {
        let store: Arc<dyn KnightStore>;
        let heroes: Arc<dyn HeroArchive>;
        match config.storage_backend {
            StorageBackend::Memory => {
                store = Arc::new(InMemoryKnightStore::new());
                heroes = Arc::new(InMemoryHeroArchive::new());
            }
            StorageBackend::Lmdb => {
                let lmdb = Arc::new(
                    LmdbDocumentStore::open(&config.lmdb_path, config.lmdb_max_size_mb)
                        .map_err(KnightsError::from)?,
                );
                store = lmdb.clone();
                heroes = lmdb;
            }
        }
        let cache: Arc<dyn CacheStore> = Arc::new(InMemoryCacheStore::new());

        tracing::info!(
            backend = ?config.storage_backend,
            lmdb_path = %config.lmdb_path.display(),
            "Stores initialized"
        );

        Ok(Self::new(KnightService::new(
            store,
            heroes,
            cache,
            Arc::new(SystemClock),
        )))
    }
}
