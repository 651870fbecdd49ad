//! LMDB-backed document store.
//!
//! Uses the heed crate (Rust bindings for LMDB) to persist knights and the
//! hall of heroes as JSON documents in one memory-mapped environment.
//!
//! # Layout
//!
//! - `knights`: key is the 16 raw bytes of the UUIDv7 id, value is the JSON
//!   knight. Byte order of v7 ids is creation order, so a cursor walk yields
//!   knights oldest first.
//! - `hall_of_heroes`: key is a big-endian `u64` append sequence, value is
//!   the JSON snapshot.
//!
//! Every mutation runs in a single write transaction, which makes
//! find-and-replace and find-and-delete atomic per document.

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions, RoTxn};
use knights_core::{
    EntityType, Hero, Knight, KnightId, KnightsError, KnightsResult, NewKnight, StorageError,
};

use crate::{HeroArchive, KnightStore};

const KNIGHTS_DB: &str = "knights";
const HEROES_DB: &str = "hall_of_heroes";

/// Error type for LMDB store operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbStoreError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open a named database within the environment.
    #[error("Failed to open database {name}: {reason}")]
    DbOpen { name: &'static str, reason: String },

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Stored bytes did not decode.
    #[error("Corrupt {entity_type:?} document: {reason}")]
    Corrupt {
        entity_type: EntityType,
        reason: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbStoreError> for KnightsError {
    fn from(e: LmdbStoreError) -> Self {
        match e {
            LmdbStoreError::Corrupt {
                entity_type,
                reason,
            } => StorageError::CorruptDocument {
                entity_type,
                reason,
            }
            .into(),
            LmdbStoreError::Serialization(reason) => StorageError::InsertFailed {
                entity_type: EntityType::Knight,
                reason,
            }
            .into(),
            other => StorageError::TransactionFailed {
                reason: other.to_string(),
            }
            .into(),
        }
    }
}

fn txn_err(e: heed::Error) -> LmdbStoreError {
    LmdbStoreError::Transaction(e.to_string())
}

fn encode(knight: &Knight) -> Result<Vec<u8>, LmdbStoreError> {
    serde_json::to_vec(knight).map_err(|e| LmdbStoreError::Serialization(e.to_string()))
}

fn decode(entity_type: EntityType, bytes: &[u8]) -> Result<Knight, LmdbStoreError> {
    serde_json::from_slice(bytes).map_err(|e| LmdbStoreError::Corrupt {
        entity_type,
        reason: e.to_string(),
    })
}

/// Knight store and hero archive sharing one LMDB environment.
///
/// Cheap to share behind an `Arc`; the same instance is handed to the
/// service as both its `KnightStore` and its `HeroArchive`.
pub struct LmdbDocumentStore {
    env: Env,
    knights: Database<Bytes, Bytes>,
    heroes: Database<Bytes, Bytes>,
}

impl LmdbDocumentStore {
    /// Open (or create) the store.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the environment in megabytes
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the environment
    /// or its databases cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbStoreError> {
        std::fs::create_dir_all(&path)?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(2)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbStoreError::EnvOpen(e.to_string()))?;

        let mut wtxn = env.write_txn().map_err(txn_err)?;
        let knights: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, Some(KNIGHTS_DB))
            .map_err(|e| LmdbStoreError::DbOpen {
                name: KNIGHTS_DB,
                reason: e.to_string(),
            })?;
        let heroes: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, Some(HEROES_DB))
            .map_err(|e| LmdbStoreError::DbOpen {
                name: HEROES_DB,
                reason: e.to_string(),
            })?;
        wtxn.commit().map_err(txn_err)?;

        Ok(Self {
            env,
            knights,
            heroes,
        })
    }

    fn read_knight(&self, rtxn: &RoTxn, id: KnightId) -> Result<Option<Knight>, LmdbStoreError> {
        self.knights
            .get(rtxn, id.as_bytes())
            .map_err(txn_err)?
            .map(|bytes| decode(EntityType::Knight, bytes))
            .transpose()
    }

    fn next_hero_seq(&self, rtxn: &RoTxn) -> Result<u64, LmdbStoreError> {
        let last = self.heroes.last(rtxn).map_err(txn_err)?;
        let Some((key, _)) = last else {
            return Ok(0);
        };
        let seq: [u8; 8] = key.try_into().map_err(|_| LmdbStoreError::Corrupt {
            entity_type: EntityType::Hero,
            reason: format!("hero key has {} bytes, expected 8", key.len()),
        })?;
        Ok(u64::from_be_bytes(seq) + 1)
    }
}

#[async_trait]
impl KnightStore for LmdbDocumentStore {
    async fn create(&self, knight: NewKnight) -> KnightsResult<Knight> {
        let knight = Knight::from_new(KnightId::now_v7(), knight, Utc::now());
        let bytes = encode(&knight)?;

        let mut wtxn = self.env.write_txn().map_err(txn_err)?;
        self.knights
            .put(&mut wtxn, knight.id.as_bytes(), &bytes)
            .map_err(txn_err)?;
        wtxn.commit().map_err(txn_err)?;

        Ok(knight)
    }

    async fn find_all(&self) -> KnightsResult<Vec<Knight>> {
        let rtxn = self.env.read_txn().map_err(txn_err)?;
        let mut knights = Vec::new();
        for entry in self.knights.iter(&rtxn).map_err(txn_err)? {
            let (_, bytes) = entry.map_err(txn_err)?;
            knights.push(decode(EntityType::Knight, bytes)?);
        }
        Ok(knights)
    }

    async fn find_by_id(&self, id: KnightId) -> KnightsResult<Option<Knight>> {
        let rtxn = self.env.read_txn().map_err(txn_err)?;
        Ok(self.read_knight(&rtxn, id)?)
    }

    async fn find_by_id_and_replace(
        &self,
        id: KnightId,
        mut knight: Knight,
    ) -> KnightsResult<Option<Knight>> {
        let mut wtxn = self.env.write_txn().map_err(txn_err)?;
        let Some(stored) = self.read_knight(&wtxn, id)? else {
            return Ok(None);
        };

        knight.id = id;
        knight.created_at = stored.created_at;
        knight.updated_at = Utc::now();
        let bytes = encode(&knight)?;

        self.knights
            .put(&mut wtxn, id.as_bytes(), &bytes)
            .map_err(txn_err)?;
        wtxn.commit().map_err(txn_err)?;

        Ok(Some(knight))
    }

    async fn find_by_id_and_delete(&self, id: KnightId) -> KnightsResult<Option<Knight>> {
        let mut wtxn = self.env.write_txn().map_err(txn_err)?;
        let Some(stored) = self.read_knight(&wtxn, id)? else {
            return Ok(None);
        };

        self.knights
            .delete(&mut wtxn, id.as_bytes())
            .map_err(txn_err)?;
        wtxn.commit().map_err(txn_err)?;

        Ok(Some(stored))
    }
}

#[async_trait]
impl HeroArchive for LmdbDocumentStore {
    async fn create(&self, hero: Hero) -> KnightsResult<Hero> {
        let bytes = encode(&hero)?;

        let mut wtxn = self.env.write_txn().map_err(txn_err)?;
        let seq = self.next_hero_seq(&wtxn)?;
        self.heroes
            .put(&mut wtxn, &seq.to_be_bytes(), &bytes)
            .map_err(txn_err)?;
        wtxn.commit().map_err(txn_err)?;

        Ok(hero)
    }

    async fn find_all(&self) -> KnightsResult<Vec<Hero>> {
        let rtxn = self.env.read_txn().map_err(txn_err)?;
        let mut heroes = Vec::new();
        for entry in self.heroes.iter(&rtxn).map_err(txn_err)? {
            let (_, bytes) = entry.map_err(txn_err)?;
            heroes.push(decode(EntityType::Hero, bytes)?);
        }
        Ok(heroes)
    }
}
