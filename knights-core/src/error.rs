//! Error types for knights operations

use crate::{Ability, EntityType, KnightId};
use thiserror::Error;

/// Primary store and archive errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Entity not found: {entity_type:?} with id {id}")]
    NotFound { entity_type: EntityType, id: KnightId },

    #[error("Insert failed for {entity_type:?}: {reason}")]
    InsertFailed { entity_type: EntityType, reason: String },

    #[error("Transaction failed: {reason}")]
    TransactionFailed { reason: String },

    #[error("Corrupt document for {entity_type:?}: {reason}")]
    CorruptDocument { entity_type: EntityType, reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Stat computation input errors.
///
/// Raised at the point of first bad access; payloads are not pre-validated.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Unknown key attribute: {name}")]
    UnknownAttribute { name: String },

    #[error("Attribute {ability} has no score")]
    MissingAttribute { ability: Ability },

    #[error("Knight has no weapons")]
    NoWeapons,

    #[error("Attack out of range for weapon modifier {modifier}")]
    AttackOutOfRange { modifier: i32 },
}

/// Cache store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Failed to serialize cache entry {key}: {reason}")]
    Serialization { key: String, reason: String },

    #[error("Failed to deserialize cache entry {key}: {reason}")]
    Deserialization { key: String, reason: String },

    #[error("Cache backend error: {reason}")]
    Backend { reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all knights errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KnightsError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl KnightsError {
    /// Shorthand for a missing knight.
    pub fn knight_not_found(id: KnightId) -> Self {
        StorageError::NotFound {
            entity_type: EntityType::Knight,
            id,
        }
        .into()
    }

    /// True when the target record does not exist in the primary store.
    pub fn is_not_found(&self) -> bool {
        matches!(self, KnightsError::Storage(StorageError::NotFound { .. }))
    }
}

/// Result type alias for knights operations.
pub type KnightsResult<T> = Result<T, KnightsError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_storage_error_display_not_found() {
        let err = StorageError::NotFound {
            entity_type: EntityType::Knight,
            id: KnightId::from_uuid(Uuid::nil()),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Entity not found"));
        assert!(msg.contains("Knight"));
        assert!(msg.contains("00000000-0000-0000-0000-000000000000"));
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::UnknownAttribute {
            name: "luck".to_string(),
        };
        assert!(format!("{}", err).contains("luck"));

        let err = ValidationError::MissingAttribute {
            ability: Ability::Charisma,
        };
        assert!(format!("{}", err).contains("charisma"));
    }

    #[test]
    fn test_config_error_display_invalid_value() {
        let err = ConfigError::InvalidValue {
            field: "KNIGHTS_API_PORT".to_string(),
            value: "abc".to_string(),
            reason: "must be a port number".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("KNIGHTS_API_PORT"));
        assert!(msg.contains("abc"));
        assert!(msg.contains("must be a port number"));
    }

    #[test]
    fn test_knights_error_from_variants() {
        let storage = KnightsError::from(StorageError::LockPoisoned);
        assert!(matches!(storage, KnightsError::Storage(_)));

        let validation = KnightsError::from(ValidationError::NoWeapons);
        assert!(matches!(validation, KnightsError::Validation(_)));

        let cache = KnightsError::from(CacheError::Backend {
            reason: "down".to_string(),
        });
        assert!(matches!(cache, KnightsError::Cache(_)));

        let config = KnightsError::from(ConfigError::InvalidValue {
            field: "KNIGHTS_LMDB_MAX_SIZE_MB".to_string(),
            value: "0".to_string(),
            reason: "must be positive".to_string(),
        });
        assert!(matches!(config, KnightsError::Config(_)));
    }

    #[test]
    fn test_is_not_found_only_for_missing_records() {
        assert!(KnightsError::knight_not_found(KnightId::now_v7()).is_not_found());
        assert!(!KnightsError::from(StorageError::LockPoisoned).is_not_found());
        assert!(!KnightsError::from(ValidationError::NoWeapons).is_not_found());
    }
}
