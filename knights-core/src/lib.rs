//! Knights Core - Entity Types and Stat Derivation
//!
//! Data structures shared by every other crate in the workspace, the error
//! taxonomy, and the pure stat calculator. No I/O lives here.

pub mod clock;
pub mod entities;
pub mod error;
pub mod identity;
pub mod stats;

pub use clock::{Clock, FixedClock, SystemClock};
pub use entities::{
    Ability, Attributes, Knight, KnightDraft, KnightPatch, NewKnight, Weapon,
};
pub use error::{
    CacheError, ConfigError, KnightsError, KnightsResult, StorageError, ValidationError,
};
pub use identity::{EntityType, KnightId, Timestamp};
pub use stats::{
    attribute_modifier, calculate_attack, calculate_attack_and_experience,
    calculate_experience, CombatStats,
};

/// A Hall of Heroes entry is a verbatim snapshot of a deleted knight.
pub type Hero = Knight;
