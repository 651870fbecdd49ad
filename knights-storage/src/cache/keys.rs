//! Cache key namespace.
//!
//! Exactly two shapes exist: the collection key `allKnights` and one
//! `knight:{id}` key per knight, with the id in canonical lowercase
//! hyphenated form.

use std::fmt;

use knights_core::KnightId;

/// Key holding the serialized array of every knight.
pub const ALL_KNIGHTS_KEY: &str = "allKnights";

/// Prefix of single-knight keys.
pub const KNIGHT_KEY_PREFIX: &str = "knight:";

/// A key in the knights cache namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    AllKnights,
    Knight(KnightId),
}

impl CacheKey {
    /// Render the wire form of this key.
    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Parse a wire key. Anything outside the namespace yields `None`.
    pub fn decode(raw: &str) -> Option<Self> {
        if raw == ALL_KNIGHTS_KEY {
            return Some(CacheKey::AllKnights);
        }
        raw.strip_prefix(KNIGHT_KEY_PREFIX)
            .and_then(|id| id.parse::<KnightId>().ok())
            .map(CacheKey::Knight)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::AllKnights => f.write_str(ALL_KNIGHTS_KEY),
            CacheKey::Knight(id) => write!(f, "{}{}", KNIGHT_KEY_PREFIX, id),
        }
    }
}
