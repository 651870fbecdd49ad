//! Core entity structures

use crate::{CombatStats, KnightId, Timestamp};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The six ability scores a knight can key its attack on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ability {
    Strength,
    Dexterity,
    Constitution,
    Intelligence,
    Wisdom,
    Charisma,
}

impl Ability {
    /// Lowercase name, identical to the field name inside `attributes`.
    pub fn name(&self) -> &'static str {
        match self {
            Ability::Strength => "strength",
            Ability::Dexterity => "dexterity",
            Ability::Constitution => "constitution",
            Ability::Intelligence => "intelligence",
            Ability::Wisdom => "wisdom",
            Ability::Charisma => "charisma",
        }
    }

    /// Resolve a `keyAttribute` value. Matching is exact.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::all().into_iter().find(|ability| ability.name() == name)
    }

    pub fn all() -> [Ability; 6] {
        [
            Ability::Strength,
            Ability::Dexterity,
            Ability::Constitution,
            Ability::Intelligence,
            Ability::Wisdom,
            Ability::Charisma,
        ]
    }
}

impl fmt::Display for Ability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ability scores. A score left out of the payload stays `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Attributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strength: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dexterity: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constitution: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intelligence: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wisdom: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charisma: Option<i32>,
}

impl Attributes {
    pub fn new(str: i32, dex: i32, con: i32, int: i32, wis: i32, cha: i32) -> Self {
        Self {
            strength: Some(str),
            dexterity: Some(dex),
            constitution: Some(con),
            intelligence: Some(int),
            wisdom: Some(wis),
            charisma: Some(cha),
        }
    }

    pub fn get(&self, ability: Ability) -> Option<i32> {
        match ability {
            Ability::Strength => self.strength,
            Ability::Dexterity => self.dexterity,
            Ability::Constitution => self.constitution,
            Ability::Intelligence => self.intelligence,
            Ability::Wisdom => self.wisdom,
            Ability::Charisma => self.charisma,
        }
    }
}

/// Embedded weapon. Order matters: the first weapon is the active one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Weapon {
    pub name: String,
    #[serde(rename = "mod")]
    pub modifier: i32,
    /// Ability the weapon scales with. Informational only.
    pub attr: String,
    #[serde(default)]
    pub equipped: bool,
}

/// Client payload for creating a knight.
///
/// Carries no id and no derived stats; `attack`/`experience` sent by a client
/// are dropped during deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnightDraft {
    pub name: String,
    pub nickname: String,
    pub birthday: NaiveDate,
    #[serde(default)]
    pub weapons: Vec<Weapon>,
    #[serde(default)]
    pub attributes: Attributes,
    pub key_attribute: String,
}

/// Partial update payload. Present fields replace the stored ones wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KnightPatch {
    pub name: Option<String>,
    pub nickname: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub weapons: Option<Vec<Weapon>>,
    pub attributes: Option<Attributes>,
    pub key_attribute: Option<String>,
}

impl KnightPatch {
    /// Shallow merge over `base`.
    pub fn apply_to(self, base: KnightDraft) -> KnightDraft {
        KnightDraft {
            name: self.name.unwrap_or(base.name),
            nickname: self.nickname.unwrap_or(base.nickname),
            birthday: self.birthday.unwrap_or(base.birthday),
            weapons: self.weapons.unwrap_or(base.weapons),
            attributes: self.attributes.unwrap_or(base.attributes),
            key_attribute: self.key_attribute.unwrap_or(base.key_attribute),
        }
    }
}

/// Draft plus derived stats, ready to be handed to a store for insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewKnight {
    pub draft: KnightDraft,
    pub stats: CombatStats,
}

/// Persisted knight record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Knight {
    pub id: KnightId,
    pub name: String,
    pub nickname: String,
    pub birthday: NaiveDate,
    pub weapons: Vec<Weapon>,
    pub attributes: Attributes,
    pub key_attribute: String,
    pub attack: i32,
    pub experience: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Knight {
    /// Materialize a stored record from an insert request.
    pub fn from_new(id: KnightId, new: NewKnight, now: Timestamp) -> Self {
        let NewKnight { draft, stats } = new;
        Self {
            id,
            name: draft.name,
            nickname: draft.nickname,
            birthday: draft.birthday,
            weapons: draft.weapons,
            attributes: draft.attributes,
            key_attribute: draft.key_attribute,
            attack: stats.attack,
            experience: stats.experience,
            created_at: now,
            updated_at: now,
        }
    }

    /// The client-editable fields of this record.
    pub fn draft(&self) -> KnightDraft {
        KnightDraft {
            name: self.name.clone(),
            nickname: self.nickname.clone(),
            birthday: self.birthday,
            weapons: self.weapons.clone(),
            attributes: self.attributes.clone(),
            key_attribute: self.key_attribute.clone(),
        }
    }

    pub fn stats(&self) -> CombatStats {
        CombatStats {
            attack: self.attack,
            experience: self.experience,
        }
    }

    /// Same identity and timestamps, new base fields and stats.
    pub fn revise(&self, draft: KnightDraft, stats: CombatStats) -> Self {
        let mut revised = Self::from_new(self.id, NewKnight { draft, stats }, self.created_at);
        revised.updated_at = self.updated_at;
        revised
    }
}
