//! Derived combat statistics.
//!
//! `attack` and `experience` are never accepted from clients; they are
//! recomputed from the base fields whenever a knight is created or updated.

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::{Ability, Attributes, KnightDraft, ValidationError};

const BASE_ATTACK: i32 = 10;
const EXPERIENCE_GRACE_YEARS: i32 = 7;
const EXPERIENCE_BASE: f64 = 22.0;
const EXPERIENCE_EXPONENT: f64 = 1.45;

/// The pair of derived stats stored on every knight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CombatStats {
    pub attack: i32,
    pub experience: i64,
}

/// Map an ability score onto its attack modifier band.
///
/// Scores outside `[0, 20]` match no band and contribute nothing.
pub fn attribute_modifier(score: i32) -> i32 {
    match score {
        0..=8 => -2,
        9..=10 => -1,
        11..=12 => 0,
        13..=15 => 1,
        16..=18 => 2,
        19..=20 => 3,
        _ => 0,
    }
}

/// `10 + band(attributes[key_attribute]) + equipped_weapon_mod`.
pub fn calculate_attack(
    key_attribute: &str,
    equipped_weapon_mod: i32,
    attributes: &Attributes,
) -> Result<i32, ValidationError> {
    let ability =
        Ability::from_name(key_attribute).ok_or_else(|| ValidationError::UnknownAttribute {
            name: key_attribute.to_string(),
        })?;
    let key_value = attributes
        .get(ability)
        .ok_or(ValidationError::MissingAttribute { ability })?;

    (BASE_ATTACK + attribute_modifier(key_value))
        .checked_add(equipped_weapon_mod)
        .ok_or(ValidationError::AttackOutOfRange {
            modifier: equipped_weapon_mod,
        })
}

/// `floor((age - 7) * 22^1.45)`, or zero for seven years and under.
pub fn calculate_experience(age: i32) -> i64 {
    if age <= EXPERIENCE_GRACE_YEARS {
        return 0;
    }
    let scale = EXPERIENCE_BASE.powf(EXPERIENCE_EXPONENT);
    (f64::from(age - EXPERIENCE_GRACE_YEARS) * scale).floor() as i64
}

/// Derive both stats for a knight as of `current_year`.
///
/// Age is a plain difference of calendar years; month and day of birth are
/// ignored. The active weapon is always `weapons[0]`, whatever its
/// `equipped` flag says.
pub fn calculate_attack_and_experience(
    knight: &KnightDraft,
    current_year: i32,
) -> Result<CombatStats, ValidationError> {
    let equipped_weapon_mod = knight
        .weapons
        .first()
        .map(|weapon| weapon.modifier)
        .ok_or(ValidationError::NoWeapons)?;
    let age = current_year - knight.birthday.year();

    let attack = calculate_attack(&knight.key_attribute, equipped_weapon_mod, &knight.attributes)?;
    let experience = calculate_experience(age);

    Ok(CombatStats { attack, experience })
}
