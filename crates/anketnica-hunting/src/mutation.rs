//! Mutation classification of creatures met while hunting or fishing.
//!
//! Which classes an encounter can roll depends on the hunter's rank and the
//! Echo Zone over the location, if any. The zone's residual Aura drifts down
//! by 0.05 per ordinary encounter and jumps by 0.15 when a Beast is met.

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::seq::index;
use serde::Serialize;

use anketnica_types::calc::{clamp_f64, floor_u32};
use anketnica_types::{EchoZone, MutationClass, Rank};

/// Starting weight of each class before zone and rank shifts.
const BASE_WEIGHTS: [(MutationClass, f64); 3] = [
    (MutationClass::Affected, 0.70),
    (MutationClass::Distorted, 0.25),
    (MutationClass::Beast, 0.05),
];

/// Weight moved from Affected to Distorted per point of zone intensity.
const INTENSITY_SHIFT: f64 = 0.10;

/// Weight moved from Affected to Beast per unit of residual Aura.
const AURA_SHIFT: f64 = 0.15;

/// Weight moved from Affected to Beast per rank above C.
const RANK_SHIFT: f64 = 0.05;

/// Rank index from which hunters can meet Distorted creatures anywhere (D).
const DISTORTED_RANK_INDEX: u8 = 2;

/// Rank index from which hunters can meet Beasts in strong zones (B).
const BEAST_RANK_INDEX: u8 = 4;

/// Zone intensity that unlocks Distorted creatures for any rank.
const DISTORTED_ZONE_INTENSITY: u8 = 2;

/// Zone intensity Beasts need.
const BEAST_ZONE_INTENSITY: u8 = 4;

/// Aura below which no residual mutations appear.
const RESIDUAL_THRESHOLD: f64 = 0.3;

/// Aura lost by a zone per encounter without a Beast.
const AURA_DECAY: f64 = 0.05;

/// Aura gained by a zone when a Beast is met.
const AURA_SURGE: f64 = 0.15;

/// Ceiling of the Beast spawn chance.
const MAX_BEAST_SPAWN_CHANCE: f64 = 0.35;

/// Temporary traits residual Aura can grant, with their strength factor.
const RESIDUAL_TRAITS: [(&str, f64); 6] = [
    ("Увеличенный размер", 1.0),
    ("Агрессивность", 1.2),
    ("Укреплённая защита", 0.8),
    ("Ускоренная регенерация", 0.6),
    ("Элементальная аура", 1.0),
    ("Улучшенные чувства", 0.9),
];

// ---------------------------------------------------------------------------
// Availability and probabilities
// ---------------------------------------------------------------------------

/// Classes a hunter of `rank` can meet, in selection order.
///
/// Affected is always present. Distorted needs rank D or a zone of intensity
/// 2+. Beast needs both rank B and a zone of intensity 4+.
pub fn available_classes(zone: Option<&EchoZone>, rank: Rank) -> Vec<MutationClass> {
    let rank_index = rank.index();
    let intensity = zone.map_or(0, |z| z.intensity);

    let mut classes = vec![MutationClass::Affected];
    if rank_index >= DISTORTED_RANK_INDEX || intensity >= DISTORTED_ZONE_INTENSITY {
        classes.push(MutationClass::Distorted);
    }
    if rank_index >= BEAST_RANK_INDEX && intensity >= BEAST_ZONE_INTENSITY {
        classes.push(MutationClass::Beast);
    }
    classes
}

/// Selection weights of the available classes, in selection order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClassProbabilities {
    entries: Vec<(MutationClass, f64)>,
}

impl ClassProbabilities {
    /// Probability of `class`, zero when it is unavailable.
    pub fn get(&self, class: MutationClass) -> f64 {
        self.entries
            .iter()
            .find(|(c, _)| *c == class)
            .map_or(0.0, |(_, p)| *p)
    }

    /// Iterate `(class, probability)` pairs in selection order.
    pub fn iter(&self) -> impl Iterator<Item = (MutationClass, f64)> + '_ {
        self.entries.iter().copied()
    }

    /// Total retained probability mass.
    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, p)| p).sum()
    }

    /// Whether no class is available.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Weight each available class for selection.
///
/// Weights start at 0.70 / 0.25 / 0.05. A zone moves `intensity × 0.10`
/// from Affected to Distorted and `aura × 0.15` from Affected to Beast;
/// rank B and above moves another `(index − 3) × 0.05` to Beast. Weights
/// are floored at zero and divided by the total over all three classes,
/// after which unavailable classes are dropped. The dropped mass is not
/// redistributed, so the result sums to less than 1 when Beast or
/// Distorted is unavailable.
pub fn class_probabilities(
    available: &[MutationClass],
    zone: Option<&EchoZone>,
    rank: Rank,
) -> ClassProbabilities {
    if available.is_empty() {
        return ClassProbabilities::default();
    }

    let [(_, mut affected), (_, mut distorted), (_, mut beast)] = BASE_WEIGHTS;

    if let Some(zone) = zone {
        let intensity_mod = f64::from(zone.intensity) * INTENSITY_SHIFT;
        let aura_mod = clamp_f64(zone.residual_aura_level, 0.0, 1.0) * AURA_SHIFT;
        affected -= intensity_mod + aura_mod;
        distorted += intensity_mod;
        beast += aura_mod;
    }

    let rank_index = rank.index();
    if rank_index >= BEAST_RANK_INDEX {
        let rank_mod = f64::from(rank_index.saturating_sub(3)) * RANK_SHIFT;
        affected -= rank_mod;
        beast += rank_mod;
    }

    let weights = [
        (MutationClass::Affected, affected.max(0.0)),
        (MutationClass::Distorted, distorted.max(0.0)),
        (MutationClass::Beast, beast.max(0.0)),
    ];
    let total: f64 = weights.iter().map(|(_, w)| w).sum();

    let entries = weights
        .into_iter()
        .filter(|(class, _)| available.contains(class))
        .map(|(class, weight)| (class, if total > 0.0 { weight / total } else { 0.0 }))
        .collect();

    ClassProbabilities { entries }
}

/// Roll a class from `probabilities`.
///
/// Walks the classes in order accumulating probability and returns the
/// first whose running total reaches the draw. A draw beyond the retained
/// mass falls back to Affected.
pub fn select_class(probabilities: &ClassProbabilities, rng: &mut impl Rng) -> MutationClass {
    let roll: f64 = rng.random();
    let mut cumulative = 0.0;
    for (class, probability) in probabilities.iter() {
        cumulative += probability;
        if roll <= cumulative {
            return class;
        }
    }
    MutationClass::Affected
}

// ---------------------------------------------------------------------------
// Residual Aura
// ---------------------------------------------------------------------------

/// A temporary trait granted to a creature by residual Aura.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemporaryMutation {
    /// Trait name.
    pub trait_name: String,
    /// Trait strength, scaled from the Aura level.
    pub strength: f64,
    /// How long the trait lasts, in minutes.
    pub duration_minutes: u32,
}

/// Temporary traits a zone with `aura_level` grants to its creatures.
///
/// Below 0.3 there are none; otherwise `floor(aura × 3)` distinct traits
/// are drawn, each lasting `30 + aura × 60` minutes.
pub fn residual_mutations(aura_level: f64, rng: &mut impl Rng) -> Vec<TemporaryMutation> {
    let aura = clamp_f64(aura_level, 0.0, 1.0);
    if aura < RESIDUAL_THRESHOLD {
        return Vec::new();
    }

    let count = usize::try_from(floor_u32(aura * 3.0))
        .unwrap_or(0)
        .min(RESIDUAL_TRAITS.len());
    let duration_minutes = floor_u32(aura.mul_add(60.0, 30.0));

    index::sample(rng, RESIDUAL_TRAITS.len(), count)
        .into_iter()
        .filter_map(|i| RESIDUAL_TRAITS.get(i))
        .map(|(name, factor)| TemporaryMutation {
            trait_name: (*name).to_owned(),
            strength: aura * factor,
            duration_minutes,
        })
        .collect()
}

/// Chance that a Beast turns up in a zone.
///
/// Zero below intensity 4. Otherwise `0.05 + (intensity − 3) × 0.03`, plus
/// a bonus fading from +0.10 to 0 over the 24 hours after a migration, or
/// a bonus growing by 0.05 per week once a week has passed without one,
/// capped at +0.05. The result never exceeds 0.35.
pub fn beast_spawn_chance(
    intensity: u8,
    last_migration: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> f64 {
    if intensity < BEAST_ZONE_INTENSITY {
        return 0.0;
    }

    let mut chance = f64::from(intensity.saturating_sub(3)).mul_add(0.03, 0.05);

    if let Some(migration) = last_migration {
        let hours = hours_between(migration, now);
        if hours < 24.0 {
            chance += 0.10 * (1.0 - hours / 24.0);
        } else if hours > 168.0 {
            chance += ((hours - 168.0) / 168.0 * 0.05).min(0.05);
        }
    }

    chance.min(MAX_BEAST_SPAWN_CHANCE)
}

/// Non-negative hours from `from` to `to`.
#[allow(clippy::cast_precision_loss)]
fn hours_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let millis = to.signed_duration_since(from).num_milliseconds().max(0);
    millis as f64 / 3_600_000.0
}

/// Result of updating a zone's residual Aura after an encounter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AuraUpdate {
    /// Whether the level moved and must be persisted.
    pub changed: bool,
    /// The new level.
    pub new_level: f64,
}

/// Drift the residual Aura after an encounter.
///
/// Without a Beast the level decays by 0.05, floored at zero. A Beast
/// raises it by 0.15, capped at 1.0, and always counts as a change.
pub fn update_residual_aura(current_level: f64, beast_encountered: bool) -> AuraUpdate {
    if beast_encountered {
        return AuraUpdate {
            changed: true,
            new_level: (current_level + AURA_SURGE).min(1.0),
        };
    }

    let new_level = (current_level - AURA_DECAY).max(0.0);
    AuraUpdate {
        changed: (new_level - current_level).abs() > f64::EPSILON,
        new_level,
    }
}

// ---------------------------------------------------------------------------
// Loot modifiers
// ---------------------------------------------------------------------------

/// Loot multipliers attached to a mutation class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LootModifiers {
    /// Quality multiplier of harvested parts.
    pub quality_multiplier: f64,
    /// Base chance of a rare material.
    pub rare_material_chance: f64,
    /// Multiplier on credit values.
    pub credit_value_multiplier: f64,
}

/// Fixed loot multipliers of each class.
pub const fn loot_modifiers(class: MutationClass) -> LootModifiers {
    match class {
        MutationClass::Affected => LootModifiers {
            quality_multiplier: 1.0,
            rare_material_chance: 0.10,
            credit_value_multiplier: 1.0,
        },
        MutationClass::Distorted => LootModifiers {
            quality_multiplier: 1.3,
            rare_material_chance: 0.35,
            credit_value_multiplier: 1.5,
        },
        MutationClass::Beast => LootModifiers {
            quality_multiplier: 1.8,
            rare_material_chance: 0.75,
            credit_value_multiplier: 3.0,
        },
    }
}
