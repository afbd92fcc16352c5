//! Craft resolution.
//!
//! A craft attempt is validated, consumes its materials oldest first, then
//! rolls against a success chance raised by material quality and by crafter
//! rank above the recipe's minimum. A failed roll refunds part of every
//! consumed stack at reduced quality. All of it happens on a [`Stockpile`]
//! so the caller can persist the net result atomically.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use serde_json::Value;

use anketnica_types::calc::{clamp_f64, floor_u32};
use anketnica_types::{
    CraftedItem, MaterialId, MaterialRequirement, Rank, Recipe, StackId, UsedMaterial,
};

use crate::error::CraftError;
use crate::stockpile::Stockpile;

/// Lowest possible success chance.
pub const MIN_SUCCESS_CHANCE: f64 = 0.25;

/// Highest possible success chance.
pub const MAX_SUCCESS_CHANCE: f64 = 0.95;

/// Chance gained per unit of average quality above 1.0.
const QUALITY_WEIGHT: f64 = 0.15;

/// Chance gained per crafter rank above the recipe minimum.
const RANK_BONUS: f64 = 0.05;

/// Quality of refunded units relative to the consumed stack.
pub const REFUND_QUALITY_PENALTY: f64 = 0.8;

/// Average quality above which the item's bonus property is scaled.
const BONUS_QUALITY_THRESHOLD: f64 = 1.2;

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Whether a stockpile covers a recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaterialCheck {
    /// True when nothing is missing.
    pub sufficient: bool,
    /// Short requirements with the quantity still missing.
    pub missing: Vec<MaterialRequirement>,
}

/// Units returned to the crafter after a failed roll.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Refund {
    /// Refunded material.
    pub material_id: MaterialId,
    /// Units returned.
    pub quantity: u32,
    /// Quality of the returned units.
    pub quality_modifier: f64,
    /// Stack the units landed in; negative when newly opened.
    pub stack_id: StackId,
}

/// How a craft roll turned out. A failure is a normal outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CraftOutcome {
    /// The roll succeeded and produced an item.
    Crafted {
        /// The produced item.
        item: CraftedItem,
    },
    /// The roll failed and part of the materials came back.
    Failed {
        /// Percent of each consumed stack returned.
        return_percentage: u32,
        /// What came back.
        refunds: Vec<Refund>,
    },
}

/// Full result of a resolved craft attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CraftResolution {
    /// The chance the roll was made against.
    pub success_chance: f64,
    /// What the attempt consumed, one entry per stack.
    pub used: Vec<UsedMaterial>,
    /// Success or failure.
    pub outcome: CraftOutcome,
}

impl CraftResolution {
    /// Whether an item was produced.
    pub const fn is_success(&self) -> bool {
        matches!(self.outcome, CraftOutcome::Crafted { .. })
    }

    /// The produced item, if any.
    pub const fn item(&self) -> Option<&CraftedItem> {
        match &self.outcome {
            CraftOutcome::Crafted { item } => Some(item),
            CraftOutcome::Failed { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Formulas
// ---------------------------------------------------------------------------

/// Compare a stockpile against a recipe's requirements.
pub fn check_materials(stockpile: &Stockpile, recipe: &Recipe) -> MaterialCheck {
    let missing = stockpile.shortfall(&recipe.required_materials);
    MaterialCheck {
        sufficient: missing.is_empty(),
        missing,
    }
}

/// Mean quality over consumed stacks, 1.0 when nothing was consumed.
pub fn average_quality(used: &[UsedMaterial]) -> f64 {
    if used.is_empty() {
        return 1.0;
    }
    let sum: f64 = used.iter().map(|u| u.quality_modifier).sum();
    let count = u32::try_from(used.len()).unwrap_or(u32::MAX);
    sum / f64::from(count)
}

/// Success chance of an attempt.
///
/// `base + (avg quality − 1) × 0.15 + ranks above minimum × 0.05`,
/// clamped to `[0.25, 0.95]`.
pub fn success_chance(base: f64, used: &[UsedMaterial], crafter: Rank, required: Rank) -> f64 {
    let quality_term = (average_quality(used) - 1.0) * QUALITY_WEIGHT;
    let rank_term = f64::from(crafter.ranks_above(required)) * RANK_BONUS;
    clamp_f64(
        base + quality_term + rank_term,
        MIN_SUCCESS_CHANCE,
        MAX_SUCCESS_CHANCE,
    )
}

/// Percent of consumed materials returned on failure: `floor(10 + chance × 40)`.
pub fn return_percentage(success_chance: f64) -> u32 {
    floor_u32(success_chance.mul_add(40.0, 10.0))
}

/// Units of a consumed stack returned at `percentage`.
fn refund_quantity(consumed: u32, percentage: u32) -> u32 {
    let scaled = u64::from(consumed).saturating_mul(u64::from(percentage)) / 100;
    u32::try_from(scaled).unwrap_or(u32::MAX)
}

/// Build the item a successful craft produces.
///
/// A truthy numeric `bonus` property is scaled by the average quality and
/// floored when that average exceeds 1.2.
pub fn craft_item(recipe: &Recipe, used: &[UsedMaterial], now: DateTime<Utc>) -> CraftedItem {
    let average = average_quality(used);
    let mut properties = recipe.item_properties.clone();
    if average > BONUS_QUALITY_THRESHOLD {
        scale_bonus(&mut properties, average);
    }

    CraftedItem {
        name: recipe.item_name.clone(),
        rank: recipe.item_rank,
        kind: recipe.item_kind.clone(),
        properties,
        description: recipe.description.clone(),
        crafted_from: used.iter().map(|u| u.material_id).collect(),
        obtained_at: now,
    }
}

fn scale_bonus(properties: &mut Value, factor: f64) {
    let Some(bonus) = properties.get_mut("bonus") else {
        return;
    };
    let Some(current) = bonus.as_f64() else {
        return;
    };
    if current == 0.0 {
        return;
    }
    *bonus = floored_number(current * factor);
}

/// JSON number holding `floor(value)`, as an integer when it fits.
#[allow(clippy::cast_possible_truncation)]
fn floored_number(value: f64) -> Value {
    let floored = value.floor();
    if floored.abs() < 9.0e15 {
        Value::from(floored as i64)
    } else {
        Value::from(floored)
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Validate, consume, roll and, on failure, refund.
///
/// Validation failures leave `stockpile` untouched.
pub fn resolve_craft(
    recipe: &Recipe,
    crafter_rank: Rank,
    stockpile: &mut Stockpile,
    now: DateTime<Utc>,
    rng: &mut impl Rng,
) -> Result<CraftResolution, CraftError> {
    if !recipe.is_active {
        return Err(CraftError::RecipeInactive { recipe: recipe.id });
    }
    if crafter_rank < recipe.min_crafter_rank {
        return Err(CraftError::RankTooLow {
            required: recipe.min_crafter_rank,
            actual: crafter_rank,
        });
    }
    let check = check_materials(stockpile, recipe);
    if !check.sufficient {
        return Err(CraftError::InsufficientMaterials {
            missing: check.missing,
        });
    }

    let mut used = Vec::new();
    for requirement in &recipe.required_materials {
        used.extend(stockpile.consume(&requirement.material, requirement.quantity)?);
    }

    let chance = success_chance(
        recipe.base_success_chance,
        &used,
        crafter_rank,
        recipe.min_crafter_rank,
    );
    let roll: f64 = rng.random();

    let outcome = if roll <= chance {
        CraftOutcome::Crafted {
            item: craft_item(recipe, &used, now),
        }
    } else {
        let percentage = return_percentage(chance);
        let mut refunds = Vec::new();
        for entry in &used {
            let quantity = refund_quantity(entry.quantity, percentage);
            if quantity == 0 {
                continue;
            }
            let quality_modifier = entry.quality_modifier * REFUND_QUALITY_PENALTY;
            let stack_id = stockpile.refund(entry.material_id, quantity, quality_modifier, now)?;
            refunds.push(Refund {
                material_id: entry.material_id,
                quantity,
                quality_modifier,
                stack_id,
            });
        }
        CraftOutcome::Failed {
            return_percentage: percentage,
            refunds,
        }
    };

    Ok(CraftResolution {
        success_chance: chance,
        used,
        outcome,
    })
}
