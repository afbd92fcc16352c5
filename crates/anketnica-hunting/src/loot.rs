//! Loot generation from captured creatures.
//!
//! A capture always yields a primary and a secondary body part. The mutation
//! class adds a class-specific part, a roll may add an Aura crystal, and the
//! species' stored drop list supplies named bonus items.

use rand::Rng;
use serde::Serialize;

use anketnica_types::calc::{clamp_f64, floor_u32, floor_u64, u64_to_f64};
use anketnica_types::json::{or_default_logged, parse_optional};
use anketnica_types::{HabitatType, MaterialType, MutationClass, Rank, Species, SpeciesId};

/// Credit value of a tier-1, base-category, Affected material.
const BASE_MATERIAL_VALUE: f64 = 1000.0;

/// Secondary part quantity as a fraction of the primary quantity.
const SECONDARY_SHARE: f64 = 0.6;

/// Harvest quality above which an Affected creature yields a reinforced part.
const REINFORCED_PART_QUALITY: f64 = 60.0;

/// Harvest quality above which a Beast yields its heart.
const BEAST_HEART_QUALITY: f64 = 70.0;

/// Highest rarity tier.
const MAX_RARITY: u8 = 5;

/// Ceiling of the rare material threshold, in percent.
const MAX_RARE_THRESHOLD: f64 = 95.0;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// One material stack to grant to the hunter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LootMaterial {
    /// Catalog name; the store creates the catalog entry if it is new.
    pub name: String,
    /// Material family.
    pub material_type: MaterialType,
    /// Class of the creature it came from.
    pub mutation_class: MutationClass,
    /// Species it came from.
    pub source_species_id: SpeciesId,
    /// Aura property carried by the material, if any.
    pub aura_property: Option<String>,
    /// Rarity tier, 1 to 5.
    pub rarity_tier: u8,
    /// Units granted. May be zero for very poor harvests.
    pub quantity: u32,
    /// Quality of every unit, 0.5 to 2.0.
    pub quality_modifier: f64,
    /// Credit value of one unit.
    pub credit_value: u64,
}

/// Everything a capture yields.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LootResult {
    /// Materials in generation order.
    pub materials: Vec<LootMaterial>,
    /// Total credit value of the materials plus the whole creature.
    pub total_value: u64,
    /// Bonus item names from the species' drop list.
    pub bonus_items: Vec<String>,
}

/// Valuation category of a generated material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialCategory {
    /// Primary body part.
    Base,
    /// Bones or scales.
    Secondary,
    /// Reinforced part of an Affected creature.
    Special,
    /// Elemental component of a Distorted creature.
    Elemental,
    /// Aura essence of a Beast.
    Essence,
    /// Heart of a Beast.
    Heart,
    /// Crystallised Aura.
    Crystal,
}

impl MaterialCategory {
    /// Value multiplier of the category.
    pub const fn multiplier(self) -> f64 {
        match self {
            Self::Base => 1.0,
            Self::Secondary => 0.7,
            Self::Special => 1.5,
            Self::Elemental => 3.0,
            Self::Essence => 8.0,
            Self::Heart => 15.0,
            Self::Crystal => 20.0,
        }
    }
}

/// Element of a Distorted creature, guessed from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Element {
    /// Electric creatures.
    Electricity,
    /// Ice and crystal creatures.
    Ice,
    /// Fire creatures.
    Fire,
    /// Mist and venom creatures.
    Poison,
    /// Stone and rock creatures.
    Stone,
    /// Wind creatures.
    Air,
    /// Anything else.
    Neutral,
}

/// Name fragments (lowercase) that identify each element, checked in order.
const ELEMENT_KEYWORDS: [(Element, [&str; 2]); 6] = [
    (Element::Electricity, ["вольт", "электр"]),
    (Element::Ice, ["кристалл", "лёд"]),
    (Element::Fire, ["огн", "пламен"]),
    (Element::Poison, ["туман", "яд"]),
    (Element::Stone, ["камен", "скал"]),
    (Element::Air, ["ветр", "возд"]),
];

impl Element {
    /// Guess the element from a species name.
    pub fn from_species_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        ELEMENT_KEYWORDS
            .iter()
            .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
            .map_or(Self::Neutral, |(element, _)| *element)
    }

    /// In-game name of the element.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Electricity => "Электричество",
            Self::Ice => "Лёд",
            Self::Fire => "Огонь",
            Self::Poison => "Яд",
            Self::Stone => "Камень",
            Self::Air => "Воздух",
            Self::Neutral => "Нейтральная энергия",
        }
    }

    /// Material family of the element's component.
    pub const fn material_type(self) -> MaterialType {
        match self {
            Self::Electricity | Self::Ice => MaterialType::Crystal,
            Self::Stone => MaterialType::Metal,
            Self::Poison => MaterialType::Essence,
            Self::Fire | Self::Air | Self::Neutral => MaterialType::Special,
        }
    }
}

// ---------------------------------------------------------------------------
// Formulas
// ---------------------------------------------------------------------------

/// Loot tier of a danger rank: F/E 1, D/C 2, B 3, A 4, S and above 5.
pub const fn rank_tier(rank: Rank) -> u8 {
    match rank {
        Rank::F | Rank::E => 1,
        Rank::D | Rank::C => 2,
        Rank::B => 3,
        Rank::A => 4,
        Rank::S | Rank::SS | Rank::SSS => 5,
    }
}

/// Map a harvest quality in `[0, 100]` to a multiplier in `[0.5, 2.0]`.
pub fn quality_multiplier(harvest_quality: f64) -> f64 {
    (clamp_f64(harvest_quality, 0.0, 100.0) / 100.0).mul_add(1.5, 0.5)
}

/// Harvest quality from a minigame result.
///
/// `score + (difficulty − 1) × 10 + perfect_hits × 5`, clamped to `[0, 100]`.
pub fn harvest_quality(minigame_score: f64, difficulty: f64, perfect_hits: u32) -> f64 {
    let quality = (difficulty - 1.0).mul_add(10.0, minigame_score) + f64::from(perfect_hits) * 5.0;
    clamp_f64(quality, 0.0, 100.0)
}

/// Credit value of one unit of a material.
///
/// `1000 × 5^(tier − 1) × class × category`, floored. Class multipliers are
/// 1.0 / 2.5 / 10.0 for Affected / Distorted / Beast.
pub fn material_value(rarity_tier: u8, class: MutationClass, category: MaterialCategory) -> u64 {
    let exponent = i32::from(rarity_tier.max(1)) - 1;
    let class_multiplier = match class {
        MutationClass::Affected => 1.0,
        MutationClass::Distorted => 2.5,
        MutationClass::Beast => 10.0,
    };
    let value = BASE_MATERIAL_VALUE * 5.0_f64.powi(exponent) * class_multiplier
        * category.multiplier();
    floor_u64(value)
}

/// Percent threshold below which the rare material roll succeeds.
///
/// `10 + quality × 0.3 + class bonus (5 / 15 / 30) + intensity × 5`,
/// capped at 95.
pub fn rare_material_threshold(class: MutationClass, harvest_quality: f64, zone_intensity: u8) -> f64 {
    let class_bonus = match class {
        MutationClass::Affected => 5.0,
        MutationClass::Distorted => 15.0,
        MutationClass::Beast => 30.0,
    };
    let threshold = clamp_f64(harvest_quality, 0.0, 100.0).mul_add(0.3, 10.0)
        + class_bonus
        + f64::from(zone_intensity) * 5.0;
    threshold.min(MAX_RARE_THRESHOLD)
}

/// Class multiplier applied to the whole-creature value.
const fn creature_value_multiplier(class: MutationClass) -> f64 {
    match class {
        MutationClass::Affected => 1.0,
        MutationClass::Distorted => 1.5,
        MutationClass::Beast => 3.0,
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Inputs of a loot roll.
#[derive(Debug, Clone, Copy)]
pub struct LootContext<'a> {
    /// The captured species.
    pub species: &'a Species,
    /// The class rolled for this encounter.
    pub class: MutationClass,
    /// Harvest quality from the minigame, 0 to 100.
    pub harvest_quality: f64,
    /// Rank of the hunter.
    pub actor_rank: Rank,
    /// Intensity of the Echo Zone, zero outside one.
    pub zone_intensity: u8,
}

/// Generate the loot of one capture.
pub fn generate_loot(ctx: &LootContext<'_>, rng: &mut impl Rng) -> LootResult {
    let species = ctx.species;
    let harvest_quality = clamp_f64(ctx.harvest_quality, 0.0, 100.0);
    let quality = quality_multiplier(harvest_quality);
    let tier = rank_tier(species.danger_rank);
    let part = PartFactory {
        species,
        class: ctx.class,
        quality,
    };

    let mut materials = base_materials(&part, tier);
    materials.extend(class_materials(&part, tier, harvest_quality));

    let threshold = rare_material_threshold(ctx.class, harvest_quality, ctx.zone_intensity);
    let roll = rng.random::<f64>() * 100.0;
    if roll < threshold {
        materials.push(part.make(
            format!("Кристалл Ауры ({})", ctx.class),
            MaterialType::Crystal,
            Some("Кристаллизованная Аура"),
            tier.saturating_add(2).min(MAX_RARITY),
            1,
            material_value(tier.saturating_add(2), ctx.class, MaterialCategory::Crystal),
        ));
    }

    let bonus_items: Vec<String> = or_default_logged(
        parse_optional(species.drop_items.as_deref()),
        "bestiary_species.drop_items",
    );

    let total_value = total_value(&materials, species, ctx.class);

    tracing::debug!(
        species = %species.name,
        class = %ctx.class,
        actor_rank = %ctx.actor_rank,
        harvest_quality,
        materials = materials.len(),
        rare_roll = roll,
        rare_threshold = threshold,
        total_value,
        "Generated loot"
    );

    LootResult {
        materials,
        total_value,
        bonus_items,
    }
}

/// Shared fields of every part cut from one creature.
struct PartFactory<'a> {
    species: &'a Species,
    class: MutationClass,
    quality: f64,
}

impl PartFactory<'_> {
    fn make(
        &self,
        name: String,
        material_type: MaterialType,
        aura_property: Option<&str>,
        rarity_tier: u8,
        quantity: u32,
        credit_value: u64,
    ) -> LootMaterial {
        LootMaterial {
            name,
            material_type,
            mutation_class: self.class,
            source_species_id: self.species.id,
            aura_property: aura_property.map(str::to_owned),
            rarity_tier,
            quantity,
            quality_modifier: self.quality,
            credit_value,
        }
    }
}

/// Primary and secondary body parts.
fn base_materials(part: &PartFactory<'_>, tier: u8) -> Vec<LootMaterial> {
    let species = part.species;
    let primary_name = match species.habitat_type {
        HabitatType::Water => format!("Мясо {}", species.name),
        HabitatType::Air => format!("Перья {}", species.name),
        HabitatType::Land | HabitatType::Underground | HabitatType::Amphibian => {
            format!("Шкура {}", species.name)
        }
    };
    let secondary_name = if species.habitat_type == HabitatType::Water {
        format!("Чешуя {}", species.name)
    } else {
        format!("Кости {}", species.name)
    };

    let base_quantity = f64::from(tier).mul_add(2.0, 2.0);
    let primary_quantity = floor_u32(base_quantity * part.quality);
    let secondary_quantity = floor_u32(f64::from(primary_quantity) * SECONDARY_SHARE);

    vec![
        part.make(
            primary_name,
            MaterialType::Organic,
            None,
            tier,
            primary_quantity,
            material_value(tier, part.class, MaterialCategory::Base),
        ),
        part.make(
            secondary_name,
            MaterialType::Organic,
            None,
            tier,
            secondary_quantity,
            material_value(tier, part.class, MaterialCategory::Secondary),
        ),
    ]
}

/// The part only creatures of a given class yield.
fn class_materials(part: &PartFactory<'_>, tier: u8, harvest_quality: f64) -> Vec<LootMaterial> {
    let species = part.species;
    match part.class {
        MutationClass::Affected => {
            if harvest_quality > REINFORCED_PART_QUALITY {
                vec![part.make(
                    format!("Укреплённая часть {}", species.name),
                    MaterialType::Organic,
                    None,
                    tier,
                    1,
                    material_value(tier, part.class, MaterialCategory::Special),
                )]
            } else {
                Vec::new()
            }
        }
        MutationClass::Distorted => {
            let element = Element::from_species_name(&species.name);
            vec![part.make(
                format!("{} компонент", element.label()),
                element.material_type(),
                Some(element.label()),
                tier.saturating_add(1).min(MAX_RARITY),
                floor_u32(1.0 + part.quality),
                material_value(tier.saturating_add(1), part.class, MaterialCategory::Elemental),
            )]
        }
        MutationClass::Beast => {
            let mut parts = vec![part.make(
                format!("Эссенция Ауры: {}", species.name),
                MaterialType::Essence,
                Some("Чистая Аура"),
                MAX_RARITY,
                1,
                material_value(tier, part.class, MaterialCategory::Essence),
            )];
            if harvest_quality > BEAST_HEART_QUALITY {
                parts.push(part.make(
                    format!("Сердце Бестии: {}", species.name),
                    MaterialType::Special,
                    Some("Концентрированная мощь"),
                    MAX_RARITY,
                    1,
                    material_value(MAX_RARITY, part.class, MaterialCategory::Heart),
                ));
            }
            parts
        }
    }
}

/// Sum of unit value times quantity, plus the whole-creature value.
fn total_value(materials: &[LootMaterial], species: &Species, class: MutationClass) -> u64 {
    let parts = materials.iter().fold(0_u64, |sum, m| {
        sum.saturating_add(m.credit_value.saturating_mul(u64::from(m.quantity)))
    });
    let average = (u64_to_f64(species.credit_value_min) + u64_to_f64(species.credit_value_max)) / 2.0;
    parts.saturating_add(floor_u64(average * creature_value_multiplier(class)))
}
