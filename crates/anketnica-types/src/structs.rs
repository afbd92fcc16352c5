//! Core entity structs for the Anketnica game economy.
//!
//! Catalog entries (species, recipes, horses) are immutable during play.
//! Zones, stacks, instruments and horse records are mutated by the engines
//! through their store traits.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{HabitatType, InstrumentKind, Rank};
use crate::ids::{
    CharacterId, HorseId, InstrumentId, LocationId, MarketEventId, MaterialId, RecipeId,
    SpeciesId, StackId, ZoneId,
};

// ---------------------------------------------------------------------------
// Bestiary
// ---------------------------------------------------------------------------

/// A bestiary entry: a creature that can be hunted or fished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Species {
    /// Catalog identifier.
    pub id: SpeciesId,
    /// Display name, also used to name the materials it yields.
    pub name: String,
    /// How dangerous the creature is; drives the loot tier.
    pub danger_rank: Rank,
    /// Where it lives; drives which body parts it yields.
    pub habitat_type: HabitatType,
    /// Raw JSON list of bonus drop names, as stored.
    pub drop_items: Option<String>,
    /// Lower bound of the whole-creature credit value.
    pub credit_value_min: u64,
    /// Upper bound of the whole-creature credit value.
    pub credit_value_max: u64,
}

/// A transient Echo Zone raising mutation odds at a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EchoZone {
    /// Zone identifier.
    pub id: ZoneId,
    /// Location the zone sits on.
    pub location_id: LocationId,
    /// Strength of the zone, 1 to 5.
    pub intensity: u8,
    /// Residual Aura, 0.0 to 1.0.
    pub residual_aura_level: f64,
    /// When a Beast last passed through.
    pub last_beast_migration: Option<DateTime<Utc>>,
    /// When the zone closes. `None` means open-ended.
    pub active_until: Option<DateTime<Utc>>,
}

impl EchoZone {
    /// Whether the zone is still open at `now`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.active_until.is_none_or(|until| until > now)
    }
}

// ---------------------------------------------------------------------------
// Materials
// ---------------------------------------------------------------------------

/// One stack of a material owned by a character.
///
/// A character may hold several stacks of the same material obtained at
/// different times with different quality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MaterialStack {
    /// Stack identifier.
    pub id: StackId,
    /// Owning character.
    pub owner_id: CharacterId,
    /// Catalog material.
    pub material_id: MaterialId,
    /// Catalog name of the material.
    pub material_name: String,
    /// Units in the stack. A stack at zero is deleted.
    pub quantity: u32,
    /// Quality of every unit in the stack, 0.5 to 2.0.
    pub quality_modifier: f64,
    /// When the stack was acquired. Crafting consumes oldest first.
    pub obtained_at: DateTime<Utc>,
}

/// Reference to a catalog material by id, by name, or both.
///
/// A stack matches when either the id or the name agrees.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MaterialRef {
    /// Catalog id, if known.
    #[serde(default, rename = "material_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<MaterialId>,
    /// Catalog name, if known.
    #[serde(default, rename = "material_name", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl MaterialRef {
    /// Reference by catalog id.
    pub const fn by_id(id: MaterialId) -> Self {
        Self {
            id: Some(id),
            name: None,
        }
    }

    /// Reference by catalog name.
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
        }
    }

    /// Whether `stack` holds the referenced material.
    pub fn matches(&self, stack: &MaterialStack) -> bool {
        self.id == Some(stack.material_id)
            || self
                .name
                .as_deref()
                .is_some_and(|name| name == stack.material_name)
    }
}

impl core::fmt::Display for MaterialRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match (&self.name, self.id) {
            (Some(name), _) => f.write_str(name),
            (None, Some(id)) => write!(f, "material #{id}"),
            (None, None) => f.write_str("unnamed material"),
        }
    }
}

/// A recipe line: how many units of a material are needed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MaterialRequirement {
    /// Which material.
    #[serde(flatten)]
    pub material: MaterialRef,
    /// Units required (or, in a shortfall report, units missing).
    pub quantity: u32,
}

// ---------------------------------------------------------------------------
// Crafting
// ---------------------------------------------------------------------------

/// A crafting recipe for a Sinki item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Recipe {
    /// Recipe identifier.
    pub id: RecipeId,
    /// Name of the produced item.
    pub item_name: String,
    /// Rank of the produced item.
    pub item_rank: Rank,
    /// Kind of the produced item (weapon, armour, trinket...).
    pub item_kind: String,
    /// Materials consumed by one attempt.
    pub required_materials: Vec<MaterialRequirement>,
    /// Success chance before quality and rank adjustments.
    pub base_success_chance: f64,
    /// Lowest crafter rank allowed to attempt it.
    pub min_crafter_rank: Rank,
    /// Property template copied onto the produced item.
    #[ts(type = "Record<string, unknown>")]
    pub item_properties: serde_json::Value,
    /// Flavour text copied onto the produced item.
    pub description: String,
    /// Inactive recipes cannot be crafted.
    pub is_active: bool,
}

/// Units of one stack consumed by a craft attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct UsedMaterial {
    /// Consumed material.
    pub material_id: MaterialId,
    /// Units taken from the stack.
    pub quantity: u32,
    /// Quality of the stack the units came from.
    pub quality_modifier: f64,
}

/// An item produced by a successful craft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CraftedItem {
    /// Item name.
    pub name: String,
    /// Item rank.
    pub rank: Rank,
    /// Item kind.
    pub kind: String,
    /// Final properties after quality scaling.
    #[ts(type = "Record<string, unknown>")]
    pub properties: serde_json::Value,
    /// Flavour text.
    pub description: String,
    /// Materials the item was made from, one entry per consumed stack.
    pub crafted_from: Vec<MaterialId>,
    /// When the item entered the inventory.
    pub obtained_at: DateTime<Utc>,
}

/// A row of a character's crafting history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CraftRecord {
    /// Who crafted.
    pub character_id: CharacterId,
    /// Which recipe was attempted.
    pub recipe_id: RecipeId,
    /// Name of the recipe's item, for display.
    pub item_name: String,
    /// Whether the roll succeeded.
    pub success: bool,
    /// What the attempt consumed.
    pub materials_used: Vec<UsedMaterial>,
    /// The produced item on success.
    pub item: Option<CraftedItem>,
    /// When the attempt was made.
    pub crafted_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Markets
// ---------------------------------------------------------------------------

/// A tradable instrument: a stock or a cryptocurrency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Instrument {
    /// Instrument identifier, unique within its kind.
    pub id: InstrumentId,
    /// Stock or crypto.
    pub kind: InstrumentKind,
    /// Display name.
    pub name: String,
    /// Ticker symbol.
    pub symbol: String,
    /// Current price, never below 0.01.
    #[ts(as = "String")]
    pub current_price: Decimal,
    /// Volatility rating as stored in the catalog.
    pub base_volatility: f64,
    /// Drift applied every tick, as a fraction of the price.
    pub base_trend: f64,
    /// Total supply (crypto only).
    pub total_supply: Option<u64>,
    /// Circulating supply (crypto only).
    pub circulating_supply: Option<u64>,
    /// Price times circulating supply (crypto only).
    #[ts(as = "Option<String>")]
    pub market_cap: Option<Decimal>,
}

/// A time-boxed modifier on instrument prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MarketEvent {
    /// Event identifier.
    pub id: MarketEventId,
    /// Which market the event belongs to.
    pub kind: InstrumentKind,
    /// Affected instrument, or `None` for a market-wide event.
    pub instrument_id: Option<InstrumentId>,
    /// Added to the per-tick change while the event is active.
    pub impact_strength: f64,
    /// Start of the active window.
    pub start_time: DateTime<Utc>,
    /// End of the active window.
    pub end_time: DateTime<Utc>,
}

impl MarketEvent {
    /// Whether `now` falls inside the event window.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.start_time <= now && now <= self.end_time
    }

    /// Whether the event moves `instrument`.
    pub fn applies_to(&self, instrument: InstrumentId) -> bool {
        self.instrument_id.is_none_or(|id| id == instrument)
    }
}

/// One entry of an instrument's price history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PricePoint {
    /// Instrument the price belongs to.
    pub instrument_id: InstrumentId,
    /// Recorded price.
    #[ts(as = "String")]
    pub price: Decimal,
    /// Millisecond-precision timestamp.
    pub recorded_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Casino
// ---------------------------------------------------------------------------

/// A racehorse from the stable catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Horse {
    /// Horse identifier.
    pub id: HorseId,
    /// Display name.
    pub name: String,
    /// Base speed, nominally 1 to 10.
    pub base_speed: u8,
    /// Base stamina, nominally 1 to 10.
    pub base_stamina: u8,
    /// Base luck, nominally 1 to 10.
    pub base_luck: u8,
    /// Flavour text.
    pub description: String,
}

impl Horse {
    /// Sum of the three base stats.
    pub fn rating(&self) -> u32 {
        u32::from(self.base_speed)
            .saturating_add(u32::from(self.base_stamina))
            .saturating_add(u32::from(self.base_luck))
    }
}

/// Aggregate race record of a horse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct HorseRecord {
    /// Horse the record belongs to.
    pub horse_id: HorseId,
    /// Races entered.
    pub total_races: u32,
    /// First places.
    pub wins: u32,
    /// Second places.
    pub second_places: u32,
    /// Third places.
    pub third_places: u32,
    /// Credits won as race winner.
    pub total_winnings: u64,
}

impl HorseRecord {
    /// Empty record of a horse that never raced.
    pub const fn new(horse_id: HorseId) -> Self {
        Self {
            horse_id,
            total_races: 0,
            wins: 0,
            second_places: 0,
            third_places: 0,
            total_winnings: 0,
        }
    }

    /// Count one finished race. Winnings are credited only for a win.
    pub const fn record(&mut self, position: u32, winnings: u64) {
        self.total_races = self.total_races.saturating_add(1);
        match position {
            1 => {
                self.wins = self.wins.saturating_add(1);
                self.total_winnings = self.total_winnings.saturating_add(winnings);
            }
            2 => self.second_places = self.second_places.saturating_add(1),
            3 => self.third_places = self.third_places.saturating_add(1),
            _ => {}
        }
    }

    /// Add another record's counts onto this one.
    pub const fn absorb(&mut self, tally: &Self) {
        self.total_races = self.total_races.saturating_add(tally.total_races);
        self.wins = self.wins.saturating_add(tally.wins);
        self.second_places = self.second_places.saturating_add(tally.second_places);
        self.third_places = self.third_places.saturating_add(tally.third_places);
        self.total_winnings = self.total_winnings.saturating_add(tally.total_winnings);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn stack(material_id: i64, name: &str) -> MaterialStack {
        MaterialStack {
            id: StackId::new(1),
            owner_id: CharacterId::new(1),
            material_id: MaterialId::new(material_id),
            material_name: name.to_owned(),
            quantity: 3,
            quality_modifier: 1.0,
            obtained_at: Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn material_ref_matches_by_id_or_name() {
        let hide = stack(7, "Шкура Волка");
        assert!(MaterialRef::by_id(MaterialId::new(7)).matches(&hide));
        assert!(MaterialRef::by_name("Шкура Волка").matches(&hide));
        assert!(!MaterialRef::by_name("Кости Волка").matches(&hide));
        assert!(!MaterialRef::default().matches(&hide));
    }

    #[test]
    fn requirement_uses_stored_json_shape() {
        let raw = r#"{"material_name":"Кости Волка","quantity":4}"#;
        let requirement: MaterialRequirement = serde_json::from_str(raw).unwrap();
        assert_eq!(requirement.material, MaterialRef::by_name("Кости Волка"));
        assert_eq!(requirement.quantity, 4);
    }

    #[test]
    fn zone_without_expiry_stays_active() {
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();
        let mut zone = EchoZone {
            id: ZoneId::new(1),
            location_id: LocationId::new(1),
            intensity: 3,
            residual_aura_level: 0.4,
            last_beast_migration: None,
            active_until: None,
        };
        assert!(zone.is_active(now));
        zone.active_until = Some(now - Duration::minutes(1));
        assert!(!zone.is_active(now));
    }

    #[test]
    fn global_event_applies_to_every_instrument() {
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();
        let event = MarketEvent {
            id: MarketEventId::new(1),
            kind: InstrumentKind::Stock,
            instrument_id: None,
            impact_strength: 0.02,
            start_time: now - Duration::hours(1),
            end_time: now + Duration::hours(1),
        };
        assert!(event.is_active(now));
        assert!(event.applies_to(InstrumentId::new(3)));
        assert!(!event.is_active(now + Duration::hours(2)));
    }

    #[test]
    fn horse_rating_sums_stats() {
        let horse = Horse {
            id: HorseId::new(9),
            name: "Шрек".to_owned(),
            base_speed: 5,
            base_stamina: 20,
            base_luck: 6,
            description: String::new(),
        };
        assert_eq!(horse.rating(), 31);
    }

    #[test]
    fn horse_record_counts_places() {
        let mut record = HorseRecord::new(HorseId::new(2));
        record.record(1, 1000);
        record.record(2, 500);
        record.record(3, 250);
        record.record(5, 0);
        assert_eq!(record.total_races, 4);
        assert_eq!(record.wins, 1);
        assert_eq!(record.second_places, 1);
        assert_eq!(record.third_places, 1);
        assert_eq!(record.total_winnings, 1000);
    }

    #[test]
    fn absorb_adds_every_counter() {
        let mut stored = HorseRecord::new(HorseId::new(2));
        stored.record(2, 500);
        let mut tally = HorseRecord::new(HorseId::new(2));
        tally.record(1, 1000);
        stored.absorb(&tally);
        stored.absorb(&tally);
        assert_eq!(stored.total_races, 3);
        assert_eq!(stored.wins, 2);
        assert_eq!(stored.second_places, 1);
        assert_eq!(stored.total_winnings, 2000);
    }
}
