//! In-memory store.
//!
//! Implements the same store traits as [`SqliteStore`] over plain
//! collections behind a mutex. Useful for tests and local runs that do not
//! need a database file. Writes of a craft commit are validated before any
//! of them is applied, so a commit is atomic here too.
//!
//! [`SqliteStore`]: crate::sqlite::SqliteStore

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use anketnica_casino::StableStore;
use anketnica_crafting::{CraftCommit, CraftingStore, StackChange};
use anketnica_hunting::{HuntingStore, LootMaterial};
use anketnica_market::MarketStore;
use anketnica_types::{
    CharacterId, CraftRecord, CraftedItem, EchoZone, Horse, HorseId, HorseRecord, Instrument,
    InstrumentId, InstrumentKind, LocationId, MarketEvent, MarketEventId, MaterialId,
    MaterialStack, PricePoint, Rank, Recipe, RecipeId, Species, SpeciesId, StackId, StoreError,
    ZoneId,
};

#[derive(Debug, Default)]
struct State {
    next_id: i64,
    characters: BTreeMap<CharacterId, Rank>,
    species: BTreeMap<SpeciesId, Species>,
    zones: BTreeMap<ZoneId, EchoZone>,
    materials: BTreeMap<MaterialId, String>,
    stacks: Vec<MaterialStack>,
    recipes: BTreeMap<RecipeId, Recipe>,
    inventory: Vec<(CharacterId, CraftedItem)>,
    history: Vec<CraftRecord>,
    instruments: Vec<Instrument>,
    price_history: Vec<(InstrumentKind, PricePoint)>,
    events: Vec<MarketEvent>,
    horses: BTreeMap<HorseId, (Horse, HorseRecord)>,
}

impl State {
    const fn next_id(&mut self) -> i64 {
        self.next_id = self.next_id.saturating_add(1);
        self.next_id
    }

    fn material_by_name(&mut self, name: &str) -> MaterialId {
        if let Some((&id, _)) = self.materials.iter().find(|(_, n)| n.as_str() == name) {
            return id;
        }
        let id = MaterialId::new(self.next_id());
        self.materials.insert(id, name.to_owned());
        id
    }
}

/// Shared in-memory store. Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state.lock().map_err(|e| StoreError::Unavailable {
            reason: format!("memory store lock poisoned: {e}"),
        })
    }

    // -----------------------------------------------------------------------
    // Seeding
    // -----------------------------------------------------------------------

    /// Add a character.
    pub fn add_character(&self, rank: Rank) -> Result<CharacterId, StoreError> {
        let mut state = self.state()?;
        let id = CharacterId::new(state.next_id());
        state.characters.insert(id, rank);
        Ok(id)
    }

    /// Add a bestiary entry under a fresh id.
    pub fn add_species(&self, species: Species) -> Result<SpeciesId, StoreError> {
        let mut state = self.state()?;
        let id = SpeciesId::new(state.next_id());
        state.species.insert(id, Species { id, ..species });
        Ok(id)
    }

    /// Open an Echo Zone under a fresh id.
    pub fn add_zone(&self, zone: EchoZone) -> Result<ZoneId, StoreError> {
        let mut state = self.state()?;
        let id = ZoneId::new(state.next_id());
        state.zones.insert(id, EchoZone { id, ..zone });
        Ok(id)
    }

    /// Catalog id of a material name, added if new.
    pub fn ensure_material(&self, name: &str) -> Result<MaterialId, StoreError> {
        Ok(self.state()?.material_by_name(name))
    }

    /// Add a stack under a fresh id. Its material name is resolved from
    /// the catalog.
    pub fn add_stack(&self, stack: MaterialStack) -> Result<StackId, StoreError> {
        let mut state = self.state()?;
        let id = StackId::new(state.next_id());
        let material_name = state
            .materials
            .get(&stack.material_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("material", stack.material_id))?;
        state.stacks.push(MaterialStack {
            id,
            material_name,
            ..stack
        });
        Ok(id)
    }

    /// Add a recipe under a fresh id.
    pub fn add_recipe(&self, recipe: Recipe) -> Result<RecipeId, StoreError> {
        let mut state = self.state()?;
        let id = RecipeId::new(state.next_id());
        state.recipes.insert(id, Recipe { id, ..recipe });
        Ok(id)
    }

    /// Add an instrument under a fresh id.
    pub fn add_instrument(&self, instrument: Instrument) -> Result<InstrumentId, StoreError> {
        let mut state = self.state()?;
        let id = InstrumentId::new(state.next_id());
        state.instruments.push(Instrument { id, ..instrument });
        Ok(id)
    }

    /// Schedule a market event under a fresh id.
    pub fn add_event(&self, event: MarketEvent) -> Result<MarketEventId, StoreError> {
        let mut state = self.state()?;
        let id = MarketEventId::new(state.next_id());
        state.events.push(MarketEvent { id, ..event });
        Ok(id)
    }

    /// Add a horse with an empty record under a fresh id.
    pub fn add_horse(&self, horse: Horse) -> Result<HorseId, StoreError> {
        let mut state = self.state()?;
        let id = HorseId::new(state.next_id());
        state
            .horses
            .insert(id, (Horse { id, ..horse }, HorseRecord::new(id)));
        Ok(id)
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    /// A character's stacks, oldest first.
    pub fn stacks_of(&self, owner: CharacterId) -> Result<Vec<MaterialStack>, StoreError> {
        let state = self.state()?;
        let mut stacks: Vec<_> = state
            .stacks
            .iter()
            .filter(|s| s.owner_id == owner)
            .cloned()
            .collect();
        stacks.sort_by(|a, b| a.obtained_at.cmp(&b.obtained_at).then(a.id.cmp(&b.id)));
        Ok(stacks)
    }

    /// Items a character owns.
    pub fn inventory_of(&self, owner: CharacterId) -> Result<Vec<CraftedItem>, StoreError> {
        Ok(self
            .state()?
            .inventory
            .iter()
            .filter(|(o, _)| *o == owner)
            .map(|(_, item)| item.clone())
            .collect())
    }

    /// A zone by id.
    pub fn zone(&self, id: ZoneId) -> Result<Option<EchoZone>, StoreError> {
        Ok(self.state()?.zones.get(&id).cloned())
    }

    /// An instrument by id.
    pub fn instrument(
        &self,
        kind: InstrumentKind,
        id: InstrumentId,
    ) -> Result<Option<Instrument>, StoreError> {
        Ok(self
            .state()?
            .instruments
            .iter()
            .find(|i| i.kind == kind && i.id == id)
            .cloned())
    }

    /// Price history of an instrument, oldest first.
    pub fn price_history(
        &self,
        kind: InstrumentKind,
        id: InstrumentId,
    ) -> Result<Vec<PricePoint>, StoreError> {
        Ok(self
            .state()?
            .price_history
            .iter()
            .filter(|(k, p)| *k == kind && p.instrument_id == id)
            .map(|(_, p)| p.clone())
            .collect())
    }
}

fn stale_stack(stack_id: StackId, expected: u32) -> StoreError {
    StoreError::Conflict {
        reason: format!("stack {stack_id} no longer holds {expected} units"),
    }
}

fn apply_stack_change(
    stacks: &mut Vec<MaterialStack>,
    owner: CharacterId,
    change: &StackChange,
    new_id: StackId,
    name: String,
) -> Result<(), StoreError> {
    match change {
        StackChange::Delete { stack_id, expected } => {
            let before = stacks.len();
            stacks.retain(|s| {
                !(s.id == *stack_id && s.owner_id == owner && s.quantity == *expected)
            });
            if stacks.len() == before {
                return Err(stale_stack(*stack_id, *expected));
            }
        }
        StackChange::Adjust {
            stack_id,
            expected,
            delta,
        } => {
            let stack = stacks
                .iter_mut()
                .find(|s| s.id == *stack_id && s.owner_id == owner && s.quantity == *expected)
                .ok_or_else(|| stale_stack(*stack_id, *expected))?;
            let next = i64::from(stack.quantity).saturating_add(*delta);
            stack.quantity = u32::try_from(next)
                .ok()
                .filter(|q| *q > 0)
                .ok_or_else(|| StoreError::Conflict {
                    reason: format!("stack {stack_id} cannot hold {next} units"),
                })?;
        }
        StackChange::Create {
            material_id,
            quantity,
            quality_modifier,
            obtained_at,
        } => stacks.push(MaterialStack {
            id: new_id,
            owner_id: owner,
            material_id: *material_id,
            material_name: name,
            quantity: *quantity,
            quality_modifier: *quality_modifier,
            obtained_at: *obtained_at,
        }),
    }
    Ok(())
}

impl HuntingStore for MemoryStore {
    async fn actor_rank(&self, actor: CharacterId) -> Result<Rank, StoreError> {
        self.state()?
            .characters
            .get(&actor)
            .copied()
            .ok_or_else(|| StoreError::not_found("character", actor))
    }

    async fn species(&self, id: SpeciesId) -> Result<Species, StoreError> {
        self.state()?
            .species
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("species", id))
    }

    async fn active_zone(
        &self,
        location: LocationId,
        now: DateTime<Utc>,
    ) -> Result<Option<EchoZone>, StoreError> {
        Ok(self
            .state()?
            .zones
            .values()
            .rev()
            .find(|z| z.location_id == location && z.is_active(now))
            .cloned())
    }

    async fn grant_loot(
        &self,
        owner: CharacterId,
        materials: &[LootMaterial],
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut state = self.state()?;
        for material in materials {
            let material_id = state.material_by_name(&material.name);
            let id = StackId::new(state.next_id());
            state.stacks.push(MaterialStack {
                id,
                owner_id: owner,
                material_id,
                material_name: material.name.clone(),
                quantity: material.quantity,
                quality_modifier: material.quality_modifier,
                obtained_at: now,
            });
        }
        Ok(())
    }

    async fn save_zone_aura(
        &self,
        zone: ZoneId,
        residual_aura_level: f64,
        last_beast_migration: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        let mut state = self.state()?;
        let stored = state
            .zones
            .get_mut(&zone)
            .ok_or_else(|| StoreError::not_found("echo zone", zone))?;
        stored.residual_aura_level = residual_aura_level;
        stored.last_beast_migration = last_beast_migration;
        Ok(())
    }
}

impl CraftingStore for MemoryStore {
    async fn recipe(&self, id: RecipeId) -> Result<Option<Recipe>, StoreError> {
        Ok(self.state()?.recipes.get(&id).cloned())
    }

    async fn active_recipes(&self) -> Result<Vec<Recipe>, StoreError> {
        Ok(self
            .state()?
            .recipes
            .values()
            .filter(|r| r.is_active)
            .cloned()
            .collect())
    }

    async fn actor_rank(&self, actor: CharacterId) -> Result<Rank, StoreError> {
        <Self as HuntingStore>::actor_rank(self, actor).await
    }

    async fn material_stacks(
        &self,
        owner: CharacterId,
    ) -> Result<Vec<MaterialStack>, StoreError> {
        self.stacks_of(owner)
    }

    async fn commit_craft(&self, commit: &CraftCommit) -> Result<(), StoreError> {
        let mut state = self.state()?;
        let mut stacks = state.stacks.clone();
        for change in &commit.changes {
            let new_id = StackId::new(state.next_id());
            let name = match change {
                StackChange::Create { material_id, .. } => {
                    state.materials.get(material_id).cloned().unwrap_or_default()
                }
                StackChange::Delete { .. } | StackChange::Adjust { .. } => String::new(),
            };
            apply_stack_change(&mut stacks, commit.owner, change, new_id, name)?;
        }
        state.stacks = stacks;
        if let Some(item) = &commit.item {
            state.inventory.push((commit.owner, item.clone()));
        }
        state.history.push(commit.record.clone());
        Ok(())
    }

    async fn craft_history(
        &self,
        owner: CharacterId,
        limit: Option<u32>,
    ) -> Result<Vec<CraftRecord>, StoreError> {
        let state = self.state()?;
        let rows = state
            .history
            .iter()
            .rev()
            .filter(|r| r.character_id == owner)
            .cloned();
        Ok(match limit.and_then(|l| usize::try_from(l).ok()) {
            Some(limit) => rows.take(limit).collect(),
            None => rows.collect(),
        })
    }
}

impl MarketStore for MemoryStore {
    async fn instruments(&self, kind: InstrumentKind) -> Result<Vec<Instrument>, StoreError> {
        Ok(self
            .state()?
            .instruments
            .iter()
            .filter(|i| i.kind == kind)
            .cloned()
            .collect())
    }

    async fn active_events(
        &self,
        kind: InstrumentKind,
        now: DateTime<Utc>,
    ) -> Result<Vec<MarketEvent>, StoreError> {
        Ok(self
            .state()?
            .events
            .iter()
            .filter(|e| e.kind == kind && e.is_active(now))
            .cloned()
            .collect())
    }

    async fn set_instrument_price(
        &self,
        kind: InstrumentKind,
        id: InstrumentId,
        price: Decimal,
        market_cap: Option<Decimal>,
    ) -> Result<(), StoreError> {
        let mut state = self.state()?;
        let instrument = state
            .instruments
            .iter_mut()
            .find(|i| i.kind == kind && i.id == id)
            .ok_or_else(|| StoreError::not_found("instrument", id))?;
        instrument.current_price = price;
        if market_cap.is_some() {
            instrument.market_cap = market_cap;
        }
        Ok(())
    }

    async fn append_price_history(
        &self,
        kind: InstrumentKind,
        point: &PricePoint,
    ) -> Result<(), StoreError> {
        self.state()?.price_history.push((kind, point.clone()));
        Ok(())
    }

    async fn prune_history_older_than(
        &self,
        kind: InstrumentKind,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let mut state = self.state()?;
        let before = state.price_history.len();
        state
            .price_history
            .retain(|(k, p)| *k != kind || p.recorded_at >= cutoff);
        Ok(removed(before, state.price_history.len()))
    }

    async fn prune_expired_events(
        &self,
        kind: InstrumentKind,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let mut state = self.state()?;
        let before = state.events.len();
        state.events.retain(|e| e.kind != kind || e.end_time >= now);
        Ok(removed(before, state.events.len()))
    }
}

fn removed(before: usize, after: usize) -> u64 {
    u64::try_from(before.saturating_sub(after)).unwrap_or(u64::MAX)
}

impl StableStore for MemoryStore {
    async fn horses(&self) -> Result<Vec<Horse>, StoreError> {
        Ok(self
            .state()?
            .horses
            .values()
            .map(|(horse, _)| horse.clone())
            .collect())
    }

    async fn horse_record(&self, horse: HorseId) -> Result<HorseRecord, StoreError> {
        self.state()?
            .horses
            .get(&horse)
            .map(|(_, record)| record.clone())
            .ok_or_else(|| StoreError::not_found("horse", horse))
    }

    async fn record_race(&self, tallies: &[HorseRecord]) -> Result<(), StoreError> {
        let mut state = self.state()?;
        if let Some(unknown) = tallies.iter().find(|t| !state.horses.contains_key(&t.horse_id)) {
            return Err(StoreError::not_found("horse", unknown.horse_id));
        }
        for tally in tallies {
            if let Some((_, stored)) = state.horses.get_mut(&tally.horse_id) {
                stored.absorb(tally);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use anketnica_types::{MaterialId, UsedMaterial};

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 1, 10, 0, 0).unwrap()
    }

    fn record(owner: CharacterId, success: bool) -> CraftRecord {
        CraftRecord {
            character_id: owner,
            recipe_id: RecipeId::new(1),
            item_name: "Кольцо".to_owned(),
            success,
            materials_used: vec![UsedMaterial {
                material_id: MaterialId::new(1),
                quantity: 1,
                quality_modifier: 1.0,
            }],
            item: None,
            crafted_at: now(),
        }
    }

    #[tokio::test]
    async fn failed_commit_changes_nothing() {
        let store = MemoryStore::new();
        let owner = store.add_character(Rank::C).unwrap();
        let material = store.ensure_material("Коготь").unwrap();
        let stack = store
            .add_stack(MaterialStack {
                id: StackId::new(0),
                owner_id: owner,
                material_id: material,
                material_name: String::new(),
                quantity: 3,
                quality_modifier: 1.0,
                obtained_at: now(),
            })
            .unwrap();

        let commit = CraftCommit {
            owner,
            changes: vec![
                StackChange::Adjust {
                    stack_id: stack,
                    expected: 3,
                    delta: -1,
                },
                StackChange::Delete {
                    stack_id: StackId::new(999),
                    expected: 1,
                },
            ],
            item: None,
            record: record(owner, false),
        };
        let result = store.commit_craft(&commit).await;
        assert!(matches!(result, Err(StoreError::Conflict { .. })));

        let stacks = store.stacks_of(owner).unwrap();
        assert_eq!(stacks.first().map(|s| s.quantity), Some(3));
        assert!(store.craft_history(owner, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stale_snapshot_is_rejected() {
        let store = MemoryStore::new();
        let owner = store.add_character(Rank::C).unwrap();
        let material = store.ensure_material("Коготь").unwrap();
        let stack = store
            .add_stack(MaterialStack {
                id: StackId::new(0),
                owner_id: owner,
                material_id: material,
                material_name: String::new(),
                quantity: 6,
                quality_modifier: 1.0,
                obtained_at: now(),
            })
            .unwrap();

        let first = CraftCommit {
            owner,
            changes: vec![StackChange::Adjust {
                stack_id: stack,
                expected: 6,
                delta: -2,
            }],
            item: None,
            record: record(owner, true),
        };
        store.commit_craft(&first).await.unwrap();

        let second = CraftCommit {
            owner,
            changes: vec![StackChange::Delete {
                stack_id: stack,
                expected: 6,
            }],
            item: None,
            record: record(owner, true),
        };
        let result = store.commit_craft(&second).await;
        assert!(matches!(result, Err(StoreError::Conflict { .. })));

        let stacks = store.stacks_of(owner).unwrap();
        assert_eq!(stacks.first().map(|s| s.quantity), Some(4));
        assert_eq!(store.craft_history(owner, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn history_is_newest_first_and_limited() {
        let store = MemoryStore::new();
        let owner = store.add_character(Rank::F).unwrap();
        for success in [true, false, true] {
            let commit = CraftCommit {
                owner,
                changes: Vec::new(),
                item: None,
                record: record(owner, success),
            };
            store.commit_craft(&commit).await.unwrap();
        }
        let latest = store.craft_history(owner, Some(2)).await.unwrap();
        assert_eq!(latest.len(), 2);
        assert!(latest.first().unwrap().success);
        assert!(!latest.last().unwrap().success);
    }

    #[tokio::test]
    async fn unknown_horse_is_not_found() {
        let store = MemoryStore::new();
        let result = store.horse_record(HorseId::new(4)).await;
        assert!(matches!(result, Err(StoreError::NotFound { entity: "horse", .. })));
    }
}
