//! Crafting orchestration.
//!
//! The service loads a crafter's stacks into a [`Stockpile`], resolves the
//! attempt in memory and hands the net result to the store as a single
//! [`CraftCommit`]. Validation failures return before anything is written.

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{debug, info};

use anketnica_types::{CharacterId, CraftRecord, Recipe, RecipeId, StoreError};

use crate::engine::{self, CraftResolution, MaterialCheck};
use crate::error::CraftError;
use crate::stats::CraftingStats;
use crate::stockpile::Stockpile;
use crate::store::{CraftCommit, CraftingStore};

/// History rows returned when the caller sets no limit.
pub const DEFAULT_HISTORY_LIMIT: u32 = 20;

/// Crafting operations against a store.
#[derive(Debug, Clone)]
pub struct CraftingService<S> {
    store: S,
}

impl<S: CraftingStore> CraftingService<S> {
    /// Create a service over `store`.
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Active recipes the character's rank allows. Unknown characters get
    /// an empty list.
    pub async fn available_recipes(&self, actor: CharacterId) -> Result<Vec<Recipe>, CraftError> {
        let rank = match self.store.actor_rank(actor).await {
            Ok(rank) => rank,
            Err(StoreError::NotFound { .. }) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let recipes = self.store.active_recipes().await?;
        Ok(recipes
            .into_iter()
            .filter(|r| r.is_active && r.min_crafter_rank <= rank)
            .collect())
    }

    /// Whether the character holds enough materials for a recipe.
    pub async fn check_materials(
        &self,
        actor: CharacterId,
        recipe: &Recipe,
    ) -> Result<MaterialCheck, CraftError> {
        let stacks = self.store.material_stacks(actor).await?;
        let stockpile = Stockpile::new(actor, stacks);
        Ok(engine::check_materials(&stockpile, recipe))
    }

    /// Attempt a craft and persist its result atomically.
    pub async fn craft(
        &self,
        actor: CharacterId,
        recipe_id: RecipeId,
        now: DateTime<Utc>,
        rng: &mut impl Rng,
    ) -> Result<CraftResolution, CraftError> {
        let recipe = self
            .store
            .recipe(recipe_id)
            .await?
            .ok_or(CraftError::RecipeNotFound { recipe: recipe_id })?;
        let rank = self.store.actor_rank(actor).await?;
        let stacks = self.store.material_stacks(actor).await?;

        let mut stockpile = Stockpile::new(actor, stacks);
        let resolution = engine::resolve_craft(&recipe, rank, &mut stockpile, now, rng)?;

        let changes = stockpile.changes();
        debug!(
            actor = %actor,
            recipe = %recipe.id,
            writes = changes.len(),
            "Committing craft"
        );

        let item = resolution.item().cloned();
        let record = CraftRecord {
            character_id: actor,
            recipe_id: recipe.id,
            item_name: recipe.item_name.clone(),
            success: resolution.is_success(),
            materials_used: resolution.used.clone(),
            item: item.clone(),
            crafted_at: now,
        };
        self.store
            .commit_craft(&CraftCommit {
                owner: actor,
                changes,
                item,
                record,
            })
            .await?;

        info!(
            actor = %actor,
            recipe = %recipe.id,
            item = %recipe.item_name,
            success = resolution.is_success(),
            chance = resolution.success_chance,
            "Craft resolved"
        );

        Ok(resolution)
    }

    /// Past attempts, newest first.
    pub async fn history(
        &self,
        actor: CharacterId,
        limit: Option<u32>,
    ) -> Result<Vec<CraftRecord>, CraftError> {
        let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
        Ok(self.store.craft_history(actor, Some(limit)).await?)
    }

    /// Success tally over the whole history.
    pub async fn stats(&self, actor: CharacterId) -> Result<CraftingStats, CraftError> {
        let records = self.store.craft_history(actor, None).await?;
        Ok(CraftingStats::from_records(&records))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use std::sync::Mutex;

    use chrono::{Duration, TimeZone};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use serde_json::json;

    use anketnica_types::{
        CraftedItem, MaterialId, MaterialRef, MaterialRequirement, MaterialStack, Rank, StackId,
    };

    use super::*;
    use crate::engine::CraftOutcome;
    use crate::stockpile::StackChange;

    struct FakeStore {
        recipes: Vec<Recipe>,
        stacks: Mutex<Vec<MaterialStack>>,
        inventory: Mutex<Vec<CraftedItem>>,
        history: Mutex<Vec<CraftRecord>>,
        next_stack: Mutex<i64>,
    }

    impl FakeStore {
        fn new(recipes: Vec<Recipe>, stacks: Vec<MaterialStack>) -> Self {
            Self {
                recipes,
                stacks: Mutex::new(stacks),
                inventory: Mutex::new(Vec::new()),
                history: Mutex::new(Vec::new()),
                next_stack: Mutex::new(100),
            }
        }

        fn units(&self) -> u32 {
            self.stacks.lock().unwrap().iter().map(|s| s.quantity).sum()
        }
    }

    impl CraftingStore for FakeStore {
        async fn recipe(&self, id: RecipeId) -> Result<Option<Recipe>, StoreError> {
            Ok(self.recipes.iter().find(|r| r.id == id).cloned())
        }

        async fn active_recipes(&self) -> Result<Vec<Recipe>, StoreError> {
            Ok(self.recipes.iter().filter(|r| r.is_active).cloned().collect())
        }

        async fn actor_rank(&self, actor: CharacterId) -> Result<Rank, StoreError> {
            match actor.into_inner() {
                1 => Ok(Rank::C),
                2 => Ok(Rank::F),
                _ => Err(StoreError::not_found("character", actor)),
            }
        }

        async fn material_stacks(
            &self,
            owner: CharacterId,
        ) -> Result<Vec<MaterialStack>, StoreError> {
            Ok(self
                .stacks
                .lock()
                .unwrap()
                .iter()
                .filter(|s| s.owner_id == owner)
                .cloned()
                .collect())
        }

        async fn commit_craft(&self, commit: &CraftCommit) -> Result<(), StoreError> {
            let mut stacks = self.stacks.lock().unwrap();
            for change in &commit.changes {
                match change {
                    StackChange::Delete { stack_id, .. } => stacks.retain(|s| s.id != *stack_id),
                    StackChange::Adjust { stack_id, delta, .. } => {
                        let stack = stacks.iter_mut().find(|s| s.id == *stack_id).unwrap();
                        let next = i64::from(stack.quantity) + delta;
                        stack.quantity = u32::try_from(next).unwrap();
                    }
                    StackChange::Create {
                        material_id,
                        quantity,
                        quality_modifier,
                        obtained_at,
                    } => {
                        let mut next = self.next_stack.lock().unwrap();
                        *next += 1;
                        stacks.push(MaterialStack {
                            id: StackId::new(*next),
                            owner_id: commit.owner,
                            material_id: *material_id,
                            material_name: String::new(),
                            quantity: *quantity,
                            quality_modifier: *quality_modifier,
                            obtained_at: *obtained_at,
                        });
                    }
                }
            }
            if let Some(item) = &commit.item {
                self.inventory.lock().unwrap().push(item.clone());
            }
            self.history.lock().unwrap().push(commit.record.clone());
            Ok(())
        }

        async fn craft_history(
            &self,
            owner: CharacterId,
            limit: Option<u32>,
        ) -> Result<Vec<CraftRecord>, StoreError> {
            let mut rows: Vec<_> = self
                .history
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.character_id == owner)
                .cloned()
                .collect();
            rows.reverse();
            if let Some(limit) = limit {
                rows.truncate(usize::try_from(limit).unwrap());
            }
            Ok(rows)
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 10, 12, 0, 0).unwrap()
    }

    fn recipe(id: i64, base: f64, min_rank: Rank, active: bool) -> Recipe {
        Recipe {
            id: RecipeId::new(id),
            item_name: format!("Талисман {id}"),
            item_rank: Rank::D,
            item_kind: "artifact".to_owned(),
            required_materials: vec![MaterialRequirement {
                material: MaterialRef::by_name("Эссенция Грозы"),
                quantity: 6,
            }],
            base_success_chance: base,
            min_crafter_rank: min_rank,
            item_properties: json!({ "bonus": 4 }),
            description: String::new(),
            is_active: active,
        }
    }

    fn stacks() -> Vec<MaterialStack> {
        let stack = |id: i64, owner: i64, quantity: u32, age_h: i64| MaterialStack {
            id: StackId::new(id),
            owner_id: CharacterId::new(owner),
            material_id: MaterialId::new(7),
            material_name: "Эссенция Грозы".to_owned(),
            quantity,
            quality_modifier: 1.0,
            obtained_at: now() - Duration::hours(age_h),
        };
        vec![stack(1, 1, 4, 30), stack(2, 1, 6, 5), stack(3, 2, 50, 1)]
    }

    fn store() -> FakeStore {
        FakeStore::new(
            vec![
                recipe(1, 0.95, Rank::F, true),
                recipe(2, 0.0, Rank::F, true),
                recipe(3, 0.5, Rank::B, true),
                recipe(4, 0.5, Rank::F, false),
            ],
            stacks(),
        )
    }

    #[tokio::test]
    async fn available_recipes_respect_rank_and_activity() {
        let service = CraftingService::new(store());
        let ids: Vec<_> = service
            .available_recipes(CharacterId::new(1))
            .await
            .unwrap()
            .iter()
            .map(|r| r.id.into_inner())
            .collect();
        assert_eq!(ids, vec![1, 2]);

        let unknown = service.available_recipes(CharacterId::new(9)).await.unwrap();
        assert!(unknown.is_empty());
    }

    #[tokio::test]
    async fn check_materials_only_counts_own_stacks() {
        let service = CraftingService::new(store());
        let mut greedy = recipe(5, 0.5, Rank::F, true);
        if let Some(req) = greedy.required_materials.first_mut() {
            req.quantity = 12;
        }
        let check = service
            .check_materials(CharacterId::new(1), &greedy)
            .await
            .unwrap();
        assert!(!check.sufficient);
        assert_eq!(check.missing.first().map(|m| m.quantity), Some(2));
    }

    #[tokio::test]
    async fn rejected_craft_writes_nothing() {
        let service = CraftingService::new(store());
        let mut rng = SmallRng::seed_from_u64(42);

        let inactive = service
            .craft(CharacterId::new(1), RecipeId::new(4), now(), &mut rng)
            .await;
        assert!(matches!(inactive, Err(CraftError::RecipeInactive { .. })));

        let rank = service
            .craft(CharacterId::new(1), RecipeId::new(3), now(), &mut rng)
            .await;
        assert!(matches!(rank, Err(CraftError::RankTooLow { .. })));

        let missing = service
            .craft(CharacterId::new(1), RecipeId::new(99), now(), &mut rng)
            .await;
        assert!(matches!(missing, Err(CraftError::RecipeNotFound { .. })));

        assert_eq!(service.store().units(), 60);
        assert!(service.store().history.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn successful_craft_consumes_oldest_first() {
        let mut success = None;
        for seed in 0..20_u64 {
            let service = CraftingService::new(store());
            let mut rng = SmallRng::seed_from_u64(seed);
            let resolution = service
                .craft(CharacterId::new(1), RecipeId::new(1), now(), &mut rng)
                .await
                .unwrap();
            if resolution.is_success() {
                success = Some(service);
                break;
            }
        }
        let service = success.unwrap();

        let stacks = service.store().stacks.lock().unwrap().clone();
        // stack 1 (oldest, 4 units) is gone, stack 2 lost 2 units
        assert!(stacks.iter().all(|s| s.id != StackId::new(1)));
        let second = stacks.iter().find(|s| s.id == StackId::new(2)).unwrap();
        assert_eq!(second.quantity, 4);
        assert_eq!(service.store().inventory.lock().unwrap().len(), 1);

        let history = service.history(CharacterId::new(1), None).await.unwrap();
        assert_eq!(history.len(), 1);
        assert!(history.first().unwrap().success);
    }

    #[tokio::test]
    async fn failed_craft_is_an_outcome_and_refunds() {
        let mut failure = None;
        for seed in 0..50_u64 {
            let service = CraftingService::new(store());
            let mut rng = SmallRng::seed_from_u64(seed);
            let resolution = service
                .craft(CharacterId::new(1), RecipeId::new(2), now(), &mut rng)
                .await
                .unwrap();
            if !resolution.is_success() {
                failure = Some((service, resolution));
                break;
            }
        }
        let (service, resolution) = failure.unwrap();

        let CraftOutcome::Failed {
            return_percentage,
            refunds,
        } = &resolution.outcome
        else {
            panic!("expected a failed roll");
        };
        assert_eq!(*return_percentage, 20);
        // consumed 4 + 2 units: floor(0.8) = 0, floor(0.4) = 0
        assert!(refunds.is_empty());

        assert_eq!(service.store().units(), 60 - 6);
        assert!(service.store().inventory.lock().unwrap().is_empty());
        let stats = service.stats(CharacterId::new(1)).await.unwrap();
        assert_eq!(stats.failed_crafts, 1);
        assert!(stats.success_rate.abs() < f64::EPSILON);
    }
}
