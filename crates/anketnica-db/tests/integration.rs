//! End-to-end tests of the engines over an in-memory `SQLite` database.
//!
//! Every test opens its own private database with migrations applied, so
//! they run in parallel without any external service.

#![allow(
    clippy::arithmetic_side_effects,
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    clippy::too_many_lines,
    clippy::indexing_slicing
)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rust_decimal::Decimal;

use anketnica_casino::{RaceService, StableStore, house_stable};
use anketnica_core::MarketConfig;
use anketnica_crafting::{CraftCommit, CraftOutcome, CraftingService, CraftingStore, StackChange};
use anketnica_db::{DbError, SqliteStore};
use anketnica_hunting::{HuntRequest, HuntingService};
use anketnica_market::{PriceEngine, PriceProfile};
use anketnica_types::{
    CharacterId, CraftRecord, EchoZone, HabitatType, Horse, HorseId, HorseRecord, Instrument, InstrumentId,
    InstrumentKind, LocationId, MarketEvent, MarketEventId, MaterialRef, MaterialRequirement,
    MaterialStack, MaterialType, PricePoint, Rank, Recipe, RecipeId, Species, SpeciesId, StackId,
    StoreError, ZoneId,
};

// =============================================================================
// Helpers
// =============================================================================

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 1, 18, 30, 0).unwrap()
}

async fn setup() -> SqliteStore {
    SqliteStore::in_memory()
        .await
        .expect("in-memory database with migrations")
}

async fn seed_stack(
    store: &SqliteStore,
    owner: CharacterId,
    name: &str,
    quantity: u32,
    obtained_at: DateTime<Utc>,
) -> StackId {
    let material_id = store
        .ensure_material(name, MaterialType::Organic)
        .await
        .unwrap();
    store
        .insert_stack(&MaterialStack {
            id: StackId::new(0),
            owner_id: owner,
            material_id,
            material_name: name.to_owned(),
            quantity,
            quality_modifier: 1.0,
            obtained_at,
        })
        .await
        .unwrap()
}

fn recipe(quantity: u32) -> Recipe {
    Recipe {
        id: RecipeId::new(0),
        item_name: "Плащ из Шкуры".to_owned(),
        item_rank: Rank::D,
        item_kind: "armor".to_owned(),
        required_materials: vec![MaterialRequirement {
            material: MaterialRef::by_name("Шкура Волка"),
            quantity,
        }],
        base_success_chance: 0.6,
        min_crafter_rank: Rank::E,
        item_properties: serde_json::json!({ "bonus": 4 }),
        description: "Тёплый плащ".to_owned(),
        is_active: true,
    }
}

fn stock(price: Decimal) -> Instrument {
    Instrument {
        id: InstrumentId::new(0),
        kind: InstrumentKind::Stock,
        name: "Северная Артель".to_owned(),
        symbol: "SEV".to_owned(),
        current_price: price,
        base_volatility: 0.02,
        base_trend: 0.001,
        total_supply: None,
        circulating_supply: None,
        market_cap: None,
    }
}

fn horse(name: &str, speed: u8) -> Horse {
    Horse {
        id: HorseId::new(0),
        name: name.to_owned(),
        base_speed: speed,
        base_stamina: 60,
        base_luck: 50,
        description: String::new(),
    }
}

// =============================================================================
// Migrations and connection
// =============================================================================

#[tokio::test]
async fn migrations_are_idempotent() {
    let store = setup().await;
    store.run_migrations().await.unwrap();
    let recipes = store.list_active_recipes().await.unwrap();
    assert!(recipes.is_empty());
}

#[tokio::test]
async fn unknown_character_maps_to_not_found() {
    let store = setup().await;
    let err = store.character_rank(CharacterId::new(77)).await.unwrap_err();
    assert!(matches!(err, DbError::NotFound { .. }));
    assert!(matches!(
        StoreError::from(err),
        StoreError::NotFound { .. }
    ));
}

// =============================================================================
// Hunting
// =============================================================================

#[tokio::test]
async fn hunt_grants_loot_and_drifts_zone_aura() {
    let store = setup().await;
    let hunter = store.insert_character("Ирина", Rank::C, now()).await.unwrap();
    let species = store
        .insert_species(&Species {
            id: SpeciesId::new(0),
            name: "Огненный Волк".to_owned(),
            danger_rank: Rank::C,
            habitat_type: HabitatType::Land,
            drop_items: Some(r#"["Клык Волка"]"#.to_owned()),
            credit_value_min: 100,
            credit_value_max: 300,
        })
        .await
        .unwrap();
    let location = LocationId::new(3);
    let zone = store
        .insert_zone(&EchoZone {
            id: ZoneId::new(0),
            location_id: location,
            intensity: 3,
            residual_aura_level: 0.5,
            last_beast_migration: None,
            active_until: Some(now() + Duration::hours(2)),
        })
        .await
        .unwrap();

    let service = HuntingService::new(store.clone());
    let request = HuntRequest {
        actor_id: hunter,
        species_id: species,
        location_id: location,
        minigame_score: 85.0,
        difficulty: 1.2,
        perfect_hits: 2,
    };
    let mut rng = SmallRng::seed_from_u64(42);
    let outcome = service.hunt(&request, now(), &mut rng).await.unwrap();

    let granted = outcome
        .loot
        .materials
        .iter()
        .filter(|m| m.quantity > 0)
        .count();
    let stacks = store.list_material_stacks(hunter).await.unwrap();
    assert_eq!(stacks.len(), granted);
    assert!(stacks.iter().all(|s| s.obtained_at == now()));

    let aura = outcome.aura.expect("hunt took place in a zone");
    let stored = store
        .get_active_zone(location, now())
        .await
        .unwrap()
        .expect("zone still open");
    assert_eq!(stored.id, zone);
    assert!((stored.residual_aura_level - aura.new_level).abs() < 1e-9);
}

#[tokio::test]
async fn expired_zone_is_ignored() {
    let store = setup().await;
    let location = LocationId::new(9);
    store
        .insert_zone(&EchoZone {
            id: ZoneId::new(0),
            location_id: location,
            intensity: 5,
            residual_aura_level: 0.9,
            last_beast_migration: None,
            active_until: Some(now() - Duration::minutes(1)),
        })
        .await
        .unwrap();
    assert!(store.get_active_zone(location, now()).await.unwrap().is_none());
}

// =============================================================================
// Crafting
// =============================================================================

#[tokio::test]
async fn repeated_crafts_keep_stacks_history_and_inventory_consistent() {
    let store = setup().await;
    let crafter = store.insert_character("Мирон", Rank::C, now()).await.unwrap();
    seed_stack(&store, crafter, "Шкура Волка", 400, now() - Duration::days(1)).await;
    let recipe_id = store.insert_recipe(&recipe(5)).await.unwrap();

    let service = CraftingService::new(store.clone());
    let mut rng = SmallRng::seed_from_u64(42);
    let mut consumed = 0_u32;
    let mut refunded = 0_u32;
    let mut successes = 0_usize;
    for _ in 0..40 {
        let resolution = service
            .craft(crafter, recipe_id, now(), &mut rng)
            .await
            .unwrap();
        consumed += resolution.used.iter().map(|u| u.quantity).sum::<u32>();
        match &resolution.outcome {
            CraftOutcome::Crafted { item } => {
                successes += 1;
                assert_eq!(item.name, "Плащ из Шкуры");
            }
            CraftOutcome::Failed { refunds, .. } => {
                refunded += refunds.iter().map(|r| r.quantity).sum::<u32>();
            }
        }
    }

    assert_eq!(consumed, 200);
    assert!(successes > 0 && successes < 40);

    let stacks = store.list_material_stacks(crafter).await.unwrap();
    let held: u32 = stacks.iter().map(|s| s.quantity).sum();
    assert_eq!(held, 400 - consumed + refunded);
    assert!(stacks.iter().all(|s| s.quantity > 0));

    let inventory = store.list_inventory(crafter).await.unwrap();
    assert_eq!(inventory.len(), successes);

    let stats = service.stats(crafter).await.unwrap();
    assert_eq!(stats.total_crafts, 40);
    assert_eq!(usize::try_from(stats.successful_crafts).unwrap(), successes);

    let recent = service.history(crafter, Some(5)).await.unwrap();
    assert_eq!(recent.len(), 5);
}

#[tokio::test]
async fn craft_with_too_few_materials_changes_nothing() {
    let store = setup().await;
    let crafter = store.insert_character("Лада", Rank::B, now()).await.unwrap();
    seed_stack(&store, crafter, "Шкура Волка", 3, now()).await;
    let recipe_id = store.insert_recipe(&recipe(5)).await.unwrap();

    let service = CraftingService::new(store.clone());
    let mut rng = SmallRng::seed_from_u64(42);
    let result = service.craft(crafter, recipe_id, now(), &mut rng).await;
    assert!(result.is_err());

    let stacks = store.list_material_stacks(crafter).await.unwrap();
    assert_eq!(stacks.first().map(|s| s.quantity), Some(3));
    assert!(service.history(crafter, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn conflicting_commit_rolls_back() {
    let store = setup().await;
    let crafter = store.insert_character("Глеб", Rank::A, now()).await.unwrap();
    let stack = seed_stack(&store, crafter, "Шкура Волка", 10, now()).await;
    let recipe_id = store.insert_recipe(&recipe(2)).await.unwrap();

    let commit = CraftCommit {
        owner: crafter,
        changes: vec![
            StackChange::Adjust {
                stack_id: stack,
                expected: 10,
                delta: -2,
            },
            StackChange::Delete {
                stack_id: StackId::new(9_999),
                expected: 1,
            },
        ],
        item: None,
        record: CraftRecord {
            character_id: crafter,
            recipe_id,
            item_name: "Плащ из Шкуры".to_owned(),
            success: false,
            materials_used: Vec::new(),
            item: None,
            crafted_at: now(),
        },
    };
    let err = store.commit_craft(&commit).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict { .. }));

    let stacks = store.list_material_stacks(crafter).await.unwrap();
    assert_eq!(stacks.first().map(|s| s.quantity), Some(10));
    assert!(store.list_craft_history(crafter, None).await.unwrap().is_empty());
}

fn bare_commit(crafter: CharacterId, recipe_id: RecipeId, changes: Vec<StackChange>) -> CraftCommit {
    CraftCommit {
        owner: crafter,
        changes,
        item: None,
        record: CraftRecord {
            character_id: crafter,
            recipe_id,
            item_name: "Плащ из Шкуры".to_owned(),
            success: false,
            materials_used: Vec::new(),
            item: None,
            crafted_at: now(),
        },
    }
}

#[tokio::test]
async fn commits_from_the_same_snapshot_cannot_overdraw_a_stack() {
    let store = setup().await;
    let crafter = store.insert_character("Вера", Rank::A, now()).await.unwrap();
    let stack = seed_stack(&store, crafter, "Шкура Волка", 6, now()).await;
    let recipe_id = store.insert_recipe(&recipe(2)).await.unwrap();

    let take_two = bare_commit(
        crafter,
        recipe_id,
        vec![StackChange::Adjust {
            stack_id: stack,
            expected: 6,
            delta: -2,
        }],
    );
    let take_all = bare_commit(
        crafter,
        recipe_id,
        vec![StackChange::Delete {
            stack_id: stack,
            expected: 6,
        }],
    );

    store.commit_craft(&take_two).await.unwrap();
    let err = store.commit_craft(&take_all).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict { .. }));

    let stacks = store.list_material_stacks(crafter).await.unwrap();
    assert_eq!(stacks.iter().map(|s| s.quantity).sum::<u32>(), 4);
    assert_eq!(store.list_craft_history(crafter, None).await.unwrap().len(), 1);

    let stale_adjust = bare_commit(
        crafter,
        recipe_id,
        vec![StackChange::Adjust {
            stack_id: stack,
            expected: 6,
            delta: -1,
        }],
    );
    let err = store.commit_craft(&stale_adjust).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict { .. }));
    let stacks = store.list_material_stacks(crafter).await.unwrap();
    assert_eq!(stacks.first().map(|s| s.quantity), Some(4));
}

#[tokio::test]
async fn recipes_below_rank_are_hidden() {
    let store = setup().await;
    let novice = store.insert_character("Юра", Rank::F, now()).await.unwrap();
    store.insert_recipe(&recipe(1)).await.unwrap();

    let service = CraftingService::new(store.clone());
    assert!(service.available_recipes(novice).await.unwrap().is_empty());
}

// =============================================================================
// Market
// =============================================================================

#[tokio::test]
async fn price_tick_updates_prices_and_prunes_stale_rows() {
    let store = setup().await;
    let id = store
        .insert_instrument(&stock(Decimal::new(10_000, 2)))
        .await
        .unwrap();
    store
        .insert_price_point(
            InstrumentKind::Stock,
            &PricePoint {
                instrument_id: id,
                price: Decimal::new(9_500, 2),
                recorded_at: now() - Duration::days(45),
            },
        )
        .await
        .unwrap();
    store
        .insert_market_event(
            &MarketEvent {
                id: MarketEventId::new(0),
                kind: InstrumentKind::Stock,
                instrument_id: Some(id),
                impact_strength: 0.05,
                start_time: now() - Duration::days(3),
                end_time: now() - Duration::days(2),
            },
            "Забастовка",
        )
        .await
        .unwrap();

    let config = MarketConfig::default();
    let mut engine = PriceEngine::new(
        store.clone(),
        PriceProfile::stock(&config),
        SmallRng::seed_from_u64(42),
    );
    let report = engine.tick(now()).await.unwrap();

    assert_eq!(report.instruments, 1);
    assert_eq!(report.history_pruned, 1);
    assert_eq!(report.events_pruned, 1);
    assert_eq!(report.history_appended, report.changed);

    let history = store
        .list_price_history(InstrumentKind::Stock, id)
        .await
        .unwrap();
    assert_eq!(
        u32::try_from(history.len()).unwrap(),
        report.history_appended
    );

    let instruments = store.list_instruments(InstrumentKind::Stock).await.unwrap();
    let current = instruments.first().unwrap().current_price;
    assert!(current.scale() <= 2);
    if let Some(point) = history.last() {
        assert_eq!(point.price, current);
    }
}

#[tokio::test]
async fn crypto_tick_refreshes_market_cap() {
    let store = setup().await;
    let id = store
        .insert_instrument(&Instrument {
            kind: InstrumentKind::Crypto,
            symbol: "ANK".to_owned(),
            name: "Анкоин".to_owned(),
            current_price: Decimal::new(1_500_000, 6),
            circulating_supply: Some(1_000_000),
            total_supply: Some(5_000_000),
            ..stock(Decimal::ONE)
        })
        .await
        .unwrap();

    let config = MarketConfig::default();
    let mut engine = PriceEngine::new(
        store.clone(),
        PriceProfile::crypto(&config),
        SmallRng::seed_from_u64(7),
    );
    engine.tick(now()).await.unwrap();

    let coins = store.list_instruments(InstrumentKind::Crypto).await.unwrap();
    let coin = coins.iter().find(|c| c.id == id).unwrap();
    assert_eq!(
        coin.market_cap,
        Some(coin.current_price * Decimal::from(1_000_000_u64))
    );
    assert!(store.list_instruments(InstrumentKind::Stock).await.unwrap().is_empty());
}

// =============================================================================
// Horse racing
// =============================================================================

#[tokio::test]
async fn race_results_are_recorded_per_horse() {
    let store = setup().await;
    for (name, speed) in [("Буран", 80), ("Заря", 65), ("Вихрь", 70), ("Тень", 55)] {
        store.insert_horse(&horse(name, speed)).await.unwrap();
    }

    let service = RaceService::new(store.clone());
    let roster = store.horses().await.unwrap();
    let mut rng = SmallRng::seed_from_u64(42);
    let result = service.run(&roster, &mut rng).await.unwrap();
    assert_eq!(result.entries.len(), 4);

    let winner = result.winner().unwrap();
    let record = store.horse_record(winner.horse_id).await.unwrap();
    assert_eq!(record.total_races, 1);
    assert_eq!(record.wins, 1);
    assert_eq!(record.total_winnings, 1_000);

    let last = result.entries.last().unwrap();
    let record = store.horse_record(last.horse_id).await.unwrap();
    assert_eq!(record.total_races, 1);
    assert_eq!(record.wins + record.second_places + record.third_places, 0);
}

#[tokio::test]
async fn overlapping_races_keep_every_count() {
    let store = setup().await;
    for (name, speed) in [("Буран", 80), ("Заря", 65), ("Вихрь", 70)] {
        store.insert_horse(&horse(name, speed)).await.unwrap();
    }
    let roster = store.horses().await.unwrap();

    let service = RaceService::new(store.clone());
    let mut first_rng = SmallRng::seed_from_u64(1);
    let mut second_rng = SmallRng::seed_from_u64(2);
    let (first, second) = tokio::join!(
        service.run(&roster, &mut first_rng),
        service.run(&roster, &mut second_rng),
    );
    first.unwrap();
    second.unwrap();

    let mut wins = 0;
    for horse in &roster {
        let record = store.horse_record(horse.id).await.unwrap();
        assert_eq!(record.total_races, 2);
        wins += record.wins;
    }
    assert_eq!(wins, 2);
}

#[tokio::test]
async fn race_with_unknown_horse_records_nothing() {
    let store = setup().await;
    let known = store.insert_horse(&horse("Буран", 80)).await.unwrap();

    let mut won = HorseRecord::new(known);
    won.record(1, 1_000);
    let mut ghost = HorseRecord::new(HorseId::new(9_999));
    ghost.record(2, 500);

    let err = store.record_race(&[won, ghost]).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));

    let record = store.horse_record(known).await.unwrap();
    assert_eq!(record, HorseRecord::new(known));
}

#[tokio::test]
async fn house_stable_seeds_once() {
    let store = setup().await;
    assert_eq!(store.seed_stable(&house_stable()).await.unwrap(), 13);
    assert_eq!(store.seed_stable(&house_stable()).await.unwrap(), 0);

    let roster = store.horses().await.unwrap();
    assert_eq!(roster.len(), 13);
    let shrek = roster.iter().find(|h| h.name == "Шрек").unwrap();
    assert_eq!((shrek.base_speed, shrek.base_stamina, shrek.base_luck), (5, 20, 6));

    let service = RaceService::new(store.clone());
    let mut rng = SmallRng::seed_from_u64(42);
    let field = service.random_field(&mut rng).await.unwrap();
    assert!((3..=6).contains(&field.len()));
}
