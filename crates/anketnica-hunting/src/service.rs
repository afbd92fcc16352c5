//! Hunting and fishing orchestration.
//!
//! One call resolves a whole encounter: the mutation class is rolled, the
//! loot generated and granted, and the zone's residual Aura drifted. Loot
//! is granted before the zone is touched, so a failed zone write never
//! costs the hunter their catch.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use tracing::info;

use anketnica_types::{CharacterId, LocationId, MutationClass, SpeciesId};

use crate::error::HuntError;
use crate::loot::{self, LootContext, LootResult};
use crate::mutation::{self, AuraUpdate, ClassProbabilities, TemporaryMutation};
use crate::store::HuntingStore;

/// A completed minigame, ready to be turned into loot.
#[derive(Debug, Clone, PartialEq)]
pub struct HuntRequest {
    /// The hunter.
    pub actor_id: CharacterId,
    /// The creature caught.
    pub species_id: SpeciesId,
    /// Where it was caught.
    pub location_id: LocationId,
    /// Minigame score, 0 to 100.
    pub minigame_score: f64,
    /// Minigame difficulty, 1.0 being normal.
    pub difficulty: f64,
    /// Perfect actions during the minigame.
    pub perfect_hits: u32,
}

/// Everything an encounter produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HuntOutcome {
    /// The rolled class.
    pub mutation_class: MutationClass,
    /// The distribution the class was rolled from.
    pub class_probabilities: ClassProbabilities,
    /// Harvest quality derived from the minigame.
    pub harvest_quality: f64,
    /// Granted loot.
    pub loot: LootResult,
    /// Aura drift of the zone, when the hunt took place in one.
    pub aura: Option<AuraUpdate>,
    /// Temporary traits the zone now grants its creatures.
    pub residual_mutations: Vec<TemporaryMutation>,
    /// Chance of a Beast turning up in the zone.
    pub beast_spawn_chance: f64,
}

/// Resolves hunting and fishing encounters against a store.
#[derive(Debug, Clone)]
pub struct HuntingService<S> {
    store: S,
}

impl<S: HuntingStore> HuntingService<S> {
    /// Create a service over `store`.
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Resolve one encounter.
    pub async fn hunt(
        &self,
        request: &HuntRequest,
        now: DateTime<Utc>,
        rng: &mut impl Rng,
    ) -> Result<HuntOutcome, HuntError> {
        ensure_finite("minigame_score", request.minigame_score)?;
        ensure_finite("difficulty", request.difficulty)?;

        let rank = self.store.actor_rank(request.actor_id).await?;
        let species = self.store.species(request.species_id).await?;
        let zone = self.store.active_zone(request.location_id, now).await?;

        let harvest_quality = loot::harvest_quality(
            request.minigame_score,
            request.difficulty,
            request.perfect_hits,
        );

        let available = mutation::available_classes(zone.as_ref(), rank);
        let class_probabilities = mutation::class_probabilities(&available, zone.as_ref(), rank);
        let mutation_class = mutation::select_class(&class_probabilities, rng);

        let loot = loot::generate_loot(
            &LootContext {
                species: &species,
                class: mutation_class,
                harvest_quality,
                actor_rank: rank,
                zone_intensity: zone.as_ref().map_or(0, |z| z.intensity),
            },
            rng,
        );

        let granted: Vec<_> = loot
            .materials
            .iter()
            .filter(|m| m.quantity > 0)
            .cloned()
            .collect();
        if !granted.is_empty() {
            self.store.grant_loot(request.actor_id, &granted, now).await?;
        }

        let beast = mutation_class == MutationClass::Beast;
        let (aura, residual_mutations, beast_spawn_chance) = match zone {
            Some(zone) => {
                let update = mutation::update_residual_aura(zone.residual_aura_level, beast);
                let last_migration = if beast {
                    Some(now)
                } else {
                    zone.last_beast_migration
                };
                if update.changed {
                    self.store
                        .save_zone_aura(zone.id, update.new_level, last_migration)
                        .await?;
                }
                (
                    Some(update),
                    mutation::residual_mutations(update.new_level, rng),
                    mutation::beast_spawn_chance(zone.intensity, last_migration, now),
                )
            }
            None => (None, Vec::new(), 0.0),
        };

        info!(
            actor = %request.actor_id,
            species = %species.name,
            class = %mutation_class,
            harvest_quality,
            stacks = granted.len(),
            total_value = loot.total_value,
            "Hunt resolved"
        );

        Ok(HuntOutcome {
            mutation_class,
            class_probabilities,
            harvest_quality,
            loot,
            aura,
            residual_mutations,
            beast_spawn_chance,
        })
    }
}

fn ensure_finite(field: &'static str, value: f64) -> Result<(), HuntError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(HuntError::InvalidInput {
            field,
            reason: format!("expected a finite number, got {value}"),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use chrono::TimeZone;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use anketnica_types::{EchoZone, HabitatType, Rank, Species, StoreError, ZoneId};

    use super::*;
    use crate::loot::LootMaterial;

    #[derive(Default)]
    struct FakeStore {
        zone: Mutex<Option<EchoZone>>,
        granted: Mutex<Vec<LootMaterial>>,
    }

    impl HuntingStore for FakeStore {
        async fn actor_rank(&self, actor: CharacterId) -> Result<Rank, StoreError> {
            if actor == CharacterId::new(1) {
                Ok(Rank::A)
            } else {
                Err(StoreError::not_found("character", actor))
            }
        }

        async fn species(&self, id: SpeciesId) -> Result<Species, StoreError> {
            Ok(Species {
                id,
                name: "Вольтовый Угорь".to_owned(),
                danger_rank: Rank::B,
                habitat_type: HabitatType::Water,
                drop_items: Some(r#"["Электрожелеза"]"#.to_owned()),
                credit_value_min: 1000,
                credit_value_max: 3000,
            })
        }

        async fn active_zone(
            &self,
            _location: LocationId,
            now: DateTime<Utc>,
        ) -> Result<Option<EchoZone>, StoreError> {
            Ok(self.zone.lock().unwrap().clone().filter(|z| z.is_active(now)))
        }

        async fn grant_loot(
            &self,
            _owner: CharacterId,
            materials: &[LootMaterial],
            _now: DateTime<Utc>,
        ) -> Result<(), StoreError> {
            self.granted.lock().unwrap().extend_from_slice(materials);
            Ok(())
        }

        async fn save_zone_aura(
            &self,
            _zone: ZoneId,
            residual_aura_level: f64,
            last_beast_migration: Option<DateTime<Utc>>,
        ) -> Result<(), StoreError> {
            if let Some(zone) = self.zone.lock().unwrap().as_mut() {
                zone.residual_aura_level = residual_aura_level;
                zone.last_beast_migration = last_beast_migration;
            }
            Ok(())
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 18, 0, 0).unwrap()
    }

    fn request(actor: i64) -> HuntRequest {
        HuntRequest {
            actor_id: CharacterId::new(actor),
            species_id: SpeciesId::new(4),
            location_id: LocationId::new(2),
            minigame_score: 70.0,
            difficulty: 1.5,
            perfect_hits: 1,
        }
    }

    fn zone(intensity: u8, aura: f64) -> EchoZone {
        EchoZone {
            id: ZoneId::new(9),
            location_id: LocationId::new(2),
            intensity,
            residual_aura_level: aura,
            last_beast_migration: None,
            active_until: Some(now() + chrono::Duration::hours(6)),
        }
    }

    #[tokio::test]
    async fn hunt_without_zone_grants_loot() {
        let service = HuntingService::new(FakeStore::default());
        let mut rng = SmallRng::seed_from_u64(42);

        let outcome = service.hunt(&request(1), now(), &mut rng).await.unwrap();

        assert!((outcome.harvest_quality - 80.0).abs() < 1e-9);
        assert_ne!(outcome.mutation_class, MutationClass::Beast);
        assert!(outcome.aura.is_none());
        assert!(outcome.residual_mutations.is_empty());
        assert!(outcome.beast_spawn_chance.abs() < 1e-12);
        assert_eq!(outcome.loot.bonus_items, vec!["Электрожелеза".to_owned()]);

        let granted = service.store().granted.lock().unwrap().clone();
        assert!(!granted.is_empty());
        assert!(granted.iter().all(|m| m.quantity > 0));
        assert!(granted.iter().any(|m| m.name == "Мясо Вольтовый Угорь"));
    }

    #[tokio::test]
    async fn hunt_in_zone_drifts_aura() {
        let store = FakeStore::default();
        *store.zone.lock().unwrap() = Some(zone(5, 0.6));
        let service = HuntingService::new(store);
        let mut rng = SmallRng::seed_from_u64(42);

        let outcome = service.hunt(&request(1), now(), &mut rng).await.unwrap();
        let update = outcome.aura.unwrap();
        assert!(update.changed);

        let saved = service.store().zone.lock().unwrap().clone().unwrap();
        assert!((saved.residual_aura_level - update.new_level).abs() < 1e-12);

        if outcome.mutation_class == MutationClass::Beast {
            assert!((update.new_level - 0.75).abs() < 1e-9);
            assert_eq!(saved.last_beast_migration, Some(now()));
        } else {
            assert!((update.new_level - 0.55).abs() < 1e-9);
            assert_eq!(saved.last_beast_migration, None);
        }
        assert!(outcome.beast_spawn_chance > 0.0);
    }

    #[tokio::test]
    async fn expired_zone_is_ignored() {
        let store = FakeStore::default();
        let mut expired = zone(5, 0.6);
        expired.active_until = Some(now() - chrono::Duration::minutes(1));
        *store.zone.lock().unwrap() = Some(expired);
        let service = HuntingService::new(store);
        let mut rng = SmallRng::seed_from_u64(42);

        let outcome = service.hunt(&request(1), now(), &mut rng).await.unwrap();
        assert!(outcome.aura.is_none());
        assert!(outcome.class_probabilities.get(MutationClass::Beast).abs() < 1e-12);
    }

    #[tokio::test]
    async fn unknown_actor_is_an_error() {
        let service = HuntingService::new(FakeStore::default());
        let mut rng = SmallRng::seed_from_u64(42);

        let result = service.hunt(&request(99), now(), &mut rng).await;
        assert!(matches!(
            result,
            Err(HuntError::Store(StoreError::NotFound { entity: "character", .. }))
        ));
        assert!(service.store().granted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_finite_score_is_rejected() {
        let service = HuntingService::new(FakeStore::default());
        let mut rng = SmallRng::seed_from_u64(42);
        let mut bad = request(1);
        bad.minigame_score = f64::NAN;

        let result = service.hunt(&bad, now(), &mut rng).await;
        assert!(matches!(
            result,
            Err(HuntError::InvalidInput { field: "minigame_score", .. })
        ));
    }
}
