//! Persistence boundary of the hunting service.

use std::future::Future;

use chrono::{DateTime, Utc};

use anketnica_types::{
    CharacterId, EchoZone, LocationId, Rank, Species, SpeciesId, StoreError, ZoneId,
};

use crate::loot::LootMaterial;

/// Reads and writes the hunting service needs.
pub trait HuntingStore: Send + Sync {
    /// Rank of a character. [`StoreError::NotFound`] if it does not exist.
    fn actor_rank(
        &self,
        actor: CharacterId,
    ) -> impl Future<Output = Result<Rank, StoreError>> + Send;

    /// A bestiary entry. [`StoreError::NotFound`] if it does not exist.
    fn species(&self, id: SpeciesId) -> impl Future<Output = Result<Species, StoreError>> + Send;

    /// The Echo Zone open over `location` at `now`, if any.
    fn active_zone(
        &self,
        location: LocationId,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Option<EchoZone>, StoreError>> + Send;

    /// Add one stack per material to the owner, creating catalog entries
    /// for names seen for the first time.
    fn grant_loot(
        &self,
        owner: CharacterId,
        materials: &[LootMaterial],
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Persist a zone's residual Aura and last Beast migration.
    fn save_zone_aura(
        &self,
        zone: ZoneId,
        residual_aura_level: f64,
        last_beast_migration: Option<DateTime<Utc>>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}
