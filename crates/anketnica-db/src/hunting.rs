//! Hunting tables: characters, bestiary, Echo Zones and granted materials.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use anketnica_hunting::{HuntingStore, LootMaterial};
use anketnica_types::{
    CharacterId, EchoZone, LocationId, Rank, Species, SpeciesId, StoreError, ZoneId,
};

use crate::codec::{decode_label, decode_optional_time, encode_time, narrow, widen};
use crate::error::DbError;
use crate::sqlite::SqliteStore;

/// Row from `bestiary_species`.
#[derive(Debug, FromRow)]
pub(crate) struct SpeciesRow {
    id: i64,
    name: String,
    danger_rank: String,
    habitat_type: String,
    drop_items: Option<String>,
    credit_value_min: i64,
    credit_value_max: i64,
}

impl TryFrom<SpeciesRow> for Species {
    type Error = DbError;

    fn try_from(row: SpeciesRow) -> Result<Self, DbError> {
        const ENTITY: &str = "bestiary_species";
        Ok(Self {
            id: SpeciesId::new(row.id),
            name: row.name,
            danger_rank: decode_label(ENTITY, &row.danger_rank)?,
            habitat_type: decode_label(ENTITY, &row.habitat_type)?,
            drop_items: row.drop_items,
            credit_value_min: narrow(ENTITY, "credit_value_min", row.credit_value_min)?,
            credit_value_max: narrow(ENTITY, "credit_value_max", row.credit_value_max)?,
        })
    }
}

/// Row from `echo_zones`.
#[derive(Debug, FromRow)]
pub(crate) struct ZoneRow {
    id: i64,
    location_id: i64,
    intensity: i64,
    residual_aura_level: f64,
    last_beast_migration: Option<String>,
    active_until: Option<String>,
}

impl TryFrom<ZoneRow> for EchoZone {
    type Error = DbError;

    fn try_from(row: ZoneRow) -> Result<Self, DbError> {
        const ENTITY: &str = "echo_zones";
        Ok(Self {
            id: ZoneId::new(row.id),
            location_id: LocationId::new(row.location_id),
            intensity: narrow(ENTITY, "intensity", row.intensity)?,
            residual_aura_level: row.residual_aura_level,
            last_beast_migration: decode_optional_time(
                ENTITY,
                row.last_beast_migration.as_deref(),
            )?,
            active_until: decode_optional_time(ENTITY, row.active_until.as_deref())?,
        })
    }
}

impl SqliteStore {
    /// Rank of a character.
    pub async fn character_rank(&self, id: CharacterId) -> Result<Rank, DbError> {
        let rank: Option<String> = sqlx::query_scalar("SELECT rank FROM characters WHERE id = ?")
            .bind(id.into_inner())
            .fetch_optional(self.pool())
            .await?;
        let rank = rank.ok_or_else(|| DbError::not_found("character", id))?;
        decode_label("characters", &rank)
    }

    /// A bestiary entry.
    pub async fn get_species(&self, id: SpeciesId) -> Result<Species, DbError> {
        let row = sqlx::query_as::<_, SpeciesRow>(
            r"SELECT id, name, danger_rank, habitat_type, drop_items, credit_value_min, credit_value_max
              FROM bestiary_species
              WHERE id = ?",
        )
        .bind(id.into_inner())
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| DbError::not_found("species", id))?;
        Species::try_from(row)
    }

    /// The most recent zone over `location` still open at `now`.
    pub async fn get_active_zone(
        &self,
        location: LocationId,
        now: DateTime<Utc>,
    ) -> Result<Option<EchoZone>, DbError> {
        let row = sqlx::query_as::<_, ZoneRow>(
            r"SELECT id, location_id, intensity, residual_aura_level, last_beast_migration, active_until
              FROM echo_zones
              WHERE location_id = ? AND (active_until IS NULL OR active_until > ?)
              ORDER BY id DESC
              LIMIT 1",
        )
        .bind(location.into_inner())
        .bind(encode_time(now))
        .fetch_optional(self.pool())
        .await?;
        row.map(EchoZone::try_from).transpose()
    }

    /// Grant loot stacks in one transaction, creating catalog entries for
    /// new material names.
    pub async fn insert_loot(
        &self,
        owner: CharacterId,
        materials: &[LootMaterial],
        now: DateTime<Utc>,
    ) -> Result<(), DbError> {
        if materials.is_empty() {
            return Ok(());
        }
        let obtained_at = encode_time(now);
        let mut tx = self.pool().begin().await?;

        for material in materials {
            sqlx::query(
                r"INSERT INTO crafting_materials
                    (name, material_type, mutation_class, source_species_id, aura_property, rarity_tier, credit_value)
                  VALUES (?, ?, ?, ?, ?, ?, ?)
                  ON CONFLICT (name) DO NOTHING",
            )
            .bind(&material.name)
            .bind(material.material_type.as_str())
            .bind(material.mutation_class.label())
            .bind(material.source_species_id.into_inner())
            .bind(material.aura_property.as_deref())
            .bind(i64::from(material.rarity_tier))
            .bind(widen(material.credit_value))
            .execute(&mut *tx)
            .await?;

            let material_id: i64 =
                sqlx::query_scalar("SELECT id FROM crafting_materials WHERE name = ?")
                    .bind(&material.name)
                    .fetch_one(&mut *tx)
                    .await?;

            sqlx::query(
                r"INSERT INTO character_materials
                    (character_id, material_id, quantity, quality_modifier, obtained_at)
                  VALUES (?, ?, ?, ?, ?)",
            )
            .bind(owner.into_inner())
            .bind(material_id)
            .bind(i64::from(material.quantity))
            .bind(material.quality_modifier)
            .bind(&obtained_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!(owner = %owner, stacks = materials.len(), "Granted loot");
        Ok(())
    }

    /// Write a zone's Aura level and last Beast migration.
    pub async fn update_zone_aura(
        &self,
        zone: ZoneId,
        residual_aura_level: f64,
        last_beast_migration: Option<DateTime<Utc>>,
    ) -> Result<(), DbError> {
        let result = sqlx::query(
            r"UPDATE echo_zones
              SET residual_aura_level = ?, last_beast_migration = ?
              WHERE id = ?",
        )
        .bind(residual_aura_level)
        .bind(last_beast_migration.map(encode_time))
        .bind(zone.into_inner())
        .execute(self.pool())
        .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("echo zone", zone));
        }
        Ok(())
    }
}

impl HuntingStore for SqliteStore {
    async fn actor_rank(&self, actor: CharacterId) -> Result<Rank, StoreError> {
        Ok(self.character_rank(actor).await?)
    }

    async fn species(&self, id: SpeciesId) -> Result<Species, StoreError> {
        Ok(self.get_species(id).await?)
    }

    async fn active_zone(
        &self,
        location: LocationId,
        now: DateTime<Utc>,
    ) -> Result<Option<EchoZone>, StoreError> {
        Ok(self.get_active_zone(location, now).await?)
    }

    async fn grant_loot(
        &self,
        owner: CharacterId,
        materials: &[LootMaterial],
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        Ok(self.insert_loot(owner, materials, now).await?)
    }

    async fn save_zone_aura(
        &self,
        zone: ZoneId,
        residual_aura_level: f64,
        last_beast_migration: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        Ok(self
            .update_zone_aura(zone, residual_aura_level, last_beast_migration)
            .await?)
    }
}
