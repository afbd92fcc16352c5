//! Catalog writes: characters, species, zones, recipes, instruments,
//! events and horses.
//!
//! The engines only read these tables; content is authored elsewhere and
//! seeded through these inserts. Each returns the new row id.

use chrono::{DateTime, Utc};

use anketnica_types::{
    CharacterId, EchoZone, Horse, HorseId, Instrument, InstrumentId, InstrumentKind, MarketEvent,
    MarketEventId, MaterialId, MaterialStack, MaterialType, Rank, Recipe, RecipeId, Species,
    SpeciesId, StackId, ZoneId,
};

use crate::codec::{encode_time, widen};
use crate::error::DbError;
use crate::sqlite::SqliteStore;

impl SqliteStore {
    /// Add a character.
    pub async fn insert_character(
        &self,
        name: &str,
        rank: Rank,
        now: DateTime<Utc>,
    ) -> Result<CharacterId, DbError> {
        let id = sqlx::query("INSERT INTO characters (name, rank, created_at) VALUES (?, ?, ?)")
            .bind(name)
            .bind(rank.label())
            .bind(encode_time(now))
            .execute(self.pool())
            .await?
            .last_insert_rowid();
        Ok(CharacterId::new(id))
    }

    /// Add a bestiary entry. The id field is ignored.
    pub async fn insert_species(&self, species: &Species) -> Result<SpeciesId, DbError> {
        let id = sqlx::query(
            r"INSERT INTO bestiary_species
                (name, danger_rank, habitat_type, drop_items, credit_value_min, credit_value_max)
              VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&species.name)
        .bind(species.danger_rank.label())
        .bind(species.habitat_type.label())
        .bind(species.drop_items.as_deref())
        .bind(widen(species.credit_value_min))
        .bind(widen(species.credit_value_max))
        .execute(self.pool())
        .await?
        .last_insert_rowid();
        Ok(SpeciesId::new(id))
    }

    /// Open an Echo Zone. The id field is ignored.
    pub async fn insert_zone(&self, zone: &EchoZone) -> Result<ZoneId, DbError> {
        let id = sqlx::query(
            r"INSERT INTO echo_zones
                (location_id, intensity, residual_aura_level, last_beast_migration, active_until)
              VALUES (?, ?, ?, ?, ?)",
        )
        .bind(zone.location_id.into_inner())
        .bind(i64::from(zone.intensity))
        .bind(zone.residual_aura_level)
        .bind(zone.last_beast_migration.map(encode_time))
        .bind(zone.active_until.map(encode_time))
        .execute(self.pool())
        .await?
        .last_insert_rowid();
        Ok(ZoneId::new(id))
    }

    /// Add a material to the catalog, or return the id of the one with the
    /// same name.
    pub async fn ensure_material(
        &self,
        name: &str,
        material_type: MaterialType,
    ) -> Result<MaterialId, DbError> {
        sqlx::query(
            "INSERT INTO crafting_materials (name, material_type) VALUES (?, ?) ON CONFLICT (name) DO NOTHING",
        )
        .bind(name)
        .bind(material_type.as_str())
        .execute(self.pool())
        .await?;
        let id: i64 = sqlx::query_scalar("SELECT id FROM crafting_materials WHERE name = ?")
            .bind(name)
            .fetch_one(self.pool())
            .await?;
        Ok(MaterialId::new(id))
    }

    /// Add a material stack. The id and name fields are ignored.
    pub async fn insert_stack(&self, stack: &MaterialStack) -> Result<StackId, DbError> {
        let id = sqlx::query(
            r"INSERT INTO character_materials
                (character_id, material_id, quantity, quality_modifier, obtained_at)
              VALUES (?, ?, ?, ?, ?)",
        )
        .bind(stack.owner_id.into_inner())
        .bind(stack.material_id.into_inner())
        .bind(i64::from(stack.quantity))
        .bind(stack.quality_modifier)
        .bind(encode_time(stack.obtained_at))
        .execute(self.pool())
        .await?
        .last_insert_rowid();
        Ok(StackId::new(id))
    }

    /// Add a recipe. The id field is ignored.
    pub async fn insert_recipe(&self, recipe: &Recipe) -> Result<RecipeId, DbError> {
        let id = sqlx::query(
            r"INSERT INTO craft_recipes
                (item_name, item_rank, item_kind, required_materials, base_success_chance,
                 min_crafter_rank, item_properties, description, is_active)
              VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&recipe.item_name)
        .bind(recipe.item_rank.label())
        .bind(&recipe.item_kind)
        .bind(serde_json::to_string(&recipe.required_materials)?)
        .bind(recipe.base_success_chance)
        .bind(recipe.min_crafter_rank.label())
        .bind(serde_json::to_string(&recipe.item_properties)?)
        .bind(&recipe.description)
        .bind(recipe.is_active)
        .execute(self.pool())
        .await?
        .last_insert_rowid();
        Ok(RecipeId::new(id))
    }

    /// Add a stock or cryptocurrency. The id field is ignored.
    pub async fn insert_instrument(&self, instrument: &Instrument) -> Result<InstrumentId, DbError> {
        let query = match instrument.kind {
            InstrumentKind::Stock => sqlx::query(
                r"INSERT INTO stocks (name, symbol, current_price, base_volatility, base_trend)
                  VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&instrument.name)
            .bind(&instrument.symbol)
            .bind(instrument.current_price.to_string())
            .bind(instrument.base_volatility)
            .bind(instrument.base_trend),
            InstrumentKind::Crypto => sqlx::query(
                r"INSERT INTO crypto_currencies
                    (name, symbol, current_price, base_volatility, base_trend,
                     total_supply, circulating_supply, market_cap)
                  VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&instrument.name)
            .bind(&instrument.symbol)
            .bind(instrument.current_price.to_string())
            .bind(instrument.base_volatility)
            .bind(instrument.base_trend)
            .bind(instrument.total_supply.map(widen))
            .bind(instrument.circulating_supply.map(widen))
            .bind(instrument.market_cap.map(|cap| cap.to_string())),
        };
        let id = query.execute(self.pool()).await?.last_insert_rowid();
        Ok(InstrumentId::new(id))
    }

    /// Schedule a market event. The id field is ignored.
    pub async fn insert_market_event(
        &self,
        event: &MarketEvent,
        title: &str,
    ) -> Result<MarketEventId, DbError> {
        let sql = match event.kind {
            InstrumentKind::Stock => {
                "INSERT INTO market_events (title, stock_id, impact_strength, start_time, end_time) VALUES (?, ?, ?, ?, ?)"
            }
            InstrumentKind::Crypto => {
                "INSERT INTO crypto_events (title, crypto_id, impact_strength, start_time, end_time) VALUES (?, ?, ?, ?, ?)"
            }
        };
        let id = sqlx::query(sql)
            .bind(title)
            .bind(event.instrument_id.map(InstrumentId::into_inner))
            .bind(event.impact_strength)
            .bind(encode_time(event.start_time))
            .bind(encode_time(event.end_time))
            .execute(self.pool())
            .await?
            .last_insert_rowid();
        Ok(MarketEventId::new(id))
    }

    /// Add a horse with an empty record. The id field is ignored.
    pub async fn insert_horse(&self, horse: &Horse) -> Result<HorseId, DbError> {
        let id = sqlx::query(
            r"INSERT INTO horses (name, base_speed, base_stamina, base_luck, description)
              VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&horse.name)
        .bind(i64::from(horse.base_speed))
        .bind(i64::from(horse.base_stamina))
        .bind(i64::from(horse.base_luck))
        .bind(&horse.description)
        .execute(self.pool())
        .await?
        .last_insert_rowid();
        Ok(HorseId::new(id))
    }

    /// Add every horse whose name is not in the stable yet, in one
    /// transaction. Returns how many were added.
    pub async fn seed_stable(&self, horses: &[Horse]) -> Result<u64, DbError> {
        let mut tx = self.pool().begin().await?;
        let mut added = 0_u64;
        for horse in horses {
            let result = sqlx::query(
                r"INSERT OR IGNORE INTO horses (name, base_speed, base_stamina, base_luck, description)
                  VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&horse.name)
            .bind(i64::from(horse.base_speed))
            .bind(i64::from(horse.base_stamina))
            .bind(i64::from(horse.base_luck))
            .bind(&horse.description)
            .execute(&mut *tx)
            .await?;
            added = added.saturating_add(result.rows_affected());
        }
        tx.commit().await?;
        tracing::debug!(added, offered = horses.len(), "Stable seeded");
        Ok(added)
    }
}
