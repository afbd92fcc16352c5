//! Crafting tables: recipes, material stacks, inventory and history.
//!
//! A craft attempt arrives as one [`CraftCommit`] and is applied inside a
//! single transaction: stack deletions and adjustments, new stacks, the
//! inventory item and the history row land together or not at all.

use sqlx::{FromRow, Sqlite, Transaction};

use anketnica_crafting::{CraftCommit, CraftingStore, StackChange};
use anketnica_types::json::{or_default_logged, parse_optional};
use anketnica_types::{
    CharacterId, CraftRecord, CraftedItem, MaterialId, MaterialRequirement, MaterialStack, Rank,
    Recipe, RecipeId, StackId, StoreError, UsedMaterial,
};

use crate::codec::{decode_label, decode_time, encode_time, narrow};
use crate::error::DbError;
use crate::sqlite::SqliteStore;

/// Columns selected for a recipe.
const RECIPE_COLUMNS: &str = "id, item_name, item_rank, item_kind, required_materials, \
     base_success_chance, min_crafter_rank, item_properties, description, is_active";

/// Row from `craft_recipes`.
#[derive(Debug, FromRow)]
pub(crate) struct RecipeRow {
    id: i64,
    item_name: String,
    item_rank: String,
    item_kind: String,
    required_materials: String,
    base_success_chance: f64,
    min_crafter_rank: String,
    item_properties: String,
    description: String,
    is_active: bool,
}

impl TryFrom<RecipeRow> for Recipe {
    type Error = DbError;

    fn try_from(row: RecipeRow) -> Result<Self, DbError> {
        const ENTITY: &str = "craft_recipes";
        let required_materials: Vec<MaterialRequirement> =
            parse_optional(Some(row.required_materials.as_str()))?;
        let item_properties = or_default_logged(
            parse_optional::<serde_json::Value>(Some(row.item_properties.as_str())),
            "craft_recipes.item_properties",
        );
        Ok(Self {
            id: RecipeId::new(row.id),
            item_name: row.item_name,
            item_rank: decode_label(ENTITY, &row.item_rank)?,
            item_kind: row.item_kind,
            required_materials,
            base_success_chance: row.base_success_chance,
            min_crafter_rank: decode_label(ENTITY, &row.min_crafter_rank)?,
            item_properties,
            description: row.description,
            is_active: row.is_active,
        })
    }
}

/// Row from `character_materials` joined with its catalog name.
#[derive(Debug, FromRow)]
pub(crate) struct StackRow {
    id: i64,
    character_id: i64,
    material_id: i64,
    material_name: String,
    quantity: i64,
    quality_modifier: f64,
    obtained_at: String,
}

impl TryFrom<StackRow> for MaterialStack {
    type Error = DbError;

    fn try_from(row: StackRow) -> Result<Self, DbError> {
        const ENTITY: &str = "character_materials";
        Ok(Self {
            id: StackId::new(row.id),
            owner_id: CharacterId::new(row.character_id),
            material_id: MaterialId::new(row.material_id),
            material_name: row.material_name,
            quantity: narrow(ENTITY, "quantity", row.quantity)?,
            quality_modifier: row.quality_modifier,
            obtained_at: decode_time(ENTITY, &row.obtained_at)?,
        })
    }
}

/// Row from `crafting_history`.
#[derive(Debug, FromRow)]
pub(crate) struct HistoryRow {
    character_id: i64,
    recipe_id: i64,
    item_name: String,
    success: bool,
    materials_used: String,
    item: Option<String>,
    crafted_at: String,
}

impl TryFrom<HistoryRow> for CraftRecord {
    type Error = DbError;

    fn try_from(row: HistoryRow) -> Result<Self, DbError> {
        const ENTITY: &str = "crafting_history";
        let materials_used: Vec<UsedMaterial> = or_default_logged(
            parse_optional(Some(row.materials_used.as_str())),
            "crafting_history.materials_used",
        );
        let item: Option<CraftedItem> = or_default_logged(
            parse_optional(row.item.as_deref()),
            "crafting_history.item",
        );
        Ok(Self {
            character_id: CharacterId::new(row.character_id),
            recipe_id: RecipeId::new(row.recipe_id),
            item_name: row.item_name,
            success: row.success,
            materials_used,
            item,
            crafted_at: decode_time(ENTITY, &row.crafted_at)?,
        })
    }
}

/// Row from `character_inventory`.
#[derive(Debug, FromRow)]
pub(crate) struct InventoryRow {
    item_name: String,
    item_rank: String,
    item_kind: String,
    properties: String,
    description: String,
    crafted_from: String,
    obtained_at: String,
}

impl TryFrom<InventoryRow> for CraftedItem {
    type Error = DbError;

    fn try_from(row: InventoryRow) -> Result<Self, DbError> {
        const ENTITY: &str = "character_inventory";
        Ok(Self {
            name: row.item_name,
            rank: decode_label(ENTITY, &row.item_rank)?,
            kind: row.item_kind,
            properties: or_default_logged(
                parse_optional(Some(row.properties.as_str())),
                "character_inventory.properties",
            ),
            description: row.description,
            crafted_from: or_default_logged(
                parse_optional(Some(row.crafted_from.as_str())),
                "character_inventory.crafted_from",
            ),
            obtained_at: decode_time(ENTITY, &row.obtained_at)?,
        })
    }
}

impl SqliteStore {
    /// A recipe by id.
    pub async fn get_recipe(&self, id: RecipeId) -> Result<Option<Recipe>, DbError> {
        let row = sqlx::query_as::<_, RecipeRow>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM craft_recipes WHERE id = ?"
        ))
        .bind(id.into_inner())
        .fetch_optional(self.pool())
        .await?;
        row.map(Recipe::try_from).transpose()
    }

    /// Every active recipe, by id.
    pub async fn list_active_recipes(&self) -> Result<Vec<Recipe>, DbError> {
        let rows = sqlx::query_as::<_, RecipeRow>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM craft_recipes WHERE is_active = 1 ORDER BY id"
        ))
        .fetch_all(self.pool())
        .await?;
        rows.into_iter().map(Recipe::try_from).collect()
    }

    /// A character's stacks, oldest first.
    pub async fn list_material_stacks(
        &self,
        owner: CharacterId,
    ) -> Result<Vec<MaterialStack>, DbError> {
        let rows = sqlx::query_as::<_, StackRow>(
            r"SELECT cm.id, cm.character_id, cm.material_id, m.name AS material_name,
                     cm.quantity, cm.quality_modifier, cm.obtained_at
              FROM character_materials cm
              JOIN crafting_materials m ON m.id = cm.material_id
              WHERE cm.character_id = ?
              ORDER BY cm.obtained_at, cm.id",
        )
        .bind(owner.into_inner())
        .fetch_all(self.pool())
        .await?;
        rows.into_iter().map(MaterialStack::try_from).collect()
    }

    /// Crafted items a character owns, oldest first.
    pub async fn list_inventory(&self, owner: CharacterId) -> Result<Vec<CraftedItem>, DbError> {
        let rows = sqlx::query_as::<_, InventoryRow>(
            r"SELECT item_name, item_rank, item_kind, properties, description, crafted_from, obtained_at
              FROM character_inventory
              WHERE character_id = ?
              ORDER BY id",
        )
        .bind(owner.into_inner())
        .fetch_all(self.pool())
        .await?;
        rows.into_iter().map(CraftedItem::try_from).collect()
    }

    /// Craft history, newest first.
    pub async fn list_craft_history(
        &self,
        owner: CharacterId,
        limit: Option<u32>,
    ) -> Result<Vec<CraftRecord>, DbError> {
        // SQLite treats a negative limit as no limit.
        let limit = limit.map_or(-1, i64::from);
        let rows = sqlx::query_as::<_, HistoryRow>(
            r"SELECT character_id, recipe_id, item_name, success, materials_used, item, crafted_at
              FROM crafting_history
              WHERE character_id = ?
              ORDER BY crafted_at DESC, id DESC
              LIMIT ?",
        )
        .bind(owner.into_inner())
        .bind(limit)
        .fetch_all(self.pool())
        .await?;
        rows.into_iter().map(CraftRecord::try_from).collect()
    }

    /// Apply a craft attempt atomically.
    pub async fn apply_craft(&self, commit: &CraftCommit) -> Result<(), DbError> {
        let mut tx = self.pool().begin().await?;
        let owner = commit.owner.into_inner();

        for change in &commit.changes {
            apply_stack_change(&mut tx, owner, change).await?;
        }

        if let Some(item) = &commit.item {
            sqlx::query(
                r"INSERT INTO character_inventory
                    (character_id, item_name, item_rank, item_kind, properties, description, crafted_from, obtained_at)
                  VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(owner)
            .bind(&item.name)
            .bind(item.rank.label())
            .bind(&item.kind)
            .bind(serde_json::to_string(&item.properties)?)
            .bind(&item.description)
            .bind(serde_json::to_string(&item.crafted_from)?)
            .bind(encode_time(item.obtained_at))
            .execute(&mut *tx)
            .await?;
        }

        let record = &commit.record;
        sqlx::query(
            r"INSERT INTO crafting_history
                (character_id, recipe_id, item_name, success, materials_used, item, crafted_at)
              VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.character_id.into_inner())
        .bind(record.recipe_id.into_inner())
        .bind(&record.item_name)
        .bind(record.success)
        .bind(serde_json::to_string(&record.materials_used)?)
        .bind(record.item.as_ref().map(serde_json::to_string).transpose()?)
        .bind(encode_time(record.crafted_at))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::debug!(
            owner = %commit.owner,
            writes = commit.changes.len(),
            success = record.success,
            "Craft committed"
        );
        Ok(())
    }
}

async fn apply_stack_change(
    tx: &mut Transaction<'_, Sqlite>,
    owner: i64,
    change: &StackChange,
) -> Result<(), DbError> {
    match change {
        StackChange::Delete { stack_id, expected } => {
            let result = sqlx::query(
                r"DELETE FROM character_materials
                  WHERE id = ? AND character_id = ? AND quantity = ?",
            )
            .bind(stack_id.into_inner())
            .bind(owner)
            .bind(i64::from(*expected))
            .execute(&mut **tx)
            .await?;
            if result.rows_affected() == 0 {
                return Err(DbError::Conflict(format!(
                    "stack {stack_id} no longer holds {expected} units"
                )));
            }
        }
        StackChange::Adjust {
            stack_id,
            expected,
            delta,
        } => {
            let result = sqlx::query(
                r"UPDATE character_materials
                  SET quantity = quantity + ?
                  WHERE id = ? AND character_id = ? AND quantity = ?",
            )
            .bind(*delta)
            .bind(stack_id.into_inner())
            .bind(owner)
            .bind(i64::from(*expected))
            .execute(&mut **tx)
            .await?;
            if result.rows_affected() == 0 {
                return Err(DbError::Conflict(format!(
                    "stack {stack_id} no longer holds {expected} units"
                )));
            }
        }
        StackChange::Create {
            material_id,
            quantity,
            quality_modifier,
            obtained_at,
        } => {
            sqlx::query(
                r"INSERT INTO character_materials
                    (character_id, material_id, quantity, quality_modifier, obtained_at)
                  VALUES (?, ?, ?, ?, ?)",
            )
            .bind(owner)
            .bind(material_id.into_inner())
            .bind(i64::from(*quantity))
            .bind(*quality_modifier)
            .bind(encode_time(*obtained_at))
            .execute(&mut **tx)
            .await?;
        }
    }
    Ok(())
}

impl CraftingStore for SqliteStore {
    async fn recipe(&self, id: RecipeId) -> Result<Option<Recipe>, StoreError> {
        Ok(self.get_recipe(id).await?)
    }

    async fn active_recipes(&self) -> Result<Vec<Recipe>, StoreError> {
        Ok(self.list_active_recipes().await?)
    }

    async fn actor_rank(&self, actor: CharacterId) -> Result<Rank, StoreError> {
        Ok(self.character_rank(actor).await?)
    }

    async fn material_stacks(
        &self,
        owner: CharacterId,
    ) -> Result<Vec<MaterialStack>, StoreError> {
        Ok(self.list_material_stacks(owner).await?)
    }

    async fn commit_craft(&self, commit: &CraftCommit) -> Result<(), StoreError> {
        Ok(self.apply_craft(commit).await?)
    }

    async fn craft_history(
        &self,
        owner: CharacterId,
        limit: Option<u32>,
    ) -> Result<Vec<CraftRecord>, StoreError> {
        Ok(self.list_craft_history(owner, limit).await?)
    }
}
