//! Persistence boundary of the crafting service.

use std::future::Future;

use anketnica_types::{
    CharacterId, CraftRecord, CraftedItem, MaterialStack, Rank, Recipe, RecipeId, StoreError,
};

use crate::stockpile::StackChange;

/// Everything one craft attempt writes. Applied atomically.
#[derive(Debug, Clone, PartialEq)]
pub struct CraftCommit {
    /// The crafter.
    pub owner: CharacterId,
    /// Net stack writes: consumption and any refund together.
    pub changes: Vec<StackChange>,
    /// Item to add to the crafter's inventory on success.
    pub item: Option<CraftedItem>,
    /// History row of the attempt.
    pub record: CraftRecord,
}

/// Reads and writes the crafting service needs.
pub trait CraftingStore: Send + Sync {
    /// A recipe by id, `None` when absent.
    fn recipe(
        &self,
        id: RecipeId,
    ) -> impl Future<Output = Result<Option<Recipe>, StoreError>> + Send;

    /// Every active recipe.
    fn active_recipes(&self) -> impl Future<Output = Result<Vec<Recipe>, StoreError>> + Send;

    /// Rank of a character. [`StoreError::NotFound`] if it does not exist.
    fn actor_rank(
        &self,
        actor: CharacterId,
    ) -> impl Future<Output = Result<Rank, StoreError>> + Send;

    /// All material stacks of a character, in any order.
    fn material_stacks(
        &self,
        owner: CharacterId,
    ) -> impl Future<Output = Result<Vec<MaterialStack>, StoreError>> + Send;

    /// Apply a craft attempt in one transaction. Either every write lands
    /// or none does. [`StoreError::Conflict`] when a stack is gone or no
    /// longer holds the quantity the change was built from.
    fn commit_craft(
        &self,
        commit: &CraftCommit,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// History of a character, newest first, at most `limit` rows when set.
    fn craft_history(
        &self,
        owner: CharacterId,
        limit: Option<u32>,
    ) -> impl Future<Output = Result<Vec<CraftRecord>, StoreError>> + Send;
}
