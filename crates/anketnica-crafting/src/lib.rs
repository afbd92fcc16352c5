//! Crafting of items from hunted materials for the Anketnica game economy.
//!
//! A craft consumes materials, rolls for success, and either yields an item
//! or refunds part of what it consumed. The whole attempt is persisted as
//! one atomic commit.
//!
//! # Modules
//!
//! - [`stockpile`] -- In-memory working set of a crafter's stacks
//! - [`engine`] -- Success chance, refunds and craft resolution
//! - [`stats`] -- History statistics
//! - [`store`] -- Persistence boundary
//! - [`service`] -- Crafting operations over a store
//! - [`error`] -- Validation errors

pub mod engine;
pub mod error;
pub mod service;
pub mod stats;
pub mod stockpile;
pub mod store;

pub use engine::{
    CraftOutcome, CraftResolution, MaterialCheck, Refund, check_materials, craft_item,
    resolve_craft, return_percentage, success_chance,
};
pub use error::CraftError;
pub use service::{CraftingService, DEFAULT_HISTORY_LIMIT};
pub use stats::CraftingStats;
pub use stockpile::{StackChange, Stockpile};
pub use store::{CraftCommit, CraftingStore};
