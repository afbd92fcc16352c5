//! Error types for the crafting crate.
//!
//! Every variant except [`CraftError::Store`] is a validation failure
//! raised before any material is touched. A failed craft roll is not an
//! error; it is reported as [`CraftOutcome::Failed`].
//!
//! [`CraftOutcome::Failed`]: crate::engine::CraftOutcome::Failed

use anketnica_types::{MaterialRequirement, Rank, RecipeId, StoreError};

/// Reasons a craft cannot be attempted.
#[derive(Debug, thiserror::Error)]
pub enum CraftError {
    /// The store failed or the crafter does not exist.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// No recipe has the requested id.
    #[error("recipe {recipe} not found")]
    RecipeNotFound {
        /// The requested recipe.
        recipe: RecipeId,
    },

    /// The recipe exists but is switched off.
    #[error("recipe {recipe} is not active")]
    RecipeInactive {
        /// The requested recipe.
        recipe: RecipeId,
    },

    /// The crafter's rank is below the recipe's minimum.
    #[error("rank {required} or higher is required to craft this recipe (crafter is {actual})")]
    RankTooLow {
        /// The recipe's minimum crafter rank.
        required: Rank,
        /// The crafter's rank.
        actual: Rank,
    },

    /// The crafter lacks some materials.
    #[error("insufficient materials: {} requirement(s) short", missing.len())]
    InsufficientMaterials {
        /// Each short requirement with the quantity still missing.
        missing: Vec<MaterialRequirement>,
    },

    /// A stack quantity would overflow.
    #[error("arithmetic overflow: {context}")]
    ArithmeticOverflow {
        /// What was being computed.
        context: String,
    },
}
