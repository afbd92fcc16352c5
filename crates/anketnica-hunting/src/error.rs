//! Error types for the hunting crate.

use anketnica_types::StoreError;

/// Errors that stop a hunt before any loot is granted.
#[derive(Debug, thiserror::Error)]
pub enum HuntError {
    /// The store failed or a referenced record is missing.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A minigame input was not a usable number.
    #[error("invalid hunt input {field}: {reason}")]
    InvalidInput {
        /// Name of the offending input.
        field: &'static str,
        /// What was wrong with it.
        reason: String,
    },
}
