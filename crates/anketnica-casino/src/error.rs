//! Error types for the casino crate.

use anketnica_types::StoreError;

/// Reasons a race cannot be run.
#[derive(Debug, thiserror::Error)]
pub enum CasinoError {
    /// The store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// No horses were entered.
    #[error("a race needs at least one entrant")]
    EmptyField,
}
