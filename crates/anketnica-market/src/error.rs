//! Error types for the price engines.

use anketnica_types::{InstrumentId, StoreError};

/// Reasons a price tick fails. The scheduler logs them and ticks again.
#[derive(Debug, thiserror::Error)]
pub enum MarketError {
    /// The store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The drawn change is not a usable number.
    #[error("instrument {instrument}: unusable change {change}: {reason}")]
    InvalidChange {
        /// The instrument being priced.
        instrument: InstrumentId,
        /// The offending change.
        change: f64,
        /// Why it cannot be applied.
        reason: String,
    },

    /// The new price does not fit a decimal.
    #[error("instrument {instrument}: price overflow")]
    PriceOverflow {
        /// The instrument being priced.
        instrument: InstrumentId,
    },
}
