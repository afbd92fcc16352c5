//! Persistence boundary of the race service.

use std::future::Future;

use anketnica_types::{Horse, HorseId, HorseRecord, StoreError};

/// Reads and writes the race service needs.
pub trait StableStore: Send + Sync {
    /// Every horse in the stable.
    fn horses(&self) -> impl Future<Output = Result<Vec<Horse>, StoreError>> + Send;

    /// Race record of a horse; an empty record if it never raced.
    fn horse_record(
        &self,
        horse: HorseId,
    ) -> impl Future<Output = Result<HorseRecord, StoreError>> + Send;

    /// Add each tally onto its horse's stored record, all in one
    /// transaction. [`StoreError::NotFound`] for an unknown horse, in which
    /// case nothing is written.
    fn record_race(
        &self,
        tallies: &[HorseRecord],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}
