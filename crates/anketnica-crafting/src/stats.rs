//! Aggregate statistics over a crafter's history.

use serde::Serialize;

use anketnica_types::CraftRecord;

/// Success tally of a crafter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CraftingStats {
    /// All attempts.
    pub total_crafts: u32,
    /// Attempts that produced an item.
    pub successful_crafts: u32,
    /// Attempts whose roll failed.
    pub failed_crafts: u32,
    /// Successful attempts as a percentage of all attempts, 0 when none.
    pub success_rate: f64,
}

impl CraftingStats {
    /// Stats from raw counts. `successful` is capped at `total`.
    pub fn new(total: u32, successful: u32) -> Self {
        let successful_crafts = successful.min(total);
        let success_rate = if total == 0 {
            0.0
        } else {
            f64::from(successful_crafts) / f64::from(total) * 100.0
        };
        Self {
            total_crafts: total,
            successful_crafts,
            failed_crafts: total.saturating_sub(successful_crafts),
            success_rate,
        }
    }

    /// Stats over a list of history records.
    pub fn from_records(records: &[CraftRecord]) -> Self {
        let total = u32::try_from(records.len()).unwrap_or(u32::MAX);
        let successful = records.iter().filter(|r| r.success).count();
        let successful = u32::try_from(successful).unwrap_or(u32::MAX);
        Self::new(total, successful)
    }
}
