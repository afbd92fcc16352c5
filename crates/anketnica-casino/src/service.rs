//! Race orchestration.

use rand::Rng;
use serde::Serialize;
use tracing::info;

use anketnica_types::{Horse, HorseRecord};

use crate::betting::{self, Odds};
use crate::error::CasinoError;
use crate::field;
use crate::race::{self, RaceEntry};
use crate::store::StableStore;

/// A finished race.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RaceResult {
    /// Odds offered before the start.
    pub odds: Odds,
    /// Entrants ranked by finish time.
    pub entries: Vec<RaceEntry>,
}

impl RaceResult {
    /// The winning entry.
    pub fn winner(&self) -> Option<&RaceEntry> {
        self.entries.first()
    }
}

/// Runs races and keeps horse records up to date.
#[derive(Debug, Clone)]
pub struct RaceService<S> {
    store: S,
}

impl<S: StableStore> RaceService<S> {
    /// Create a service over `store`.
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Draw a random field from the stable.
    pub async fn random_field(&self, rng: &mut impl Rng) -> Result<Vec<Horse>, CasinoError> {
        let roster = self.store.horses().await?;
        Ok(field::random_field(&roster, rng))
    }

    /// Price and run a race, then record every entrant's finish.
    pub async fn run(
        &self,
        entrants: &[Horse],
        rng: &mut impl Rng,
    ) -> Result<RaceResult, CasinoError> {
        if entrants.is_empty() {
            return Err(CasinoError::EmptyField);
        }

        let odds = betting::odds(entrants);
        let entries = race::simulate(entrants, rng);

        let tallies: Vec<HorseRecord> = entries
            .iter()
            .map(|entry| {
                let mut tally = HorseRecord::new(entry.horse_id);
                tally.record(entry.position, entry.earnings);
                tally
            })
            .collect();
        self.store.record_race(&tallies).await?;

        let result = RaceResult { odds, entries };
        if let Some(winner) = result.winner() {
            info!(
                entrants = entrants.len(),
                winner = %winner.name,
                finish_time = winner.finish_time,
                "Race finished"
            );
        }
        Ok(result)
    }
}
