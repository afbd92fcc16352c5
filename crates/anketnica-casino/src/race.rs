//! Race simulation.
//!
//! Every entrant's stats are perturbed by up to ±20% for the day, turned
//! into a finish time, and the field is ranked by that time. Stable
//! earnings follow a flat table that ignores any bets.

use std::cmp::Ordering;

use rand::Rng;
use serde::Serialize;

use anketnica_types::{Horse, HorseId};

/// Fastest possible finish time in seconds.
pub const MIN_FINISH_TIME: f64 = 30.0;

/// Finish time of an average horse before luck.
const BASE_FINISH_TIME: f64 = 60.0;

/// Stat value that neither helps nor hurts.
const STAT_PIVOT: f64 = 5.0;

/// Seconds saved per point of effective speed above the pivot.
const SPEED_WEIGHT: f64 = 2.0;

/// Seconds saved per point of effective stamina above the pivot.
const STAMINA_WEIGHT: f64 = 1.0;

/// Seconds saved per point of effective luck above the pivot.
const LUCK_WEIGHT: f64 = 1.5;

/// Half-width of the random finish-time term.
const TIME_JITTER: f64 = 5.0;

/// Half-width of the daily stat perturbation.
const FORM_SPREAD: f64 = 0.2;

/// Stable earnings by finishing position, first to third.
pub const PLACE_EARNINGS: [u64; 3] = [1000, 500, 250];

/// One horse's result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RaceEntry {
    /// The horse.
    pub horse_id: HorseId,
    /// Its name.
    pub name: String,
    /// Finish time in seconds.
    pub finish_time: f64,
    /// Finishing position, 1 for the winner.
    pub position: u32,
    /// Stable earnings for the position.
    pub earnings: u64,
}

/// Earnings for a finishing position.
pub fn earnings_for(position: u32) -> u64 {
    position
        .checked_sub(1)
        .and_then(|index| usize::try_from(index).ok())
        .and_then(|index| PLACE_EARNINGS.get(index))
        .copied()
        .unwrap_or(0)
}

/// Multiplier in `[0.8, 1.2)` applied to one stat for one race.
fn form(rng: &mut impl Rng) -> f64 {
    (rng.random::<f64>() - 0.5).mul_add(2.0 * FORM_SPREAD, 1.0)
}

/// Finish time of one horse in one race.
pub fn finish_time(horse: &Horse, rng: &mut impl Rng) -> f64 {
    let speed = f64::from(horse.base_speed) * form(rng);
    let stamina = f64::from(horse.base_stamina) * form(rng);
    let luck = f64::from(horse.base_luck) * form(rng);
    let jitter = (rng.random::<f64>() - 0.5) * 2.0 * TIME_JITTER;

    let time = BASE_FINISH_TIME
        - (speed - STAT_PIVOT) * SPEED_WEIGHT
        - (stamina - STAT_PIVOT) * STAMINA_WEIGHT
        - (luck - STAT_PIVOT) * LUCK_WEIGHT
        + jitter;
    time.max(MIN_FINISH_TIME)
}

/// Run a race and rank the field, fastest first.
///
/// Equal times keep entry order.
pub fn simulate(entrants: &[Horse], rng: &mut impl Rng) -> Vec<RaceEntry> {
    let mut timed: Vec<(&Horse, f64)> = entrants
        .iter()
        .map(|horse| (horse, finish_time(horse, rng)))
        .collect();
    timed.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

    timed
        .into_iter()
        .zip(1_u32..)
        .map(|((horse, finish_time), position)| RaceEntry {
            horse_id: horse.id,
            name: horse.name.clone(),
            finish_time,
            position,
            earnings: earnings_for(position),
        })
        .collect()
}
