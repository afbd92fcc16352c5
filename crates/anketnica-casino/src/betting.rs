//! Bookmaker odds and bet payouts.

use std::collections::BTreeMap;

use serde::Serialize;

use anketnica_types::{BetType, Horse, HorseId};

use crate::race::RaceEntry;

/// Lowest odds ever offered.
pub const MIN_ODDS: f64 = 1.1;

/// Share of the fair odds paid out; the rest is the house margin.
const PAYOUT_RATIO: f64 = 0.9;

/// Fraction of the win odds paid on a place bet.
const PLACE_FACTOR: f64 = 0.6;

/// Fraction of the win odds paid on a show bet.
const SHOW_FACTOR: f64 = 0.4;

/// Odds per horse for one field.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Odds {
    by_horse: BTreeMap<HorseId, f64>,
}

impl Odds {
    /// Odds of one horse, `None` if it is not in the field.
    pub fn get(&self, horse: HorseId) -> Option<f64> {
        self.by_horse.get(&horse).copied()
    }

    /// Every horse with its odds, by horse id.
    pub fn iter(&self) -> impl Iterator<Item = (HorseId, f64)> + '_ {
        self.by_horse.iter().map(|(&id, &odds)| (id, odds))
    }

    /// Horses priced.
    pub fn len(&self) -> usize {
        self.by_horse.len()
    }

    /// Whether no horse is priced.
    pub fn is_empty(&self) -> bool {
        self.by_horse.is_empty()
    }
}

/// Price a field.
///
/// `odds = max(1.1, round(total rating / rating × 0.9, 1))`, a horse's
/// rating being the sum of its stats.
pub fn odds(entrants: &[Horse]) -> Odds {
    let total: u32 = entrants
        .iter()
        .fold(0_u32, |sum, horse| sum.saturating_add(horse.rating()));
    let by_horse = entrants
        .iter()
        .map(|horse| {
            let fair = f64::from(total) / f64::from(horse.rating().max(1));
            let offered = (fair * PAYOUT_RATIO * 10.0).round() / 10.0;
            (horse.id, offered.max(MIN_ODDS))
        })
        .collect();
    Odds { by_horse }
}

/// Amount paid for a bet on `horse`, 0 when the bet loses.
pub fn payout(
    stake: f64,
    bet: BetType,
    horse: HorseId,
    odds: &Odds,
    results: &[RaceEntry],
) -> f64 {
    let Some(horse_odds) = odds.get(horse) else {
        return 0.0;
    };
    let Some(position) = results
        .iter()
        .find(|entry| entry.horse_id == horse)
        .map(|entry| entry.position)
    else {
        return 0.0;
    };

    match bet {
        BetType::Win if position == 1 => stake * horse_odds,
        BetType::Place if position <= 2 => stake * horse_odds * PLACE_FACTOR,
        BetType::Show if position <= 3 => stake * horse_odds * SHOW_FACTOR,
        _ => 0.0,
    }
}
