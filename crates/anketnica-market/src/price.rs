//! One price step of one instrument.
//!
//! `change = trend + Σ event impacts + noise (+ shock)`, then
//! `price = max(0.01, price × (1 + change))` rounded to the market's
//! precision.

use rand::Rng;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use anketnica_types::{InstrumentId, MarketEvent};

use crate::error::MarketError;
use crate::profile::PriceProfile;

/// Lowest price any instrument can reach.
pub const MIN_PRICE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Random part of a price step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceMove {
    /// Total fractional change to apply.
    pub change: f64,
    /// Shock term included in `change`, if one fired.
    pub shock: Option<f64>,
}

/// Sum of impacts of the events that move `instrument`.
///
/// Market-wide events apply to every instrument.
pub fn event_impact(events: &[MarketEvent], instrument: InstrumentId) -> f64 {
    events
        .iter()
        .filter(|e| e.applies_to(instrument))
        .map(|e| e.impact_strength)
        .sum()
}

/// Uniform draw in `[-half_width, half_width)`.
fn symmetric(rng: &mut impl Rng, half_width: f64) -> f64 {
    (rng.random::<f64>() - 0.5) * 2.0 * half_width
}

/// Draw the change for one tick.
pub fn draw_move(
    trend: f64,
    impact: f64,
    profile: &PriceProfile,
    rng: &mut impl Rng,
) -> PriceMove {
    let noise = symmetric(rng, profile.noise_amplitude);
    let shock = profile.shock.and_then(|shock| {
        (rng.random::<f64>() < shock.chance).then(|| symmetric(rng, shock.magnitude))
    });
    PriceMove {
        change: trend + impact + noise + shock.unwrap_or(0.0),
        shock,
    }
}

/// Apply `change` to `price` and round to `decimals` places, never going
/// below [`MIN_PRICE`].
pub fn apply_change(
    instrument: InstrumentId,
    price: Decimal,
    change: f64,
    decimals: u32,
) -> Result<Decimal, MarketError> {
    let factor = Decimal::try_from(1.0 + change).map_err(|e| MarketError::InvalidChange {
        instrument,
        change,
        reason: e.to_string(),
    })?;
    let next = price
        .checked_mul(factor)
        .ok_or(MarketError::PriceOverflow { instrument })?
        .round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
    Ok(next.max(MIN_PRICE))
}

/// `price × circulating supply`, `None` without a supply or on overflow.
pub fn market_cap(price: Decimal, circulating_supply: Option<u64>) -> Option<Decimal> {
    circulating_supply.and_then(|supply| price.checked_mul(Decimal::from(supply)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use anketnica_core::MarketConfig;
    use anketnica_types::{InstrumentKind, MarketEventId};

    use super::*;

    fn event(instrument: Option<i64>, impact: f64) -> MarketEvent {
        MarketEvent {
            id: MarketEventId::new(1),
            kind: InstrumentKind::Stock,
            instrument_id: instrument.map(InstrumentId::new),
            impact_strength: impact,
            start_time: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn impact_sums_own_and_global_events() {
        let events = [event(Some(1), 0.02), event(Some(2), 0.5), event(None, -0.01)];
        let impact = event_impact(&events, InstrumentId::new(1));
        assert!((impact - 0.01).abs() < 1e-12);
    }

    #[test]
    fn apply_change_rounds_to_market_precision() {
        let id = InstrumentId::new(1);
        let stock = apply_change(id, Decimal::new(10_000, 2), 0.012_34, 2).unwrap();
        assert_eq!(stock, Decimal::new(10_123, 2));

        let crypto = apply_change(id, Decimal::new(1_234_567, 6), 0.1, 6).unwrap();
        assert_eq!(crypto, Decimal::new(1_358_024, 6));
    }

    #[test]
    fn price_never_drops_below_floor() {
        let id = InstrumentId::new(1);
        assert_eq!(apply_change(id, Decimal::new(5, 2), -0.9, 2).unwrap(), MIN_PRICE);
        assert_eq!(apply_change(id, Decimal::new(100, 0), -3.0, 2).unwrap(), MIN_PRICE);
        assert_eq!(apply_change(id, MIN_PRICE, -0.5, 6).unwrap(), MIN_PRICE);
    }

    #[test]
    fn floor_holds_for_random_moves() {
        let profile = PriceProfile::crypto(&MarketConfig::default());
        let mut rng = SmallRng::seed_from_u64(42);
        let mut price = Decimal::new(2, 2);
        for _ in 0..2_000 {
            let step = draw_move(-0.05, 0.0, &profile, &mut rng);
            price = apply_change(InstrumentId::new(1), price, step.change, 6).unwrap();
            assert!(price >= MIN_PRICE);
        }
    }

    #[test]
    fn non_finite_change_is_rejected() {
        let result = apply_change(InstrumentId::new(3), Decimal::ONE, f64::NAN, 2);
        assert!(matches!(result, Err(MarketError::InvalidChange { .. })));
    }

    #[test]
    fn noise_stays_within_amplitude() {
        let profile = PriceProfile::stock(&MarketConfig::default());
        let mut rng = SmallRng::seed_from_u64(42);
        for _ in 0..1_000 {
            let step = draw_move(0.001, 0.0, &profile, &mut rng);
            assert!(step.shock.is_none());
            assert!((step.change - 0.001).abs() <= 0.01 + 1e-12);
        }
    }

    #[test]
    fn certain_shock_always_fires() {
        let config = MarketConfig {
            crypto_shock_chance: 1.0,
            ..MarketConfig::default()
        };
        let profile = PriceProfile::crypto(&config);
        let mut rng = SmallRng::seed_from_u64(42);
        for _ in 0..100 {
            let step = draw_move(0.0, 0.0, &profile, &mut rng);
            let shock = step.shock.unwrap();
            assert!(shock.abs() <= 0.10 + 1e-12);
            assert!(step.change.abs() <= 0.125 + 1e-12);
        }
    }

    #[test]
    fn market_cap_needs_supply() {
        assert_eq!(
            market_cap(Decimal::new(150, 2), Some(1_000)),
            Some(Decimal::new(1_500, 0))
        );
        assert_eq!(market_cap(Decimal::ONE, None), None);
    }
}
