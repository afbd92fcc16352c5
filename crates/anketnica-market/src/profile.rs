//! Per-market pricing parameters.

use serde::Serialize;

use anketnica_core::MarketConfig;
use anketnica_types::InstrumentKind;

/// Decimal places of stock prices.
pub const STOCK_DECIMALS: u32 = 2;

/// Decimal places of crypto prices.
pub const CRYPTO_DECIMALS: u32 = 6;

/// Rare large price jump.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ShockProfile {
    /// Per-tick, per-instrument probability.
    pub chance: f64,
    /// Half-width of the uniform jump.
    pub magnitude: f64,
}

/// How one market's prices move.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceProfile {
    /// Market the profile drives.
    pub kind: InstrumentKind,
    /// Half-width of the uniform noise term.
    pub noise_amplitude: f64,
    /// Shock term, when the market has one.
    pub shock: Option<ShockProfile>,
    /// Decimal places prices are rounded to.
    pub decimals: u32,
    /// Days of price history kept.
    pub history_retention_days: u32,
    /// Whether market cap follows the price.
    pub tracks_market_cap: bool,
}

impl PriceProfile {
    /// Stock market: ±1% noise by default, two decimals, no shocks.
    pub const fn stock(config: &MarketConfig) -> Self {
        Self {
            kind: InstrumentKind::Stock,
            noise_amplitude: config.stock_noise_amplitude,
            shock: None,
            decimals: STOCK_DECIMALS,
            history_retention_days: config.history_retention_days,
            tracks_market_cap: false,
        }
    }

    /// Crypto market: ±2.5% noise and occasional ±10% shocks by default,
    /// six decimals, market cap kept in step.
    pub const fn crypto(config: &MarketConfig) -> Self {
        Self {
            kind: InstrumentKind::Crypto,
            noise_amplitude: config.crypto_noise_amplitude,
            shock: Some(ShockProfile {
                chance: config.crypto_shock_chance,
                magnitude: config.crypto_shock_magnitude,
            }),
            decimals: CRYPTO_DECIMALS,
            history_retention_days: config.history_retention_days,
            tracks_market_cap: true,
        }
    }

    /// Profile of `kind`.
    pub const fn for_kind(kind: InstrumentKind, config: &MarketConfig) -> Self {
        match kind {
            InstrumentKind::Stock => Self::stock(config),
            InstrumentKind::Crypto => Self::crypto(config),
        }
    }

    /// History retention window.
    pub fn history_retention(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.history_retention_days))
    }
}
