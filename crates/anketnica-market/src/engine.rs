//! Periodic price engine.
//!
//! Each tick walks every instrument of one market, draws its change, and
//! writes the new price and a history point only when the rounded price
//! actually moved. Old history and expired events are pruned at the end of
//! the tick.

use chrono::{DateTime, SubsecRound, Utc};
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};

use anketnica_core::PeriodicJob;
use anketnica_types::{InstrumentKind, PricePoint};

use crate::error::MarketError;
use crate::price;
use crate::profile::PriceProfile;
use crate::store::MarketStore;

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Instruments examined.
    pub instruments: u32,
    /// Instruments whose price changed.
    pub changed: u32,
    /// History points written.
    pub history_appended: u32,
    /// History points pruned.
    pub history_pruned: u64,
    /// Expired events pruned.
    pub events_pruned: u64,
    /// Shocks that fired.
    pub shocks: u32,
}

/// Drives the prices of one market.
#[derive(Debug)]
pub struct PriceEngine<S, R> {
    store: S,
    profile: PriceProfile,
    rng: R,
}

impl<S: MarketStore, R: Rng + Send> PriceEngine<S, R> {
    /// Create an engine for the market described by `profile`.
    pub const fn new(store: S, profile: PriceProfile, rng: R) -> Self {
        Self {
            store,
            profile,
            rng,
        }
    }

    /// The market this engine drives.
    pub const fn kind(&self) -> InstrumentKind {
        self.profile.kind
    }

    /// The underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Run one tick at `now`.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> Result<TickReport, MarketError> {
        let kind = self.profile.kind;
        let recorded_at = now.trunc_subsecs(3);
        let instruments = self.store.instruments(kind).await?;
        let events: Vec<_> = self
            .store
            .active_events(kind, now)
            .await?
            .into_iter()
            .filter(|e| e.is_active(now))
            .collect();

        let mut report = TickReport::default();
        for instrument in &instruments {
            report.instruments = report.instruments.saturating_add(1);

            let impact = price::event_impact(&events, instrument.id);
            let step =
                price::draw_move(instrument.base_trend, impact, &self.profile, &mut self.rng);
            if let Some(shock) = step.shock {
                report.shocks = report.shocks.saturating_add(1);
                info!(
                    market = %kind,
                    symbol = %instrument.symbol,
                    shock,
                    "Market shock"
                );
            }

            let next = price::apply_change(
                instrument.id,
                instrument.current_price,
                step.change,
                self.profile.decimals,
            )?;
            if next == instrument.current_price {
                debug!(
                    market = %kind,
                    symbol = %instrument.symbol,
                    price = %next,
                    "Price unchanged"
                );
                continue;
            }

            let market_cap = if self.profile.tracks_market_cap {
                price::market_cap(next, instrument.circulating_supply)
            } else {
                None
            };
            self.store
                .set_instrument_price(kind, instrument.id, next, market_cap)
                .await?;
            self.store
                .append_price_history(
                    kind,
                    &PricePoint {
                        instrument_id: instrument.id,
                        price: next,
                        recorded_at,
                    },
                )
                .await?;
            report.changed = report.changed.saturating_add(1);
            report.history_appended = report.history_appended.saturating_add(1);

            debug!(
                market = %kind,
                symbol = %instrument.symbol,
                from = %instrument.current_price,
                to = %next,
                change = step.change,
                "Price moved"
            );
        }

        let cutoff = now
            .checked_sub_signed(self.profile.history_retention())
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        report.history_pruned = self.store.prune_history_older_than(kind, cutoff).await?;
        report.events_pruned = self.store.prune_expired_events(kind, now).await?;

        info!(
            market = %kind,
            instruments = report.instruments,
            changed = report.changed,
            history_appended = report.history_appended,
            history_pruned = report.history_pruned,
            events_pruned = report.events_pruned,
            "Price tick complete"
        );

        Ok(report)
    }
}

impl<S: MarketStore, R: Rng + Send> PeriodicJob for PriceEngine<S, R> {
    type Report = TickReport;
    type Error = MarketError;

    fn name(&self) -> &str {
        match self.profile.kind {
            InstrumentKind::Stock => "stock-prices",
            InstrumentKind::Crypto => "crypto-prices",
        }
    }

    async fn run_once(&mut self, now: DateTime<Utc>) -> Result<TickReport, MarketError> {
        self.tick(now).await
    }
}
