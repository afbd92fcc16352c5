//! Persistence boundary of the price engines.
//!
//! Stocks and cryptocurrencies live in separate tables, so every call names
//! the market it addresses.

use std::future::Future;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use anketnica_types::{
    Instrument, InstrumentId, InstrumentKind, MarketEvent, PricePoint, StoreError,
};

/// Reads and writes a price engine needs.
pub trait MarketStore: Send + Sync {
    /// Every instrument of a market.
    fn instruments(
        &self,
        kind: InstrumentKind,
    ) -> impl Future<Output = Result<Vec<Instrument>, StoreError>> + Send;

    /// Events of a market whose window contains `now`.
    fn active_events(
        &self,
        kind: InstrumentKind,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<MarketEvent>, StoreError>> + Send;

    /// Store a new current price, and the market cap when one is tracked.
    fn set_instrument_price(
        &self,
        kind: InstrumentKind,
        id: InstrumentId,
        price: Decimal,
        market_cap: Option<Decimal>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Append one point to an instrument's price history.
    fn append_price_history(
        &self,
        kind: InstrumentKind,
        point: &PricePoint,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Delete history recorded before `cutoff`. Returns rows deleted.
    fn prune_history_older_than(
        &self,
        kind: InstrumentKind,
        cutoff: DateTime<Utc>,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;

    /// Delete events that ended before `now`. Returns rows deleted.
    fn prune_expired_events(
        &self,
        kind: InstrumentKind,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;
}
