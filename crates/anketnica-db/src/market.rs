//! Market tables. Stocks and cryptocurrencies each have their own
//! instrument, history and event tables.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

use anketnica_market::MarketStore;
use anketnica_types::{
    Instrument, InstrumentId, InstrumentKind, MarketEvent, MarketEventId, PricePoint, StoreError,
};

use crate::codec::{decode_decimal, decode_time, encode_time, narrow};
use crate::error::DbError;
use crate::sqlite::SqliteStore;

/// Table names of one market.
#[derive(Debug, Clone, Copy)]
struct MarketTables {
    instruments: &'static str,
    history: &'static str,
    history_fk: &'static str,
    events: &'static str,
    events_fk: &'static str,
    /// Supply and market cap columns, `NULL` for stocks.
    supply_columns: &'static str,
}

const fn tables(kind: InstrumentKind) -> MarketTables {
    match kind {
        InstrumentKind::Stock => MarketTables {
            instruments: "stocks",
            history: "stock_price_history",
            history_fk: "stock_id",
            events: "market_events",
            events_fk: "stock_id",
            supply_columns: "NULL AS total_supply, NULL AS circulating_supply, NULL AS market_cap",
        },
        InstrumentKind::Crypto => MarketTables {
            instruments: "crypto_currencies",
            history: "crypto_price_history",
            history_fk: "crypto_id",
            events: "crypto_events",
            events_fk: "crypto_id",
            supply_columns: "total_supply, circulating_supply, market_cap",
        },
    }
}

/// Row from `stocks` or `crypto_currencies`.
#[derive(Debug, FromRow)]
pub(crate) struct InstrumentRow {
    id: i64,
    name: String,
    symbol: String,
    current_price: String,
    base_volatility: f64,
    base_trend: f64,
    total_supply: Option<i64>,
    circulating_supply: Option<i64>,
    market_cap: Option<String>,
}

impl InstrumentRow {
    fn into_instrument(self, kind: InstrumentKind) -> Result<Instrument, DbError> {
        let entity = tables(kind).instruments;
        Ok(Instrument {
            id: InstrumentId::new(self.id),
            kind,
            name: self.name,
            symbol: self.symbol,
            current_price: decode_decimal(entity, &self.current_price)?,
            base_volatility: self.base_volatility,
            base_trend: self.base_trend,
            total_supply: self
                .total_supply
                .map(|v| narrow(entity, "total_supply", v))
                .transpose()?,
            circulating_supply: self
                .circulating_supply
                .map(|v| narrow(entity, "circulating_supply", v))
                .transpose()?,
            market_cap: self
                .market_cap
                .as_deref()
                .map(|v| decode_decimal(entity, v))
                .transpose()?,
        })
    }
}

/// Row from `market_events` or `crypto_events`.
#[derive(Debug, FromRow)]
pub(crate) struct EventRow {
    id: i64,
    instrument_id: Option<i64>,
    impact_strength: f64,
    start_time: String,
    end_time: String,
}

impl EventRow {
    fn into_event(self, kind: InstrumentKind) -> Result<MarketEvent, DbError> {
        let entity = tables(kind).events;
        Ok(MarketEvent {
            id: MarketEventId::new(self.id),
            kind,
            instrument_id: self.instrument_id.map(InstrumentId::new),
            impact_strength: self.impact_strength,
            start_time: decode_time(entity, &self.start_time)?,
            end_time: decode_time(entity, &self.end_time)?,
        })
    }
}

/// Row from a price history table.
#[derive(Debug, FromRow)]
pub(crate) struct PriceRow {
    instrument_id: i64,
    price: String,
    recorded_at: String,
}

impl SqliteStore {
    /// Every instrument of a market, by id.
    pub async fn list_instruments(
        &self,
        kind: InstrumentKind,
    ) -> Result<Vec<Instrument>, DbError> {
        let t = tables(kind);
        let sql = format!(
            "SELECT id, name, symbol, current_price, base_volatility, base_trend, {}
             FROM {}
             ORDER BY id",
            t.supply_columns, t.instruments
        );
        let rows = sqlx::query_as::<_, InstrumentRow>(&sql)
            .fetch_all(self.pool())
            .await?;
        rows.into_iter().map(|r| r.into_instrument(kind)).collect()
    }

    /// Events of a market whose window contains `now`.
    pub async fn list_active_events(
        &self,
        kind: InstrumentKind,
        now: DateTime<Utc>,
    ) -> Result<Vec<MarketEvent>, DbError> {
        let t = tables(kind);
        let sql = format!(
            "SELECT id, {} AS instrument_id, impact_strength, start_time, end_time
             FROM {}
             WHERE start_time <= ?1 AND end_time >= ?1
             ORDER BY id",
            t.events_fk, t.events
        );
        let rows = sqlx::query_as::<_, EventRow>(&sql)
            .bind(encode_time(now))
            .fetch_all(self.pool())
            .await?;
        rows.into_iter().map(|r| r.into_event(kind)).collect()
    }

    /// Write a new current price, and market cap when given.
    pub async fn update_instrument_price(
        &self,
        kind: InstrumentKind,
        id: InstrumentId,
        price: Decimal,
        market_cap: Option<Decimal>,
    ) -> Result<(), DbError> {
        let t = tables(kind);
        let result = match (kind, market_cap) {
            (InstrumentKind::Crypto, Some(cap)) => {
                sqlx::query(
                    "UPDATE crypto_currencies SET current_price = ?, market_cap = ? WHERE id = ?",
                )
                .bind(price.to_string())
                .bind(cap.to_string())
                .bind(id.into_inner())
                .execute(self.pool())
                .await?
            }
            _ => {
                let sql = format!("UPDATE {} SET current_price = ? WHERE id = ?", t.instruments);
                sqlx::query(&sql)
                    .bind(price.to_string())
                    .bind(id.into_inner())
                    .execute(self.pool())
                    .await?
            }
        };
        if result.rows_affected() == 0 {
            return Err(DbError::not_found(t.instruments, id));
        }
        Ok(())
    }

    /// Append a history point.
    pub async fn insert_price_point(
        &self,
        kind: InstrumentKind,
        point: &PricePoint,
    ) -> Result<(), DbError> {
        let t = tables(kind);
        let sql = format!(
            "INSERT INTO {} ({}, price, recorded_at) VALUES (?, ?, ?)",
            t.history, t.history_fk
        );
        sqlx::query(&sql)
            .bind(point.instrument_id.into_inner())
            .bind(point.price.to_string())
            .bind(encode_time(point.recorded_at))
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// History of one instrument, oldest first.
    pub async fn list_price_history(
        &self,
        kind: InstrumentKind,
        id: InstrumentId,
    ) -> Result<Vec<PricePoint>, DbError> {
        let t = tables(kind);
        let sql = format!(
            "SELECT {fk} AS instrument_id, price, recorded_at
             FROM {table}
             WHERE {fk} = ?
             ORDER BY recorded_at, id",
            fk = t.history_fk,
            table = t.history
        );
        let rows = sqlx::query_as::<_, PriceRow>(&sql)
            .bind(id.into_inner())
            .fetch_all(self.pool())
            .await?;
        rows.into_iter()
            .map(|r| -> Result<PricePoint, DbError> {
                Ok(PricePoint {
                    instrument_id: InstrumentId::new(r.instrument_id),
                    price: decode_decimal(t.history, &r.price)?,
                    recorded_at: decode_time(t.history, &r.recorded_at)?,
                })
            })
            .collect()
    }

    /// Delete history recorded before `cutoff`.
    pub async fn delete_history_before(
        &self,
        kind: InstrumentKind,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, DbError> {
        let sql = format!("DELETE FROM {} WHERE recorded_at < ?", tables(kind).history);
        let result = sqlx::query(&sql)
            .bind(encode_time(cutoff))
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete events that ended before `now`.
    pub async fn delete_expired_events(
        &self,
        kind: InstrumentKind,
        now: DateTime<Utc>,
    ) -> Result<u64, DbError> {
        let sql = format!("DELETE FROM {} WHERE end_time < ?", tables(kind).events);
        let result = sqlx::query(&sql)
            .bind(encode_time(now))
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected())
    }
}

impl MarketStore for SqliteStore {
    async fn instruments(&self, kind: InstrumentKind) -> Result<Vec<Instrument>, StoreError> {
        Ok(self.list_instruments(kind).await?)
    }

    async fn active_events(
        &self,
        kind: InstrumentKind,
        now: DateTime<Utc>,
    ) -> Result<Vec<MarketEvent>, StoreError> {
        Ok(self.list_active_events(kind, now).await?)
    }

    async fn set_instrument_price(
        &self,
        kind: InstrumentKind,
        id: InstrumentId,
        price: Decimal,
        market_cap: Option<Decimal>,
    ) -> Result<(), StoreError> {
        Ok(self
            .update_instrument_price(kind, id, price, market_cap)
            .await?)
    }

    async fn append_price_history(
        &self,
        kind: InstrumentKind,
        point: &PricePoint,
    ) -> Result<(), StoreError> {
        Ok(self.insert_price_point(kind, point).await?)
    }

    async fn prune_history_older_than(
        &self,
        kind: InstrumentKind,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        Ok(self.delete_history_before(kind, cutoff).await?)
    }

    async fn prune_expired_events(
        &self,
        kind: InstrumentKind,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        Ok(self.delete_expired_events(kind, now).await?)
    }
}
