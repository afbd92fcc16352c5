//! Column encoding shared by the table adapters.
//!
//! Timestamps are written as fixed-width RFC 3339 text with millisecond
//! precision so text comparison in SQL matches time order. Money is
//! written as decimal text. Game enums use their stored labels.

use core::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;

use crate::error::DbError;

/// Encode a timestamp column.
pub fn encode_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Decode a timestamp column.
pub fn decode_time(entity: &'static str, raw: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| DbError::decode(entity, format!("timestamp {raw:?}: {e}")))
}

/// Decode a nullable timestamp column.
pub fn decode_optional_time(
    entity: &'static str,
    raw: Option<&str>,
) -> Result<Option<DateTime<Utc>>, DbError> {
    raw.map(|r| decode_time(entity, r)).transpose()
}

/// Decode a decimal text column.
pub fn decode_decimal(entity: &'static str, raw: &str) -> Result<Decimal, DbError> {
    Decimal::from_str(raw.trim())
        .map_err(|e| DbError::decode(entity, format!("decimal {raw:?}: {e}")))
}

/// Decode a label column into a game enum.
pub fn decode_label<T>(entity: &'static str, raw: &str) -> Result<T, DbError>
where
    T: FromStr,
    T::Err: core::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| DbError::decode(entity, e))
}

/// Narrow an integer column.
pub fn narrow<T>(entity: &'static str, column: &str, raw: i64) -> Result<T, DbError>
where
    T: TryFrom<i64>,
    T::Error: core::fmt::Display,
{
    T::try_from(raw).map_err(|e| DbError::decode(entity, format!("{column} = {raw}: {e}")))
}

/// Widen an unsigned value for an integer column, saturating at `i64::MAX`.
pub fn widen(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
