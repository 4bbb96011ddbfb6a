//! Helpers shared by the SQLite repositories.

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::errors::StorageError;

/// Maximum number of parameters for SQLite IN (...) queries.
///
/// SQLite caps bound parameters per statement (SQLITE_MAX_VARIABLE_NUMBER,
/// 999 on older builds). 500 leaves room for the other parameters of the query.
pub const SQLITE_MAX_PARAMS_CHUNK: usize = 500;

/// Chunk a slice into smaller slices for batch SQLite queries.
///
/// ```ignore
/// let mut flyers = Vec::new();
/// for chunk in chunk_for_sqlite(&flyer_ids) {
///     flyers.extend(load_with_in_clause(chunk)?);
/// }
/// ```
pub fn chunk_for_sqlite<T>(items: &[T]) -> impl Iterator<Item = &[T]> {
    items.chunks(SQLITE_MAX_PARAMS_CHUNK)
}

/// Timestamps are stored as naive UTC.
pub fn to_db_timestamp(instant: DateTime<Utc>) -> NaiveDateTime {
    instant.naive_utc()
}

pub fn from_db_timestamp(stored: NaiveDateTime) -> DateTime<Utc> {
    stored.and_utc()
}

/// Decimals are stored as TEXT to keep their exact scale.
pub fn parse_decimal(column: &str, raw: &str) -> Result<Decimal, StorageError> {
    Decimal::from_str(raw)
        .map_err(|e| StorageError::Decode(format!("{} value '{}': {}", column, raw, e)))
}

/// Digits of the largest `Decimal` integer part.
const SORT_KEY_INT_DIGITS: usize = 29;
/// Largest `Decimal` scale.
const SORT_KEY_FRACTION_DIGITS: usize = 28;

/// Fixed-width text form of a non-negative decimal whose byte order is its numeric order.
///
/// `12.5` becomes `00000000000000000000000000012.5000000000000000000000000000`.
pub fn decimal_sort_key(value: Decimal) -> String {
    let magnitude = value.abs().normalize().to_string();
    let (integer, fraction) = magnitude.split_once('.').unwrap_or((magnitude.as_str(), ""));
    let sign = if value.is_sign_negative() && !value.is_zero() {
        "-"
    } else {
        ""
    };
    format!(
        "{}{:0>int_width$}.{:0<frac_width$}",
        sign,
        integer,
        fraction,
        int_width = SORT_KEY_INT_DIGITS,
        frac_width = SORT_KEY_FRACTION_DIGITS
    )
}
