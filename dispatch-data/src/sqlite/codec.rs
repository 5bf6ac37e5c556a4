//! Conversions between SQLite columns and domain values.
//!
//! Timestamps are stored as RFC 3339 text in UTC with a fixed microsecond
//! precision so that lexical order equals chronological order.

use std::{error::Error as StdError, str::FromStr};

use chrono::{DateTime, Days, NaiveTime, SecondsFormat, Utc};
use dispatch_core::{StoreError, checked_coord};
use geo::Coord;
use rusqlite::{Row, types::Type};
use serde::de::DeserializeOwned;

/// Render a timestamp for storage.
pub(crate) fn encode_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Start of the current UTC day and of the next one.
pub(crate) fn today_bounds(now: DateTime<Utc>) -> (String, String) {
    let today = now.date_naive();
    let tomorrow = today.checked_add_days(Days::new(1)).unwrap_or(today);
    (
        encode_time(today.and_time(NaiveTime::MIN).and_utc()),
        encode_time(tomorrow.and_time(NaiveTime::MIN).and_utc()),
    )
}

fn conversion_failure<E>(index: usize, kind: Type, err: E) -> rusqlite::Error
where
    E: StdError + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(index, kind, Box::new(err))
}

/// Read a timestamp column.
pub(crate) fn time_column(row: &Row<'_>, index: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(index)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|time| time.with_timezone(&Utc))
        .map_err(|err| conversion_failure(index, Type::Text, err))
}

/// Read a nullable timestamp column.
pub(crate) fn optional_time_column(
    row: &Row<'_>,
    index: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let text: Option<String> = row.get(index)?;
    text.map(|value| {
        DateTime::parse_from_rfc3339(&value)
            .map(|time| time.with_timezone(&Utc))
            .map_err(|err| conversion_failure(index, Type::Text, err))
    })
    .transpose()
}

/// Read a text column through its `FromStr` implementation.
pub(crate) fn parsed_column<T>(row: &Row<'_>, index: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: StdError + Send + Sync + 'static,
{
    let text: String = row.get(index)?;
    text.parse()
        .map_err(|err| conversion_failure(index, Type::Text, err))
}

/// Read a JSON text column.
pub(crate) fn json_column<T>(row: &Row<'_>, index: usize) -> rusqlite::Result<T>
where
    T: DeserializeOwned,
{
    let text: String = row.get(index)?;
    serde_json::from_str(&text).map_err(|err| conversion_failure(index, Type::Text, err))
}

/// Read a validated latitude/longitude column pair.
pub(crate) fn coord_columns(
    row: &Row<'_>,
    latitude: usize,
    longitude: usize,
) -> rusqlite::Result<Coord<f64>> {
    checked_coord(row.get(latitude)?, row.get(longitude)?)
        .map_err(|err| conversion_failure(latitude, Type::Real, err))
}

/// Read a validated, nullable latitude/longitude column pair.
///
/// Both columns must be set for a coordinate to be returned.
pub(crate) fn optional_coord_columns(
    row: &Row<'_>,
    latitude: usize,
    longitude: usize,
) -> rusqlite::Result<Option<Coord<f64>>> {
    let lat: Option<f64> = row.get(latitude)?;
    let lon: Option<f64> = row.get(longitude)?;
    match (lat, lon) {
        (Some(lat), Some(lon)) => checked_coord(lat, lon)
            .map(Some)
            .map_err(|err| conversion_failure(latitude, Type::Real, err)),
        _ => Ok(None),
    }
}

/// Read a non-negative integer column that is wider than `u32`.
pub(crate) fn u64_column(row: &Row<'_>, index: usize) -> rusqlite::Result<u64> {
    let value: i64 = row.get(index)?;
    u64::try_from(value).map_err(|err| conversion_failure(index, Type::Integer, err))
}

/// Store a `u64` as SQLite's signed integer.
pub(crate) fn encode_u64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Translate a SQLite error into the store error surfaced to the engine.
///
/// Decode failures become [`StoreError::InvalidRow`] for `entity`; anything
/// else is reported as a backend failure of `operation`.
pub(crate) fn store_error(
    operation: &'static str,
    entity: &'static str,
    id: i64,
) -> impl FnOnce(rusqlite::Error) -> StoreError {
    move |err| match err {
        rusqlite::Error::FromSqlConversionFailure(column, _, source) => StoreError::InvalidRow {
            entity,
            id,
            reason: format!("column {column}: {source}"),
        },
        rusqlite::Error::IntegralValueOutOfRange(column, value) => StoreError::InvalidRow {
            entity,
            id,
            reason: format!("column {column}: value {value} out of range"),
        },
        other => StoreError::backend(operation, other),
    }
}

/// Shorthand for [`store_error`] when no single row key applies.
pub(crate) fn query_error(
    operation: &'static str,
    entity: &'static str,
) -> impl FnOnce(rusqlite::Error) -> StoreError {
    store_error(operation, entity, 0)
}
