//! Column decoding shared by the SQL repositories. Timestamps are RFC 3339
//! text, dates are `YYYY-MM-DD`, money is decimal text.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::RepositoryError;

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

pub(crate) fn text(row: &SqliteRow, column: &str) -> Result<String, RepositoryError> {
    row.try_get(column).map_err(|e| RepositoryError::Decode(e.to_string()))
}

pub(crate) fn opt_text(row: &SqliteRow, column: &str) -> Result<Option<String>, RepositoryError> {
    row.try_get(column).map_err(|e| RepositoryError::Decode(e.to_string()))
}

pub(crate) fn integer(row: &SqliteRow, column: &str) -> Result<i64, RepositoryError> {
    row.try_get(column).map_err(|e| RepositoryError::Decode(e.to_string()))
}

pub(crate) fn opt_integer(row: &SqliteRow, column: &str) -> Result<Option<i64>, RepositoryError> {
    row.try_get(column).map_err(|e| RepositoryError::Decode(e.to_string()))
}

pub(crate) fn flag(row: &SqliteRow, column: &str) -> Result<bool, RepositoryError> {
    integer(row, column).map(|value| value != 0)
}

pub(crate) fn timestamp(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>, RepositoryError> {
    parse_timestamp(column, &text(row, column)?)
}

pub(crate) fn opt_timestamp(
    row: &SqliteRow,
    column: &str,
) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    opt_text(row, column)?.map(|raw| parse_timestamp(column, &raw)).transpose()
}

pub(crate) fn opt_date(row: &SqliteRow, column: &str) -> Result<Option<NaiveDate>, RepositoryError> {
    opt_text(row, column)?
        .map(|raw| {
            NaiveDate::parse_from_str(&raw, DATE_FORMAT)
                .map_err(|e| RepositoryError::Decode(format!("{column}: {e}")))
        })
        .transpose()
}

pub(crate) fn decimal(row: &SqliteRow, column: &str) -> Result<Decimal, RepositoryError> {
    parse_decimal(column, &text(row, column)?)
}

pub(crate) fn opt_decimal(row: &SqliteRow, column: &str) -> Result<Option<Decimal>, RepositoryError> {
    opt_text(row, column)?.map(|raw| parse_decimal(column, &raw)).transpose()
}

pub(crate) fn parsed<T>(row: &SqliteRow, column: &str) -> Result<T, RepositoryError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = text(row, column)?;
    raw.parse::<T>().map_err(|e| RepositoryError::Decode(format!("{column}: {e}")))
}

pub(crate) fn parse_decimal(column: &str, raw: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(raw.trim()).map_err(|e| RepositoryError::Decode(format!("{column}: {e}")))
}

fn parse_timestamp(column: &str, raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("{column}: {e}")))
}

pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}
