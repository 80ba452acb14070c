use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use quotedesk_core::errors::ApplicationError;

pub mod client;
pub mod memory;
pub mod quote;
pub mod settings;

pub use client::SqlClientDirectory;
pub use memory::{InMemoryClientDirectory, InMemoryQuoteStore, InMemorySettingsProvider};
pub use quote::SqlQuoteStore;
pub use settings::SqlSettingsProvider;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for ApplicationError {
    fn from(error: RepositoryError) -> Self {
        ApplicationError::Persistence(error.to_string())
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(error: serde_json::Error) -> Self {
        RepositoryError::Decode(error.to_string())
    }
}

pub(crate) fn encode_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339()
}

/// Accepts RFC 3339 timestamps and bare `YYYY-MM-DD` dates written by older tooling.
pub(crate) fn decode_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| RepositoryError::Decode(format!("{column}: unrecognised date `{value}`")))
}

/// Money columns that fail to parse read as zero.
pub(crate) fn decode_money_lossy(value: Option<&str>) -> Decimal {
    value.and_then(|raw| raw.trim().parse::<Decimal>().ok()).unwrap_or(Decimal::ZERO)
}

pub(crate) fn decode_decimal(column: &str, value: &str) -> Result<Decimal, RepositoryError> {
    value
        .trim()
        .parse::<Decimal>()
        .map_err(|e| RepositoryError::Decode(format!("{column}: {e}")))
}

pub(crate) fn decode_u32(column: &str, value: i64) -> Result<u32, RepositoryError> {
    u32::try_from(value).map_err(|_| RepositoryError::Decode(format!("{column}: {value} out of range")))
}
