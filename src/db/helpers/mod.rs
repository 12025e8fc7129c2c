use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::ErrorCode;

/// Storage and export format for measurement and task-log timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn format_timestamp(value: &NaiveDateTime) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(value: &str, field: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .with_context(|| format!("failed to parse {field} '{value}'"))
}

pub fn parse_optional_timestamp(
    value: Option<String>,
    field: &str,
) -> Result<Option<NaiveDateTime>> {
    match value {
        Some(raw) => parse_timestamp(&raw, field).map(Some),
        None => Ok(None),
    }
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

/// True when the error chain bottoms out in a SQLite constraint failure
/// (foreign key, NOT NULL, CHECK).
pub fn is_constraint_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<rusqlite::Error>(),
            Some(rusqlite::Error::SqliteFailure(inner, _))
                if inner.code == ErrorCode::ConstraintViolation
        )
    })
}
