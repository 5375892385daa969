//! Decoding helpers shared by the repositories.

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use super::{DatabaseError, DatabaseResult};

/// Fixed-width RFC 3339 so lexical order matches chronological order.
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(column: &'static str, value: &str) -> DatabaseResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|error| DatabaseError::CorruptColumn {
            column,
            message: error.to_string(),
        })
}

pub fn parse_uuid(column: &'static str, value: &str) -> DatabaseResult<Uuid> {
    Uuid::parse_str(value).map_err(|error| DatabaseError::CorruptColumn {
        column,
        message: error.to_string(),
    })
}
