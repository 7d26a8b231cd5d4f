//! Timestamp utilities
//!
//! Timestamps are stored in SQLite as RFC 3339 UTC strings. Daily stats are
//! keyed by the local calendar date.

use crate::{Error, Result};
use chrono::{DateTime, Local, NaiveDateTime, Utc};

/// Current UTC timestamp.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Format a timestamp for storage.
pub fn to_db(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

/// Parse a timestamp column written by [`to_db`].
///
/// Also accepts SQLite's `CURRENT_TIMESTAMP` format so rows created by schema
/// defaults still read back.
pub fn from_db(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| Error::InvalidInput(format!("unparseable timestamp {raw:?}: {e}")))
}

/// Local calendar date key for daily stats rows, e.g. "2026-08-22".
pub fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}
