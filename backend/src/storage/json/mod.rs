//! # JSON Storage Backend
//!
//! File-based implementation of the storage traits. Each collection is a
//! single JSON document under a well-known name in the data directory.
//!
//! Stored records keep their date fields as strings and tolerate missing
//! keys, so data written by older versions of the app reads back without
//! errors: unparseable timestamps are repaired with the current time,
//! late-added fields fall back to safe defaults, and individual records
//! that no longer deserialize are skipped with a warning instead of
//! failing the whole collection. All of that repair happens in one place,
//! the record-to-entity conversion, rather than ad hoc at every call site.

pub mod connection;
pub mod session_repository;
pub mod settings_repository;
pub mod student_repository;

pub use connection::JsonConnection;

use chrono::{DateTime, Utc};

/// Parse an RFC 3339 timestamp into UTC; None when it does not parse.
pub(crate) fn parse_utc_datetime(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
