//! Shared type aliases

use chrono::{DateTime, Utc};

/// Timestamp type used for every TIMESTAMPTZ column and API response;
/// serializes as ISO 8601 with a `Z` suffix.
pub type DBDateTime = DateTime<Utc>;
