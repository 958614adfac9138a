//! Accrual checkpoint model

use crate::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Start of a user's current reward-accrual window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCheckpoint {
    pub user_id: UserId,
    pub checkpoint_time: DateTime<Utc>,
}

/// Parse a stored checkpoint value.
///
/// Accepts RFC 3339 timestamps and bare epoch milliseconds, the two shapes
/// clients have written. Anything else yields `None`.
pub fn parse_checkpoint_value(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    raw.parse::<i64>()
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
}

/// Canonical stored form of a checkpoint
pub fn format_checkpoint_value(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
