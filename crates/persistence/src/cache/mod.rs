//! In-memory checkpoint storage
//!
//! Holds raw checkpoint strings per user, the same shape a browser profile
//! keeps in local storage. Lives as long as the process.

use chrono::{DateTime, Utc};
use runeward_core::{
    format_checkpoint_value, parse_checkpoint_value, CheckpointStore, Result, UserId,
};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::warn;

/// Thread-safe per-user checkpoint map
#[derive(Default)]
pub struct MemoryCheckpointStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw value as-is (e.g. one written by another client)
    pub fn insert_raw(&self, user_id: &UserId, raw: &str) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(user_id.checkpoint_key(), raw.to_string());
        }
    }

    /// Raw stored value, if any
    pub fn get_raw(&self, user_id: &UserId) -> Option<String> {
        let entries = self.entries.read().ok()?;
        entries.get(&user_id.checkpoint_key()).cloned()
    }

    /// Parsed checkpoint, if present and readable
    pub fn get(&self, user_id: &UserId) -> Option<DateTime<Utc>> {
        let raw = self.get_raw(user_id)?;
        let parsed = parse_checkpoint_value(&raw);
        if parsed.is_none() {
            warn!("Discarding unreadable checkpoint for {}: {:?}", user_id, raw);
        }
        parsed
    }

    pub fn set(&self, user_id: &UserId, at: DateTime<Utc>) {
        self.insert_raw(user_id, &format_checkpoint_value(at));
    }

    /// Clear all entries
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    async fn read(&self, user_id: &UserId) -> Result<Option<DateTime<Utc>>> {
        Ok(self.get(user_id))
    }

    async fn write(&self, user_id: &UserId, at: DateTime<Utc>) -> Result<()> {
        self.set(user_id, at);
        Ok(())
    }
}
