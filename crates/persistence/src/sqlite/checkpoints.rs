//! Session checkpoint queries

use super::db_err;
use chrono::{DateTime, Utc};
use runeward_core::{
    format_checkpoint_value, parse_checkpoint_value, CheckpointStore, Result, SessionCheckpoint,
    UserId,
};
use sqlx::SqlitePool;
use tracing::warn;

/// Raw stored checkpoint string for a user
pub async fn get_checkpoint_raw(pool: &SqlitePool, user_id: &str) -> Result<Option<String>> {
    sqlx::query_scalar::<_, String>("SELECT value FROM session_checkpoints WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(db_err)
}

/// Insert or replace a user's checkpoint string
pub async fn set_checkpoint_raw(pool: &SqlitePool, user_id: &str, value: &str) -> Result<()> {
    sqlx::query(
        r#"INSERT INTO session_checkpoints (user_id, value, updated_at)
           VALUES (?, ?, CURRENT_TIMESTAMP)
           ON CONFLICT(user_id) DO UPDATE SET
             value = excluded.value,
             updated_at = excluded.updated_at"#,
    )
    .bind(user_id)
    .bind(value)
    .execute(pool)
    .await
    .map_err(db_err)?;
    Ok(())
}

/// Checkpoint store backed by the `session_checkpoints` table
#[derive(Clone)]
pub struct SqliteCheckpointStore {
    pool: SqlitePool,
}

impl SqliteCheckpointStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Stored checkpoint for a user, `None` if absent or unreadable
    pub async fn load(&self, user_id: &UserId) -> Result<Option<SessionCheckpoint>> {
        let Some(raw) = get_checkpoint_raw(&self.pool, user_id.as_str()).await? else {
            return Ok(None);
        };

        let Some(checkpoint_time) = parse_checkpoint_value(&raw) else {
            warn!("Discarding unreadable checkpoint for {}: {:?}", user_id, raw);
            return Ok(None);
        };

        Ok(Some(SessionCheckpoint {
            user_id: user_id.clone(),
            checkpoint_time,
        }))
    }
}

impl CheckpointStore for SqliteCheckpointStore {
    async fn read(&self, user_id: &UserId) -> Result<Option<DateTime<Utc>>> {
        Ok(self.load(user_id).await?.map(|c| c.checkpoint_time))
    }

    async fn write(&self, user_id: &UserId, at: DateTime<Utc>) -> Result<()> {
        set_checkpoint_raw(&self.pool, user_id.as_str(), &format_checkpoint_value(at)).await
    }
}
