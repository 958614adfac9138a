//! Key/value settings table

use super::db_err;
use runeward_core::Result;
use sqlx::SqlitePool;

/// Setting key for the session timer on/off switch
pub const SESSION_TIMER_ENABLED_KEY: &str = "session_timer_enabled";

pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    sqlx::query_scalar::<_, String>("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await
        .map_err(db_err)
}

pub async fn set_setting(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = ?2",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await
    .map_err(db_err)?;
    Ok(())
}

/// Whether the session timer should run; defaults to enabled
pub async fn load_timer_enabled(pool: &SqlitePool) -> bool {
    get_setting(pool, SESSION_TIMER_ENABLED_KEY)
        .await
        .ok()
        .flatten()
        .map(|v| v != "false")
        .unwrap_or(true)
}

pub async fn save_timer_enabled(pool: &SqlitePool, enabled: bool) -> Result<()> {
    set_setting(
        pool,
        SESSION_TIMER_ENABLED_KEY,
        if enabled { "true" } else { "false" },
    )
    .await
}
