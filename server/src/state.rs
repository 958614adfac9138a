//! Application state management

use crate::AppConfig;
use runeward_engine::LedgerGrantor;
use runeward_persistence::Database;

/// State shared by the HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub grantor: LedgerGrantor,
}

impl AppState {
    /// Open (or create) the database under the configured data directory
    pub async fn init(config: &AppConfig) -> Result<Self, String> {
        let db = Database::connect(&config.db_path())
            .await
            .map_err(|e| e.to_string())?;
        Ok(Self::from_database(&db))
    }

    /// Build on an already-open database (tests use an in-memory one)
    pub fn from_database(db: &Database) -> Self {
        Self {
            grantor: LedgerGrantor::new(db.pool().clone()),
        }
    }
}
