//! Runeward Persistence - Checkpoint storage and the Runes ledger

pub mod cache;
pub mod sqlite;

pub use cache::MemoryCheckpointStore;
pub use sqlite::{Database, SqliteCheckpointStore};
