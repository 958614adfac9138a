//! SQLite database management

mod checkpoints;
mod connection;
mod ledger;
mod settings;

pub use checkpoints::*;
pub use connection::Database;
pub use ledger::*;
pub use settings::*;

pub(crate) fn db_err(e: sqlx::Error) -> runeward_core::Error {
    runeward_core::Error::DatabaseError(e.to_string())
}
