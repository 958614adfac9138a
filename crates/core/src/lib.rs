//! Runeward Core - Shared data models, types, policy and errors

pub mod clock;
pub mod errors;
pub mod models;
pub mod policy;
pub mod seams;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use errors::{Error, Result};
pub use models::*;
pub use policy::*;
pub use seams::{CheckpointStore, GrantCollaborator};
pub use types::*;
