//! Data models for Runeward entities

mod checkpoint;
mod reward;

pub use checkpoint::*;
pub use reward::*;
