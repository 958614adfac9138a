//! High-level API wrappers for Runeward endpoints
//!
//! Thin helpers over the raw HTTP client for callers that only hold a
//! reference to it.

mod bonus;

pub use bonus::*;
