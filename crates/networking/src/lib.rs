//! Runeward Networking - HTTP client for a remote grant collaborator

pub mod api;
pub mod http;

pub use http::RunesClient;
