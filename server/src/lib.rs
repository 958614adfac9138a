//! Runeward server - HTTP grant collaborator and the `watch` client

pub mod cli;
pub mod config;
pub mod http;
pub mod watch;
mod state;

pub use config::AppConfig;
pub use http::HttpServerHandle;
pub use state::AppState;
