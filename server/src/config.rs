//! Runtime configuration
//!
//! Every value has a default; environment variables and CLI flags override
//! them (clap reads the variables, see `cli`).

use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

pub const DEFAULT_BIND: &str = "127.0.0.1:9877";
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:9877";
pub const DB_FILE_NAME: &str = "runeward.db";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub bind: SocketAddr,
    pub server_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            bind: DEFAULT_BIND
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 9877))),
            server_url: DEFAULT_SERVER_URL.to_string(),
        }
    }
}

impl AppConfig {
    /// Apply whichever overrides were given
    pub fn with_overrides(
        mut self,
        data_dir: Option<PathBuf>,
        bind: Option<SocketAddr>,
        server_url: Option<String>,
    ) -> Self {
        if let Some(dir) = data_dir {
            self.data_dir = dir;
        }
        if let Some(bind) = bind {
            self.bind = bind;
        }
        if let Some(url) = server_url {
            self.server_url = url;
        }
        info!(
            "Config: data_dir={}, bind={}, server_url={}",
            self.data_dir.display(),
            self.bind,
            self.server_url
        );
        self
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE_NAME)
    }
}

fn default_data_dir() -> PathBuf {
    dirs_next::data_local_dir()
        .map(|p| p.join("Runeward"))
        .unwrap_or_else(|| PathBuf::from("."))
}
