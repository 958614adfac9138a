//! Command-line interface

use clap::{Parser, Subcommand, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "runeward", version, about = "Session activity rewards for Runes")]
pub struct Cli {
    /// Directory holding the SQLite database
    #[arg(long, global = true, env = "RUNEWARD_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the session bonus API backed by the local ledger
    Serve {
        #[arg(long, env = "RUNEWARD_BIND")]
        bind: Option<SocketAddr>,
    },
    /// Run the session reward timer for a user against a server
    Watch {
        user_id: String,
        #[arg(long, env = "RUNEWARD_SERVER_URL")]
        server: Option<String>,
    },
    /// Turn the session timer on or off for `watch`
    Timer {
        #[arg(value_enum)]
        switch: TimerSwitch,
    },
    /// List a user's most recent session bonus grants from a server
    Grants {
        user_id: String,
        #[arg(long, default_value_t = 10)]
        limit: u32,
        #[arg(long, env = "RUNEWARD_SERVER_URL")]
        server: Option<String>,
    },
    /// Print a user's Runes balance from a server
    Balance {
        user_id: String,
        #[arg(long, env = "RUNEWARD_SERVER_URL")]
        server: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TimerSwitch {
    On,
    Off,
}

impl TimerSwitch {
    pub fn is_on(self) -> bool {
        self == TimerSwitch::On
    }
}
