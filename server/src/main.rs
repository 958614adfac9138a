//! Runeward - entry point

use anyhow::Result;
use clap::Parser;
use runeward_server_lib::cli::{Cli, Command};
use runeward_server_lib::{watch, AppConfig, AppState, HttpServerHandle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "runeward=info,runeward_server_lib=info,runeward_engine=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve { bind } => {
            let config = AppConfig::default().with_overrides(cli.data_dir, bind, None);
            serve(config).await
        }
        Command::Watch { user_id, server } => {
            let config = AppConfig::default().with_overrides(cli.data_dir, None, server);
            watch::run_watch(&config, &user_id).await
        }
        Command::Timer { switch } => {
            let config = AppConfig::default().with_overrides(cli.data_dir, None, None);
            watch::set_timer_enabled(&config, switch.is_on()).await
        }
        Command::Grants {
            user_id,
            limit,
            server,
        } => {
            let config = AppConfig::default().with_overrides(cli.data_dir, None, server);
            let grants = watch::fetch_grants(&config, &user_id, limit).await?;
            if grants.is_empty() {
                println!("{}: no grants yet", user_id);
            }
            for grant in grants {
                println!("{}  +{} runes  ({})", grant.granted_at.to_rfc3339(), grant.amount, grant.grant_id);
            }
            Ok(())
        }
        Command::Balance { user_id, server } => {
            let config = AppConfig::default().with_overrides(cli.data_dir, None, server);
            let balance = watch::fetch_balance(&config, &user_id).await?;
            println!(
                "{}: {} runes ({} grants, last at {})",
                balance.user_id,
                balance.runes,
                balance.total_grants,
                balance
                    .last_reward_time
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "never".to_string())
            );
            Ok(())
        }
    }
}

async fn serve(config: AppConfig) -> Result<()> {
    tracing::info!("Starting Runeward server");

    let state = AppState::init(&config).await.map_err(anyhow::Error::msg)?;
    let server = HttpServerHandle::start(state, config.bind).await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Ctrl-C received, shutting down");
    server.stop().await;
    Ok(())
}
