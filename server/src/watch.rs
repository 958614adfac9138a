//! Client side: run the session timer against a Runes server

use crate::AppConfig;
use anyhow::{Context, Result};
use runeward_core::{RewardGrant, RunesBalance, UserId};
use runeward_engine::{
    spawn_session_timer_with, NoticeBoard, RewardNotice, RewardNotifier, SessionRewardTimer, TimerEvent,
};
use runeward_networking::{api, RunesClient};
use runeward_persistence::{sqlite, Database, SqliteCheckpointStore};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Shows notices by logging them, and keeps them on a board until they expire
pub struct LogNotifier {
    board: NoticeBoard,
}

impl LogNotifier {
    pub fn new() -> Self {
        Self {
            board: NoticeBoard::new(),
        }
    }

    pub fn board(&self) -> &NoticeBoard {
        &self.board
    }
}

impl Default for LogNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl RewardNotifier for LogNotifier {
    fn notify(&self, notice: RewardNotice) {
        info!(
            "You earned {} for staying active! (until {})",
            notice.amount,
            notice.expires_at.format("%H:%M:%S")
        );
        self.board.notify(notice);
    }
}

/// Run the timer for `user_id` until Ctrl-C
pub async fn run_watch(config: &AppConfig, user_id: &str) -> Result<()> {
    let user_id = UserId::new(user_id).context("invalid user id")?;

    let db = Database::connect(&config.db_path())
        .await
        .context("opening checkpoint database")?;

    let client = RunesClient::new(&config.server_url).context("building HTTP client")?;
    match client.get_status().await {
        Ok(status) => debug!("Server status: {}", status),
        Err(e) => warn!("Server {} not reachable yet: {}", config.server_url, e),
    }

    let store = SqliteCheckpointStore::new(db.pool().clone());
    match store.load(&user_id).await {
        Ok(Some(checkpoint)) => info!(
            "Resuming accrual window started at {}",
            checkpoint.checkpoint_time.to_rfc3339()
        ),
        Ok(None) => debug!("No stored checkpoint for {}, starting fresh", user_id),
        Err(e) => warn!("Can't read stored checkpoint for {}: {}", user_id, e),
    }
    let notifier = Arc::new(LogNotifier::new());
    let timer = SessionRewardTimer::new(user_id.clone(), store, client, notifier);
    let enabled = sqlite::load_timer_enabled(db.pool()).await;
    if !enabled {
        info!("Session timer is disabled in settings, polling paused");
    }
    let handle = spawn_session_timer_with(timer, enabled);

    let mut events = handle.subscribe();
    info!("Watching session activity for {} (Ctrl-C to stop)", user_id);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Ctrl-C received, stopping session timer");
                break;
            }
            event = events.recv() => match event {
                Ok(TimerEvent::Tick(tick)) => {
                    debug!(
                        "tick: state={} next_in={}s awards={}",
                        tick.state, tick.seconds_until_eligible, tick.total_awards
                    );
                }
                Ok(TimerEvent::Awarded(awarded)) => {
                    info!(
                        "Awarded {} runes (balance: {:?}, this session: {})",
                        awarded.amount, awarded.new_balance, awarded.total_awards
                    );
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Dropped {} timer events", n);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    handle.shutdown().await;
    Ok(())
}

/// Persist whether `watch` should poll
pub async fn set_timer_enabled(config: &AppConfig, enabled: bool) -> Result<()> {
    let db = Database::connect(&config.db_path())
        .await
        .context("opening settings database")?;
    sqlite::save_timer_enabled(db.pool(), enabled)
        .await
        .context("saving timer setting")?;
    info!("Session timer {}", if enabled { "enabled" } else { "disabled" });
    Ok(())
}

/// Fetch a balance from the configured server
pub async fn fetch_balance(config: &AppConfig, user_id: &str) -> Result<RunesBalance> {
    let user_id = UserId::new(user_id).context("invalid user id")?;
    let client = RunesClient::new(&config.server_url).context("building HTTP client")?;
    api::fetch_balance(&client, &user_id)
        .await
        .with_context(|| format!("fetching balance for {}", user_id))
}

/// Fetch the most recent grants from the configured server
pub async fn fetch_grants(config: &AppConfig, user_id: &str, limit: u32) -> Result<Vec<RewardGrant>> {
    let user_id = UserId::new(user_id).context("invalid user id")?;
    let client = RunesClient::new(&config.server_url).context("building HTTP client")?;
    api::fetch_recent_grants(&client, &user_id, limit)
        .await
        .with_context(|| format!("fetching grants for {}", user_id))
}
