//! Background poll loop for a session reward timer
//!
//! One task per user. Polls on a fixed interval, can be paused without
//! stopping the task, and is torn down through a cancellation token. A poll
//! that is in flight when the token fires is dropped before it can touch the
//! checkpoint or the notice surface.

use super::{PollOutcome, SessionRewardTimer};
use crate::notice::RewardNotifier;
use runeward_core::{CheckpointStore, Clock, GrantCollaborator};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const EVENT_CAPACITY: usize = 64;

// ─── Events ──────────────────────────────────────────────────────────

/// Emitted after every poll
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerTickEvent {
    pub user_id: String,
    pub enabled: bool,
    pub state: &'static str,
    pub seconds_until_eligible: i64,
    pub total_awards: u32,
}

/// Emitted when a grant lands
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerAwardedEvent {
    pub user_id: String,
    pub amount: i64,
    pub new_balance: Option<i64>,
    pub total_awards: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TimerEvent {
    Tick(TimerTickEvent),
    Awarded(TimerAwardedEvent),
}

// ─── Handle ──────────────────────────────────────────────────────────

/// Handle to control a running session timer
#[derive(Clone)]
pub struct SessionTimerHandle {
    cancel: CancellationToken,
    enabled_tx: Arc<watch::Sender<bool>>,
    events: broadcast::Sender<TimerEvent>,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl SessionTimerHandle {
    pub fn is_enabled(&self) -> bool {
        *self.enabled_tx.borrow()
    }

    /// Resume polling
    pub fn enable(&self) {
        self.enabled_tx.send_replace(true);
        info!("Session timer enabled");
    }

    /// Pause polling (task stays alive)
    pub fn disable(&self) {
        self.enabled_tx.send_replace(false);
        info!("Session timer disabled");
    }

    /// Subscribe to tick and award events
    pub fn subscribe(&self) -> broadcast::Receiver<TimerEvent> {
        self.events.subscribe()
    }

    /// Signal the task to stop
    pub fn stop(&self) {
        self.cancel.cancel();
        info!("Session timer stopped");
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stop and wait for the task to exit
    pub async fn shutdown(&self) {
        self.stop();
        if let Some(task) = self.task.lock().await.take() {
            let _ = task.await;
        }
    }
}

// ─── Spawn ───────────────────────────────────────────────────────────

/// Spawn the poll loop for `timer`. The first poll runs immediately.
pub fn spawn_session_timer<S, G, N, C>(timer: SessionRewardTimer<S, G, N, C>) -> SessionTimerHandle
where
    S: CheckpointStore + 'static,
    G: GrantCollaborator + 'static,
    N: RewardNotifier + 'static,
    C: Clock + 'static,
{
    spawn_session_timer_with(timer, true)
}

/// Same as [`spawn_session_timer`], starting paused when `enabled` is false
pub fn spawn_session_timer_with<S, G, N, C>(
    timer: SessionRewardTimer<S, G, N, C>,
    enabled: bool,
) -> SessionTimerHandle
where
    S: CheckpointStore + 'static,
    G: GrantCollaborator + 'static,
    N: RewardNotifier + 'static,
    C: Clock + 'static,
{
    let cancel = CancellationToken::new();
    let (enabled_tx, enabled_rx) = watch::channel(enabled);
    let (events, _) = broadcast::channel(EVENT_CAPACITY);

    let task = tokio::spawn(timer_loop(timer, cancel.clone(), enabled_rx, events.clone()));

    SessionTimerHandle {
        cancel,
        enabled_tx: Arc::new(enabled_tx),
        events,
        task: Arc::new(Mutex::new(Some(task))),
    }
}

// ─── Loop ────────────────────────────────────────────────────────────

async fn timer_loop<S, G, N, C>(
    timer: SessionRewardTimer<S, G, N, C>,
    cancel: CancellationToken,
    enabled_rx: watch::Receiver<bool>,
    events: broadcast::Sender<TimerEvent>,
) where
    S: CheckpointStore,
    G: GrantCollaborator,
    N: RewardNotifier,
    C: Clock,
{
    let user_id = timer.user_id().to_string();
    info!("Session timer started for {}", user_id);

    let mut interval = tokio::time::interval(timer.policy().poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut total_awards: u32 = 0;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Session timer for {} cancelled, exiting", user_id);
                return;
            }
            _ = interval.tick() => {}
        }

        if !*enabled_rx.borrow() {
            let _ = events.send(TimerEvent::Tick(TimerTickEvent {
                user_id: user_id.clone(),
                enabled: false,
                state: "disabled",
                seconds_until_eligible: 0,
                total_awards,
            }));
            continue;
        }

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Session timer for {} cancelled mid-poll, dropping it", user_id);
                return;
            }
            outcome = timer.poll_once() => outcome,
        };

        if let PollOutcome::Awarded { amount, new_balance } = &outcome {
            total_awards += 1;
            let _ = events.send(TimerEvent::Awarded(TimerAwardedEvent {
                user_id: user_id.clone(),
                amount: amount.as_i64(),
                new_balance: new_balance.map(|b| b.as_i64()),
                total_awards,
            }));
        }

        let (state, seconds_until_eligible) = match &outcome {
            PollOutcome::CheckpointReset(_) => ("reset", timer.policy().threshold.num_seconds()),
            PollOutcome::Accruing { remaining } => ("accruing", remaining.num_seconds()),
            PollOutcome::Awarded { .. } => ("awarded", timer.policy().threshold.num_seconds()),
            PollOutcome::NotEligible { .. } => ("eligible", 0),
            PollOutcome::GrantFailed => ("eligible", 0),
            PollOutcome::StoreUnavailable => ("unavailable", 0),
        };

        let _ = events.send(TimerEvent::Tick(TimerTickEvent {
            user_id: user_id.clone(),
            enabled: true,
            state,
            seconds_until_eligible,
            total_awards,
        }));
    }
}
