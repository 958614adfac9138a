//! Session activity reward timer
//!
//! Tracks wall-clock time since a stored checkpoint. Once the threshold is
//! crossed it asks the grant collaborator for the session bonus, shows a
//! notice on success and starts a fresh accrual window.
//!
//! Two logical states per user, repeated for the lifetime of the session:
//! - ACCRUING: elapsed < threshold, nothing to do
//! - ELIGIBLE: one grant attempt per poll until the collaborator awards

mod runner;

pub use runner::{
    spawn_session_timer, spawn_session_timer_with, SessionTimerHandle, TimerAwardedEvent, TimerEvent,
    TimerTickEvent,
};

use crate::notice::{RewardNotice, RewardNotifier};
use chrono::{DateTime, Duration, Utc};
use runeward_core::{
    AccrualState, CheckpointStore, Clock, GrantCollaborator, GrantOutcome, ResetReason,
    RewardPolicy, Runes, SystemClock, UserId,
};
use tracing::{debug, info, warn};

/// What a single poll did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Checkpoint was missing, stale or in the future and is now "now"
    CheckpointReset(ResetReason),
    /// Still below threshold
    Accruing { remaining: Duration },
    /// Collaborator issued a grant; checkpoint restarted
    Awarded {
        amount: Runes,
        new_balance: Option<Runes>,
    },
    /// Collaborator says too early. `resynced_to` is set when the checkpoint
    /// was moved to match the collaborator's next eligible time.
    NotEligible { resynced_to: Option<DateTime<Utc>> },
    /// Transport or server failure; retried next poll
    GrantFailed,
    /// Checkpoint could not be read or written
    StoreUnavailable,
}

/// Per-user reward timer
pub struct SessionRewardTimer<S, G, N, C = SystemClock> {
    user_id: UserId,
    store: S,
    grantor: G,
    notifier: N,
    clock: C,
    policy: RewardPolicy,
}

impl<S, G, N> SessionRewardTimer<S, G, N>
where
    S: CheckpointStore,
    G: GrantCollaborator,
    N: RewardNotifier,
{
    pub fn new(user_id: UserId, store: S, grantor: G, notifier: N) -> Self {
        Self {
            user_id,
            store,
            grantor,
            notifier,
            clock: SystemClock,
            policy: RewardPolicy::default(),
        }
    }
}

impl<S, G, N, C> SessionRewardTimer<S, G, N, C>
where
    S: CheckpointStore,
    G: GrantCollaborator,
    N: RewardNotifier,
    C: Clock,
{
    /// Swap the time source
    pub fn with_clock<C2: Clock>(self, clock: C2) -> SessionRewardTimer<S, G, N, C2> {
        SessionRewardTimer {
            user_id: self.user_id,
            store: self.store,
            grantor: self.grantor,
            notifier: self.notifier,
            clock,
            policy: self.policy,
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn policy(&self) -> &RewardPolicy {
        &self.policy
    }

    /// Run one poll cycle
    pub async fn poll_once(&self) -> PollOutcome {
        let now = self.clock.now();

        let checkpoint = match self.store.read(&self.user_id).await {
            Ok(c) => c,
            Err(e) => {
                warn!("Session timer: can't read checkpoint for {}: {}", self.user_id, e);
                return PollOutcome::StoreUnavailable;
            }
        };

        match self.policy.classify(checkpoint, now) {
            AccrualState::NeedsReset(reason) => {
                debug!("Session timer: resetting checkpoint for {} ({:?})", self.user_id, reason);
                if let Err(e) = self.store.write(&self.user_id, now).await {
                    warn!("Session timer: can't write checkpoint for {}: {}", self.user_id, e);
                    return PollOutcome::StoreUnavailable;
                }
                PollOutcome::CheckpointReset(reason)
            }
            AccrualState::Accruing { remaining } => {
                debug!(
                    "Session timer: {} accruing, {}s remaining",
                    self.user_id,
                    remaining.num_seconds()
                );
                PollOutcome::Accruing { remaining }
            }
            AccrualState::Eligible { elapsed } => {
                debug!(
                    "Session timer: {} eligible after {}s, requesting grant",
                    self.user_id,
                    elapsed.num_seconds()
                );
                self.request_grant(now).await
            }
        }
    }

    async fn request_grant(&self, polled_at: DateTime<Utc>) -> PollOutcome {
        match self.grantor.check_and_award(&self.user_id).await {
            Ok(GrantOutcome::Awarded {
                amount,
                new_balance,
                ..
            }) => {
                let now = self.clock.now();
                info!("Session timer: {} earned {}", self.user_id, amount);

                // Write is the last await: a cancelled poll never shows a
                // notice without the checkpoint reset.
                if let Err(e) = self.store.write(&self.user_id, now).await {
                    warn!(
                        "Session timer: grant succeeded but checkpoint reset failed for {}: {}",
                        self.user_id, e
                    );
                }

                self.notifier
                    .notify(RewardNotice::new(amount, now, self.policy.notice_duration));

                PollOutcome::Awarded {
                    amount,
                    new_balance,
                }
            }
            Ok(GrantOutcome::NotEligible {
                reason,
                next_eligible_at,
            }) => {
                let Some(next) = next_eligible_at else {
                    debug!("Session timer: {} not eligible yet ({})", self.user_id, reason);
                    return PollOutcome::NotEligible { resynced_to: None };
                };

                let resynced = self.policy.checkpoint_for_next_eligible(next, polled_at);
                debug!(
                    "Session timer: {} not eligible until {}, resyncing checkpoint to {}",
                    self.user_id, next, resynced
                );
                match self.store.write(&self.user_id, resynced).await {
                    Ok(()) => PollOutcome::NotEligible {
                        resynced_to: Some(resynced),
                    },
                    Err(e) => {
                        warn!("Session timer: can't resync checkpoint for {}: {}", self.user_id, e);
                        PollOutcome::NotEligible { resynced_to: None }
                    }
                }
            }
            Err(e) => {
                warn!("Session timer: grant request failed for {}: {}", self.user_id, e);
                PollOutcome::GrantFailed
            }
        }
    }
}

#[cfg(test)]
mod tests;
