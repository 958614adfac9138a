//! Reward timing policy and the accrual classification it drives

use crate::Runes;
use chrono::{DateTime, Duration, Utc};

/// How long a user must accrue before a session bonus is due (10 minutes)
pub const SESSION_BONUS_THRESHOLD_SECS: i64 = 10 * 60;

/// How often the timer re-checks the checkpoint (60 seconds)
pub const POLL_INTERVAL_SECS: u64 = 60;

/// Checkpoints older than this are discarded (24 hours)
pub const CHECKPOINT_STALENESS_SECS: i64 = 24 * 60 * 60;

/// Runes granted per eligible window
pub const SESSION_BONUS_RUNES: i64 = 10;

/// How long a reward notice stays visible unless dismissed (5 seconds)
pub const NOTICE_DISMISS_SECS: i64 = 5;

/// Fixed timing and amount settings shared by the client timer and the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardPolicy {
    pub threshold: Duration,
    pub poll_interval: std::time::Duration,
    pub staleness_bound: Duration,
    pub reward: Runes,
    pub notice_duration: Duration,
}

impl Default for RewardPolicy {
    fn default() -> Self {
        Self {
            threshold: Duration::seconds(SESSION_BONUS_THRESHOLD_SECS),
            poll_interval: std::time::Duration::from_secs(POLL_INTERVAL_SECS),
            staleness_bound: Duration::seconds(CHECKPOINT_STALENESS_SECS),
            reward: Runes(SESSION_BONUS_RUNES),
            notice_duration: Duration::seconds(NOTICE_DISMISS_SECS),
        }
    }
}

/// Why a checkpoint had to be replaced with "now"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetReason {
    /// Nothing stored yet (or the stored value was unreadable)
    Missing,
    /// Older than the staleness bound
    Stale,
    /// Later than the current time (clock skew)
    InFuture,
}

/// Where a user stands in the current accrual window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccrualState {
    /// Checkpoint must be reset to now; no grant this cycle
    NeedsReset(ResetReason),
    /// Below threshold
    Accruing { remaining: Duration },
    /// At or above threshold
    Eligible { elapsed: Duration },
}

impl RewardPolicy {
    /// Classify a stored checkpoint against the current time
    pub fn classify(&self, checkpoint: Option<DateTime<Utc>>, now: DateTime<Utc>) -> AccrualState {
        let Some(checkpoint) = checkpoint else {
            return AccrualState::NeedsReset(ResetReason::Missing);
        };

        if checkpoint > now {
            return AccrualState::NeedsReset(ResetReason::InFuture);
        }

        let elapsed = now - checkpoint;
        if elapsed > self.staleness_bound {
            return AccrualState::NeedsReset(ResetReason::Stale);
        }

        if elapsed >= self.threshold {
            AccrualState::Eligible { elapsed }
        } else {
            AccrualState::Accruing {
                remaining: self.threshold - elapsed,
            }
        }
    }

    /// Checkpoint that makes the client become eligible exactly when the
    /// server says it will. Clamped so the checkpoint never lies in the future.
    pub fn checkpoint_for_next_eligible(
        &self,
        next_eligible_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> DateTime<Utc> {
        (next_eligible_at - self.threshold).min(now)
    }
}
