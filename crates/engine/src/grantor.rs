//! Ledger-backed grant collaborator
//!
//! Server side of the session bonus: decides eligibility from its own record
//! of the last grant, never from the client's checkpoint.

use runeward_core::{
    Clock, GrantCollaborator, GrantOutcome, Result, RewardGrant, RewardPolicy, RunesBalance,
    SystemClock, UserId,
};
use runeward_persistence::sqlite;
use sqlx::SqlitePool;
use tracing::{debug, info};

/// Grants session bonuses against the SQLite Runes ledger
#[derive(Clone)]
pub struct LedgerGrantor<C = SystemClock> {
    pool: SqlitePool,
    clock: C,
    policy: RewardPolicy,
}

impl LedgerGrantor {
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_clock(pool, SystemClock)
    }
}

impl<C: Clock> LedgerGrantor<C> {
    pub fn with_clock(pool: SqlitePool, clock: C) -> Self {
        Self {
            pool,
            clock,
            policy: RewardPolicy::default(),
        }
    }

    pub fn policy(&self) -> &RewardPolicy {
        &self.policy
    }

    pub async fn balance(&self, user_id: &UserId) -> Result<Option<RunesBalance>> {
        sqlite::get_balance(&self.pool, user_id.as_str()).await
    }

    pub async fn recent_grants(&self, user_id: &UserId, limit: i64) -> Result<Vec<RewardGrant>> {
        sqlite::list_grants(&self.pool, user_id.as_str(), limit).await
    }
}

impl<C: Clock> GrantCollaborator for LedgerGrantor<C> {
    async fn check_and_award(&self, user_id: &UserId) -> Result<GrantOutcome> {
        let now = self.clock.now();
        let outcome = sqlite::award_session_bonus(
            &self.pool,
            user_id.as_str(),
            now,
            self.policy.threshold,
            self.policy.reward,
        )
        .await?;

        match &outcome {
            GrantOutcome::Awarded { amount, new_balance, .. } => {
                info!(
                    "Session bonus granted to {}: {} (balance: {:?})",
                    user_id, amount, new_balance
                );
            }
            GrantOutcome::NotEligible { next_eligible_at, .. } => {
                debug!(
                    "Session bonus refused for {}, next eligible at {:?}",
                    user_id, next_eligible_at
                );
            }
        }

        Ok(outcome)
    }
}
