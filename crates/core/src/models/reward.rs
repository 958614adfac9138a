//! Reward-related data models for the session bonus endpoint

use crate::{Error, Result, Runes, UserId, SESSION_BONUS_RUNES};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Error string the grant collaborator uses for "not eligible yet"
pub const NOT_ELIGIBLE_MESSAGE: &str = "Time requirement not met yet.";

/// Body of `POST /api/session-bonus`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionBonusRequest {
    pub user_id: UserId,
}

/// Response from `POST /api/session-bonus`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionBonusResponse {
    /// Whether the request was processed
    pub success: bool,
    /// Whether a new grant was issued by this call
    #[serde(default)]
    pub awarded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Runes granted (only when awarded)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
    /// Balance after the grant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_balance: Option<i64>,
    /// Server's view of when the next grant can be issued
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_eligible_at: Option<DateTime<Utc>>,
}

/// Result of a "check and grant" call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantOutcome {
    /// A new grant was issued
    Awarded {
        amount: Runes,
        new_balance: Option<Runes>,
        next_eligible_at: Option<DateTime<Utc>>,
    },
    /// Too early by the server's clock
    NotEligible {
        reason: String,
        next_eligible_at: Option<DateTime<Utc>>,
    },
}

impl SessionBonusResponse {
    /// Interpret the wire response.
    ///
    /// `success:false` is only "not eligible" when it carries the known
    /// message; every other failure is an API error.
    pub fn into_outcome(self) -> Result<GrantOutcome> {
        match (self.success, self.awarded) {
            (true, true) => Ok(GrantOutcome::Awarded {
                amount: Runes(self.amount.unwrap_or(SESSION_BONUS_RUNES)),
                new_balance: self.new_balance.map(Runes),
                next_eligible_at: self.next_eligible_at,
            }),
            (true, false) => Ok(GrantOutcome::NotEligible {
                reason: self
                    .error
                    .unwrap_or_else(|| NOT_ELIGIBLE_MESSAGE.to_string()),
                next_eligible_at: self.next_eligible_at,
            }),
            (false, _) => match self.error {
                Some(reason) if reason == NOT_ELIGIBLE_MESSAGE => Ok(GrantOutcome::NotEligible {
                    reason,
                    next_eligible_at: self.next_eligible_at,
                }),
                Some(reason) => Err(Error::ApiError(reason)),
                None => Err(Error::ApiError("session bonus request failed".to_string())),
            },
        }
    }

    /// Failed request with a message
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            awarded: false,
            error: Some(message.into()),
            amount: None,
            new_balance: None,
            next_eligible_at: None,
        }
    }
}

impl From<&GrantOutcome> for SessionBonusResponse {
    fn from(outcome: &GrantOutcome) -> Self {
        match outcome {
            GrantOutcome::Awarded {
                amount,
                new_balance,
                next_eligible_at,
            } => Self {
                success: true,
                awarded: true,
                error: None,
                amount: Some(amount.as_i64()),
                new_balance: new_balance.map(|b| b.as_i64()),
                next_eligible_at: *next_eligible_at,
            },
            GrantOutcome::NotEligible {
                reason,
                next_eligible_at,
            } => Self {
                success: false,
                awarded: false,
                error: Some(reason.clone()),
                amount: None,
                new_balance: None,
                next_eligible_at: *next_eligible_at,
            },
        }
    }
}

/// One issued grant from the ledger log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardGrant {
    pub grant_id: String,
    pub user_id: String,
    pub amount: i64,
    pub granted_at: DateTime<Utc>,
}

/// Ledger summary for a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunesBalance {
    pub user_id: String,
    pub runes: i64,
    pub total_grants: i64,
    pub last_reward_time: Option<DateTime<Utc>>,
}
