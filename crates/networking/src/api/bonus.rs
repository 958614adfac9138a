//! Session bonus API operations

use crate::RunesClient;
use runeward_core::{GrantOutcome, Result, RewardGrant, RunesBalance, UserId};

/// Ask the server to grant the session bonus and interpret the reply
pub async fn claim_session_bonus(client: &RunesClient, user_id: &UserId) -> Result<GrantOutcome> {
    client.claim_session_bonus(user_id).await?.into_outcome()
}

/// Fetch the user's Runes balance
pub async fn fetch_balance(client: &RunesClient, user_id: &UserId) -> Result<RunesBalance> {
    client.get_runes(user_id).await
}

/// Fetch the user's most recent grants
pub async fn fetch_recent_grants(
    client: &RunesClient,
    user_id: &UserId,
    limit: u32,
) -> Result<Vec<RewardGrant>> {
    client.list_grants(user_id, limit).await
}
