//! Runes ledger: balances and session bonus grants

use super::db_err;
use chrono::{DateTime, Duration, Utc};
use runeward_core::{
    GrantOutcome, Result, RewardGrant, Runes, RunesBalance, NOT_ELIGIBLE_MESSAGE,
};
use sqlx::SqlitePool;
use tracing::warn;

#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    user_id: String,
    runes: i64,
    total_grants: i64,
    last_reward_time: Option<i64>,
}

impl From<AccountRow> for RunesBalance {
    fn from(row: AccountRow) -> Self {
        RunesBalance {
            user_id: row.user_id,
            runes: row.runes,
            total_grants: row.total_grants,
            last_reward_time: row.last_reward_time.and_then(DateTime::<Utc>::from_timestamp_millis),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct GrantRow {
    grant_id: String,
    user_id: String,
    amount: i64,
    granted_at: i64,
}

impl From<GrantRow> for RewardGrant {
    fn from(row: GrantRow) -> Self {
        let granted_at = DateTime::<Utc>::from_timestamp_millis(row.granted_at).unwrap_or_else(|| {
            warn!(
                "Grant {} has out-of-range granted_at {}, reporting epoch",
                row.grant_id, row.granted_at
            );
            DateTime::<Utc>::default()
        });

        RewardGrant {
            grant_id: row.grant_id,
            user_id: row.user_id,
            amount: row.amount,
            granted_at,
        }
    }
}

/// Create an empty account if the user has none
pub async fn ensure_account(pool: &SqlitePool, user_id: &str) -> Result<()> {
    sqlx::query("INSERT INTO accounts (user_id) VALUES (?) ON CONFLICT(user_id) DO NOTHING")
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(db_err)?;
    Ok(())
}

/// Award the session bonus if the user's last grant is at least `window` old.
///
/// The eligibility check and the balance increment are a single conditional
/// UPDATE inside one transaction, so concurrent callers for the same user
/// cannot both be awarded within a window.
pub async fn award_session_bonus(
    pool: &SqlitePool,
    user_id: &str,
    now: DateTime<Utc>,
    window: Duration,
    amount: Runes,
) -> Result<GrantOutcome> {
    let now_ms = now.timestamp_millis();
    let cutoff_ms = (now - window).timestamp_millis();

    let mut tx = pool.begin().await.map_err(db_err)?;

    sqlx::query("INSERT INTO accounts (user_id) VALUES (?) ON CONFLICT(user_id) DO NOTHING")
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

    let updated = sqlx::query(
        r#"UPDATE accounts
           SET runes = runes + ?,
               last_reward_time = ?,
               total_grants = total_grants + 1
           WHERE user_id = ?
             AND (last_reward_time IS NULL OR last_reward_time <= ?)"#,
    )
    .bind(amount.as_i64())
    .bind(now_ms)
    .bind(user_id)
    .bind(cutoff_ms)
    .execute(&mut *tx)
    .await
    .map_err(db_err)?
    .rows_affected();

    if updated == 0 {
        let last: Option<i64> =
            sqlx::query_scalar("SELECT last_reward_time FROM accounts WHERE user_id = ?")
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;

        return Ok(GrantOutcome::NotEligible {
            reason: NOT_ELIGIBLE_MESSAGE.to_string(),
            next_eligible_at: last
                .and_then(DateTime::<Utc>::from_timestamp_millis)
                .map(|t| t + window),
        });
    }

    sqlx::query(
        "INSERT INTO reward_grants (grant_id, user_id, amount, granted_at) VALUES (?, ?, ?, ?)",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(amount.as_i64())
    .bind(now_ms)
    .execute(&mut *tx)
    .await
    .map_err(db_err)?;

    let balance: i64 = sqlx::query_scalar("SELECT runes FROM accounts WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;

    tx.commit().await.map_err(db_err)?;

    Ok(GrantOutcome::Awarded {
        amount,
        new_balance: Some(Runes(balance)),
        next_eligible_at: Some(now + window),
    })
}

/// Balance summary for a user, if the account exists
pub async fn get_balance(pool: &SqlitePool, user_id: &str) -> Result<Option<RunesBalance>> {
    let row: Option<AccountRow> = sqlx::query_as(
        "SELECT user_id, runes, total_grants, last_reward_time FROM accounts WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(db_err)?;

    Ok(row.map(RunesBalance::from))
}

/// Most recent grants for a user, newest first
pub async fn list_grants(pool: &SqlitePool, user_id: &str, limit: i64) -> Result<Vec<RewardGrant>> {
    let rows: Vec<GrantRow> = sqlx::query_as(
        r#"SELECT grant_id, user_id, amount, granted_at
           FROM reward_grants
           WHERE user_id = ?
           ORDER BY granted_at DESC
           LIMIT ?"#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(db_err)?;

    Ok(rows.into_iter().map(RewardGrant::from).collect())
}
