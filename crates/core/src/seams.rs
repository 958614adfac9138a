//! Collaborator traits the reward timer is written against

use crate::{GrantOutcome, Result, UserId};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;

/// Per-user storage for the accrual checkpoint.
///
/// `read` returns `None` both when nothing is stored and when the stored value
/// cannot be interpreted; the timer treats both as "start a fresh window".
pub trait CheckpointStore: Send + Sync {
    fn read(&self, user_id: &UserId) -> impl Future<Output = Result<Option<DateTime<Utc>>>> + Send;

    fn write(&self, user_id: &UserId, at: DateTime<Utc>) -> impl Future<Output = Result<()>> + Send;
}

/// Authoritative "check and grant" operation.
///
/// Implementations must issue at most one grant per window per user, even
/// under concurrent calls. `Err` is reserved for transport and server failures;
/// "too early" is `Ok(GrantOutcome::NotEligible { .. })`.
pub trait GrantCollaborator: Send + Sync {
    fn check_and_award(&self, user_id: &UserId) -> impl Future<Output = Result<GrantOutcome>> + Send;
}

impl<T: CheckpointStore> CheckpointStore for Arc<T> {
    fn read(&self, user_id: &UserId) -> impl Future<Output = Result<Option<DateTime<Utc>>>> + Send {
        (**self).read(user_id)
    }

    fn write(&self, user_id: &UserId, at: DateTime<Utc>) -> impl Future<Output = Result<()>> + Send {
        (**self).write(user_id, at)
    }
}

impl<T: GrantCollaborator> GrantCollaborator for Arc<T> {
    fn check_and_award(&self, user_id: &UserId) -> impl Future<Output = Result<GrantOutcome>> + Send {
        (**self).check_and_award(user_id)
    }
}
