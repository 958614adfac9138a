//! Reward notification surface

use chrono::{DateTime, Duration, Utc};
use runeward_core::Runes;
use serde::Serialize;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock};
use tracing::debug;

/// A transient "you earned runes" notice
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardNotice {
    pub amount: Runes,
    pub shown_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl RewardNotice {
    pub fn new(amount: Runes, shown_at: DateTime<Utc>, duration: Duration) -> Self {
        Self {
            amount,
            shown_at,
            expires_at: shown_at + duration,
        }
    }

    pub fn is_visible(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Anything that can display a reward notice
pub trait RewardNotifier: Send + Sync {
    fn notify(&self, notice: RewardNotice);
}

impl<T: RewardNotifier> RewardNotifier for Arc<T> {
    fn notify(&self, notice: RewardNotice) {
        (**self).notify(notice)
    }
}

/// Holds the most recent notice until it expires or is dismissed
#[derive(Debug, Default)]
pub struct NoticeBoard {
    current: RwLock<Option<RewardNotice>>,
    shown: AtomicU32,
}

impl NoticeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notice still on screen at `now`, if any
    pub fn active(&self, now: DateTime<Utc>) -> Option<RewardNotice> {
        let current = self.current.read().ok()?;
        current.as_ref().filter(|n| n.is_visible(now)).cloned()
    }

    /// Explicit dismissal by the user
    pub fn dismiss(&self) {
        if let Ok(mut current) = self.current.write() {
            *current = None;
        }
    }

    /// Number of notices shown over the board's lifetime
    pub fn shown_count(&self) -> u32 {
        self.shown.load(Ordering::Relaxed)
    }
}

impl RewardNotifier for NoticeBoard {
    fn notify(&self, notice: RewardNotice) {
        debug!("Showing reward notice: {}", notice.amount);
        if let Ok(mut current) = self.current.write() {
            *current = Some(notice);
        }
        self.shown.fetch_add(1, Ordering::Relaxed);
    }
}
