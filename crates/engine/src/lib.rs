//! Runeward Engine - Session reward timer, its background loop, and the
//! ledger-backed grant collaborator

pub mod grantor;
pub mod notice;
pub mod timer;

pub use grantor::LedgerGrantor;
pub use notice::{NoticeBoard, RewardNotice, RewardNotifier};
pub use timer::{
    spawn_session_timer, spawn_session_timer_with, PollOutcome, SessionRewardTimer,
    SessionTimerHandle, TimerEvent,
};
