use super::*;
use crate::grantor::LedgerGrantor;
use crate::notice::NoticeBoard;
use runeward_core::{Error, ManualClock, Result, NOT_ELIGIBLE_MESSAGE};
use runeward_persistence::{Database, MemoryCheckpointStore};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

fn t0() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn alice() -> UserId {
    UserId::new("alice").unwrap()
}

/// Replays queued outcomes; errors once the queue runs dry
#[derive(Default)]
struct ScriptedGrantor {
    script: Mutex<VecDeque<Result<GrantOutcome>>>,
    calls: AtomicUsize,
}

impl ScriptedGrantor {
    fn push(&self, outcome: Result<GrantOutcome>) {
        self.script.lock().unwrap().push_back(outcome);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl GrantCollaborator for ScriptedGrantor {
    async fn check_and_award(&self, _user_id: &UserId) -> Result<GrantOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::NetworkError("offline".to_string())))
    }
}

/// Parks every call until released
#[derive(Default)]
struct BlockingGrantor {
    entered: Notify,
    release: Notify,
}

impl GrantCollaborator for BlockingGrantor {
    async fn check_and_award(&self, _user_id: &UserId) -> Result<GrantOutcome> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(awarded())
    }
}

/// Memory store whose reads and writes can be made to fail or hang
#[derive(Default)]
struct FlakyStore {
    inner: MemoryCheckpointStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    hang_writes: AtomicBool,
    write_entered: Notify,
}

impl CheckpointStore for FlakyStore {
    async fn read(&self, user_id: &UserId) -> Result<Option<DateTime<Utc>>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::DatabaseError("disk I/O error".to_string()));
        }
        self.inner.read(user_id).await
    }

    async fn write(&self, user_id: &UserId, at: DateTime<Utc>) -> Result<()> {
        if self.hang_writes.load(Ordering::SeqCst) {
            self.write_entered.notify_one();
            std::future::pending::<()>().await;
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::DatabaseError("database is locked".to_string()));
        }
        self.inner.write(user_id, at).await
    }
}

fn flaky_timer(
    store: &Arc<FlakyStore>,
    grantor: &Arc<ScriptedGrantor>,
    board: &Arc<NoticeBoard>,
) -> SessionRewardTimer<Arc<FlakyStore>, Arc<ScriptedGrantor>, Arc<NoticeBoard>, Arc<ManualClock>> {
    SessionRewardTimer::new(alice(), store.clone(), grantor.clone(), board.clone())
        .with_clock(Arc::new(ManualClock::new(t0())))
}

fn awarded() -> GrantOutcome {
    GrantOutcome::Awarded {
        amount: Runes(10),
        new_balance: Some(Runes(10)),
        next_eligible_at: None,
    }
}

struct Fixture {
    store: Arc<MemoryCheckpointStore>,
    grantor: Arc<ScriptedGrantor>,
    board: Arc<NoticeBoard>,
    clock: Arc<ManualClock>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            store: Arc::new(MemoryCheckpointStore::new()),
            grantor: Arc::new(ScriptedGrantor::default()),
            board: Arc::new(NoticeBoard::new()),
            clock: Arc::new(ManualClock::new(t0())),
        }
    }

    fn timer(
        &self,
    ) -> SessionRewardTimer<
        Arc<MemoryCheckpointStore>,
        Arc<ScriptedGrantor>,
        Arc<NoticeBoard>,
        Arc<ManualClock>,
    > {
        SessionRewardTimer::new(
            alice(),
            self.store.clone(),
            self.grantor.clone(),
            self.board.clone(),
        )
        .with_clock(self.clock.clone())
    }

    fn checkpoint_ago(&self, ago: Duration) {
        self.store.set(&alice(), t0() - ago);
    }
}

#[tokio::test]
async fn test_first_poll_creates_checkpoint() {
    let fx = Fixture::new();
    let outcome = fx.timer().poll_once().await;

    assert_eq!(outcome, PollOutcome::CheckpointReset(ResetReason::Missing));
    assert_eq!(fx.store.get(&alice()), Some(t0()));
    assert_eq!(fx.grantor.calls(), 0);
}

#[tokio::test]
async fn test_stale_checkpoint_resets_without_grant() {
    let fx = Fixture::new();
    fx.checkpoint_ago(Duration::hours(25));

    let outcome = fx.timer().poll_once().await;

    assert_eq!(outcome, PollOutcome::CheckpointReset(ResetReason::Stale));
    assert_eq!(fx.store.get(&alice()), Some(t0()));
    assert_eq!(fx.grantor.calls(), 0);
    assert_eq!(fx.board.shown_count(), 0);
}

#[tokio::test]
async fn test_future_or_corrupt_checkpoint_resets() {
    let fx = Fixture::new();
    fx.store.set(&alice(), t0() + Duration::minutes(30));
    assert_eq!(
        fx.timer().poll_once().await,
        PollOutcome::CheckpointReset(ResetReason::InFuture)
    );

    fx.store.insert_raw(&alice(), "Invalid Date");
    assert_eq!(
        fx.timer().poll_once().await,
        PollOutcome::CheckpointReset(ResetReason::Missing)
    );
    assert_eq!(fx.store.get(&alice()), Some(t0()));
    assert_eq!(fx.grantor.calls(), 0);
}

#[tokio::test]
async fn test_below_threshold_makes_no_grant_call() {
    let fx = Fixture::new();
    fx.checkpoint_ago(Duration::minutes(9));

    let outcome = fx.timer().poll_once().await;

    assert_eq!(
        outcome,
        PollOutcome::Accruing {
            remaining: Duration::minutes(1)
        }
    );
    assert_eq!(fx.grantor.calls(), 0);
    assert_eq!(fx.store.get(&alice()), Some(t0() - Duration::minutes(9)));
}

#[tokio::test]
async fn test_award_shows_notice_and_restarts_window() {
    let fx = Fixture::new();
    fx.checkpoint_ago(Duration::minutes(11));
    fx.grantor.push(Ok(awarded()));

    let outcome = fx.timer().poll_once().await;

    assert_eq!(
        outcome,
        PollOutcome::Awarded {
            amount: Runes(10),
            new_balance: Some(Runes(10)),
        }
    );
    assert_eq!(fx.grantor.calls(), 1);
    assert_eq!(fx.store.get(&alice()), Some(t0()));

    let notice = fx.board.active(t0()).unwrap();
    assert_eq!(notice.amount, Runes(10));
    assert!(fx.board.active(t0() + Duration::seconds(5)).is_none());
}

#[tokio::test]
async fn test_too_early_leaves_checkpoint_and_retries() {
    let fx = Fixture::new();
    let checkpoint = t0() - Duration::minutes(11);
    fx.store.set(&alice(), checkpoint);
    fx.grantor.push(Ok(GrantOutcome::NotEligible {
        reason: NOT_ELIGIBLE_MESSAGE.to_string(),
        next_eligible_at: None,
    }));
    let timer = fx.timer();

    assert_eq!(
        timer.poll_once().await,
        PollOutcome::NotEligible { resynced_to: None }
    );
    assert_eq!(fx.store.get(&alice()), Some(checkpoint));
    assert_eq!(fx.board.shown_count(), 0);

    // Next poll tries again
    fx.grantor.push(Ok(awarded()));
    fx.clock.advance(Duration::minutes(1));
    assert!(matches!(timer.poll_once().await, PollOutcome::Awarded { .. }));
    assert_eq!(fx.grantor.calls(), 2);
}

#[tokio::test]
async fn test_too_early_resyncs_to_server_window() {
    let fx = Fixture::new();
    fx.checkpoint_ago(Duration::minutes(12));
    // Server granted 6 minutes ago, so it is eligible again in 4
    fx.grantor.push(Ok(GrantOutcome::NotEligible {
        reason: NOT_ELIGIBLE_MESSAGE.to_string(),
        next_eligible_at: Some(t0() + Duration::minutes(4)),
    }));
    let timer = fx.timer();

    let expected = t0() - Duration::minutes(6);
    assert_eq!(
        timer.poll_once().await,
        PollOutcome::NotEligible {
            resynced_to: Some(expected)
        }
    );
    assert_eq!(fx.store.get(&alice()), Some(expected));

    // Client and server now agree: nothing to ask for until t0 + 4m
    fx.clock.advance(Duration::minutes(3));
    assert!(matches!(timer.poll_once().await, PollOutcome::Accruing { .. }));
    assert_eq!(fx.grantor.calls(), 1);
}

#[tokio::test]
async fn test_transport_failure_retries_every_poll() {
    let fx = Fixture::new();
    let checkpoint = t0() - Duration::minutes(11);
    fx.store.set(&alice(), checkpoint);
    let timer = fx.timer();

    for expected_calls in 1..=3 {
        assert_eq!(timer.poll_once().await, PollOutcome::GrantFailed);
        assert_eq!(fx.grantor.calls(), expected_calls);
        fx.clock.advance(Duration::minutes(1));
    }
    assert_eq!(fx.store.get(&alice()), Some(checkpoint));
    assert_eq!(fx.board.shown_count(), 0);
}

#[tokio::test]
async fn test_full_cycle_against_ledger() {
    let db = Database::connect_in_memory().await.unwrap();
    let clock = Arc::new(ManualClock::new(t0()));
    let grantor = LedgerGrantor::with_clock(db.pool().clone(), clock.clone());
    let store = Arc::new(MemoryCheckpointStore::new());
    let board = Arc::new(NoticeBoard::new());
    let timer = SessionRewardTimer::new(alice(), store.clone(), grantor.clone(), board.clone())
        .with_clock(clock.clone());

    assert!(matches!(timer.poll_once().await, PollOutcome::CheckpointReset(_)));

    clock.advance(Duration::minutes(10));
    assert_eq!(
        timer.poll_once().await,
        PollOutcome::Awarded {
            amount: Runes(10),
            new_balance: Some(Runes(10)),
        }
    );

    clock.advance(Duration::minutes(5));
    assert!(matches!(timer.poll_once().await, PollOutcome::Accruing { .. }));

    clock.advance(Duration::minutes(5));
    assert_eq!(
        timer.poll_once().await,
        PollOutcome::Awarded {
            amount: Runes(10),
            new_balance: Some(Runes(20)),
        }
    );
    assert_eq!(board.shown_count(), 2);

    let balance = grantor.balance(&alice()).await.unwrap().unwrap();
    assert_eq!(balance.runes, 20);
}

#[tokio::test]
async fn test_two_tabs_award_once() {
    let db = Database::connect_in_memory().await.unwrap();
    let clock = Arc::new(ManualClock::new(t0()));
    let grantor = Arc::new(LedgerGrantor::with_clock(db.pool().clone(), clock.clone()));
    let board = Arc::new(NoticeBoard::new());

    // Each tab keeps its own checkpoint
    let tab_a = Arc::new(MemoryCheckpointStore::new());
    let tab_b = Arc::new(MemoryCheckpointStore::new());
    tab_a.set(&alice(), t0() - Duration::minutes(11));
    tab_b.set(&alice(), t0() - Duration::minutes(12));

    let timer_a = SessionRewardTimer::new(alice(), tab_a.clone(), grantor.clone(), board.clone())
        .with_clock(clock.clone());
    let timer_b = SessionRewardTimer::new(alice(), tab_b.clone(), grantor.clone(), board.clone())
        .with_clock(clock.clone());

    let (a, b) = tokio::join!(timer_a.poll_once(), timer_b.poll_once());

    let awards = [&a, &b]
        .iter()
        .filter(|o| matches!(o, PollOutcome::Awarded { .. }))
        .count();
    assert_eq!(awards, 1);
    assert_eq!(board.shown_count(), 1);

    // The losing tab resyncs to the server's fresh window
    assert_eq!(tab_a.get(&alice()), Some(t0()));
    assert_eq!(tab_b.get(&alice()), Some(t0()));

    let balance = grantor.balance(&alice()).await.unwrap().unwrap();
    assert_eq!(balance.runes, 10);
}

// ─── Runner ──────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_runner_polls_once_per_interval() {
    let fx = Fixture::new();
    fx.checkpoint_ago(Duration::minutes(11));
    let handle = spawn_session_timer(fx.timer());

    // Ticks at 0s, 60s and 120s
    tokio::time::sleep(std::time::Duration::from_secs(150)).await;
    assert_eq!(fx.grantor.calls(), 3);

    handle.shutdown().await;
    assert!(handle.is_stopped());
}

#[tokio::test(start_paused = true)]
async fn test_runner_emits_award_event() {
    let fx = Fixture::new();
    fx.checkpoint_ago(Duration::minutes(11));
    fx.grantor.push(Ok(awarded()));
    let handle = spawn_session_timer(fx.timer());
    let mut events = handle.subscribe();

    match events.recv().await.unwrap() {
        TimerEvent::Awarded(e) => {
            assert_eq!(e.user_id, "alice");
            assert_eq!(e.amount, 10);
            assert_eq!(e.total_awards, 1);
        }
        other => panic!("expected award event, got {:?}", other),
    }
    match events.recv().await.unwrap() {
        TimerEvent::Tick(t) => assert_eq!(t.state, "awarded"),
        other => panic!("expected tick, got {:?}", other),
    }

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_runner_disabled_skips_polls() {
    let fx = Fixture::new();
    fx.checkpoint_ago(Duration::minutes(11));
    let handle = spawn_session_timer(fx.timer());
    let mut events = handle.subscribe();

    // First poll runs immediately
    assert!(matches!(events.recv().await.unwrap(), TimerEvent::Tick(_)));
    assert_eq!(fx.grantor.calls(), 1);

    handle.disable();
    assert!(!handle.is_enabled());
    tokio::time::sleep(std::time::Duration::from_secs(200)).await;
    assert_eq!(fx.grantor.calls(), 1);

    handle.enable();
    tokio::time::sleep(std::time::Duration::from_secs(60)).await;
    assert_eq!(fx.grantor.calls(), 2);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_runner_can_start_paused() {
    let fx = Fixture::new();
    fx.checkpoint_ago(Duration::minutes(11));
    let handle = spawn_session_timer_with(fx.timer(), false);
    let mut events = handle.subscribe();

    match events.recv().await.unwrap() {
        TimerEvent::Tick(t) => {
            assert!(!t.enabled);
            assert_eq!(t.state, "disabled");
        }
        other => panic!("expected tick, got {:?}", other),
    }
    assert_eq!(fx.grantor.calls(), 0);

    handle.shutdown().await;
}

#[tokio::test]
async fn test_cancel_mid_flight_drops_update() {
    let store = Arc::new(MemoryCheckpointStore::new());
    let grantor = Arc::new(BlockingGrantor::default());
    let board = Arc::new(NoticeBoard::new());
    let clock = Arc::new(ManualClock::new(t0()));
    let checkpoint = t0() - Duration::minutes(11);
    store.set(&alice(), checkpoint);

    let timer = SessionRewardTimer::new(alice(), store.clone(), grantor.clone(), board.clone())
        .with_clock(clock);
    let handle = spawn_session_timer(timer);

    grantor.entered.notified().await;
    handle.shutdown().await;

    // A late reply has nowhere to land
    grantor.release.notify_waiters();
    tokio::task::yield_now().await;

    assert_eq!(board.shown_count(), 0);
    assert_eq!(store.get(&alice()), Some(checkpoint));
}

#[tokio::test]
async fn test_cancel_during_checkpoint_write_shows_no_notice() {
    let store = Arc::new(FlakyStore::default());
    let grantor = Arc::new(ScriptedGrantor::default());
    let board = Arc::new(NoticeBoard::new());
    let checkpoint = t0() - Duration::minutes(11);
    store.inner.set(&alice(), checkpoint);
    store.hang_writes.store(true, Ordering::SeqCst);
    grantor.push(Ok(awarded()));

    let handle = spawn_session_timer(flaky_timer(&store, &grantor, &board));

    store.write_entered.notified().await;
    handle.shutdown().await;

    assert_eq!(grantor.calls(), 1);
    assert_eq!(board.shown_count(), 0);
    assert_eq!(store.inner.get(&alice()), Some(checkpoint));
}

// ─── Storage failures ────────────────────────────────────────────────

#[tokio::test]
async fn test_read_failure_skips_cycle() {
    let store = Arc::new(FlakyStore::default());
    let grantor = Arc::new(ScriptedGrantor::default());
    let board = Arc::new(NoticeBoard::new());
    store.inner.set(&alice(), t0() - Duration::minutes(11));
    store.fail_reads.store(true, Ordering::SeqCst);

    let outcome = flaky_timer(&store, &grantor, &board).poll_once().await;

    assert_eq!(outcome, PollOutcome::StoreUnavailable);
    assert_eq!(grantor.calls(), 0);
    assert_eq!(board.shown_count(), 0);
}

#[tokio::test]
async fn test_reset_write_failure_is_store_unavailable() {
    let store = Arc::new(FlakyStore::default());
    let grantor = Arc::new(ScriptedGrantor::default());
    let board = Arc::new(NoticeBoard::new());
    store.fail_writes.store(true, Ordering::SeqCst);

    let outcome = flaky_timer(&store, &grantor, &board).poll_once().await;

    assert_eq!(outcome, PollOutcome::StoreUnavailable);
    assert_eq!(store.inner.get(&alice()), None);
    assert_eq!(grantor.calls(), 0);
}

#[tokio::test]
async fn test_award_survives_checkpoint_write_failure() {
    let store = Arc::new(FlakyStore::default());
    let grantor = Arc::new(ScriptedGrantor::default());
    let board = Arc::new(NoticeBoard::new());
    let checkpoint = t0() - Duration::minutes(11);
    store.inner.set(&alice(), checkpoint);
    store.fail_writes.store(true, Ordering::SeqCst);
    grantor.push(Ok(awarded()));

    let outcome = flaky_timer(&store, &grantor, &board).poll_once().await;

    assert_eq!(
        outcome,
        PollOutcome::Awarded {
            amount: Runes(10),
            new_balance: Some(Runes(10)),
        }
    );
    assert_eq!(board.shown_count(), 1);
    assert_eq!(store.inner.get(&alice()), Some(checkpoint));
}

#[tokio::test]
async fn test_resync_write_failure_keeps_checkpoint() {
    let store = Arc::new(FlakyStore::default());
    let grantor = Arc::new(ScriptedGrantor::default());
    let board = Arc::new(NoticeBoard::new());
    let checkpoint = t0() - Duration::minutes(11);
    store.inner.set(&alice(), checkpoint);
    store.fail_writes.store(true, Ordering::SeqCst);
    grantor.push(Ok(GrantOutcome::NotEligible {
        reason: NOT_ELIGIBLE_MESSAGE.to_string(),
        next_eligible_at: Some(t0() + Duration::minutes(4)),
    }));

    let outcome = flaky_timer(&store, &grantor, &board).poll_once().await;

    assert_eq!(outcome, PollOutcome::NotEligible { resynced_to: None });
    assert_eq!(store.inner.get(&alice()), Some(checkpoint));
    assert_eq!(board.shown_count(), 0);
}

#[tokio::test]
async fn test_enable_flag_sticks_after_shutdown() {
    let fx = Fixture::new();
    let handle = spawn_session_timer(fx.timer());
    handle.shutdown().await;

    handle.disable();
    assert!(!handle.is_enabled());
    handle.enable();
    assert!(handle.is_enabled());
}
