//! Execution Guard: level-0 pre-flight checks, executed in order with first-failure-wins
//! (spec 4.4.2). Safe mode is a latch that only clears on explicit operator action.

use crate::{error::HardBlockReason, token_bucket::TokenBucket};
use control_core::{
    clock::{Clock, MonotonicUs},
    journal::{EventType, Journal, JournalEntry},
    model::SystemStatus,
    payload::CanonicalMap,
    state::StateStore,
};
use std::sync::{atomic::{AtomicBool, Ordering}, Arc};
use tracing::warn;

/// Heartbeat must be no older than this for the freshness check to pass (spec 4.4.2).
pub const HEARTBEAT_FRESHNESS_LIMIT_US: i64 = 2_000_000;

/// Token bucket parameters (spec 4.4.2): rate 10/s, capacity 50.
pub const RATE_LIMIT_TOKENS_PER_SEC: f64 = 10.0;
pub const RATE_LIMIT_CAPACITY: f64 = 50.0;

pub struct ExecutionGuard {
    store: Arc<dyn StateStore>,
    clock: Arc<dyn Clock>,
    journal: Arc<parking_lot::Mutex<Journal>>,
    safe_mode: AtomicBool,
    bucket: parking_lot::Mutex<TokenBucket>,
}

impl ExecutionGuard {
    pub fn new(
        store: Arc<dyn StateStore>,
        clock: Arc<dyn Clock>,
        journal: Arc<parking_lot::Mutex<Journal>>,
    ) -> Self {
        let now = clock.monotonic_us();
        Self {
            store,
            clock,
            journal,
            safe_mode: AtomicBool::new(false),
            bucket: parking_lot::Mutex::new(TokenBucket::new(
                RATE_LIMIT_TOKENS_PER_SEC,
                RATE_LIMIT_CAPACITY,
                now,
            )),
        }
    }

    pub fn is_safe_mode(&self) -> bool {
        self.safe_mode.load(Ordering::SeqCst)
    }

    /// Activates the safe-mode latch and journals the transition. Idempotent.
    pub fn activate_safe_mode(&self, reason: &str) {
        let was_active = self.safe_mode.swap(true, Ordering::SeqCst);
        if was_active {
            return;
        }
        warn!(reason, "safe mode activated");
        self.journal_safe_mode(true, reason);
    }

    /// Clears the safe-mode latch on explicit operator action. Idempotent.
    pub fn clear_safe_mode(&self, reason: &str) {
        let was_active = self.safe_mode.swap(false, Ordering::SeqCst);
        if !was_active {
            return;
        }
        self.journal_safe_mode(false, reason);
    }

    fn journal_safe_mode(&self, active: bool, reason: &str) {
        let mut data = CanonicalMap::new();
        data.insert("safe_mode", active).insert("reason", reason);
        let ts = self.clock.epoch_us().0;
        if let Err(err) = self
            .journal
            .lock()
            .append(&JournalEntry::new(EventType::StatusChange, ts, data))
        {
            tracing::error!(%err, "failed to journal safe-mode transition");
        }
    }

    /// Runs the four pre-flight checks in order, short-circuiting on the first failure
    /// (spec 4.4.2): safe-mode interlock, Observer connectivity, heartbeat freshness, rate
    /// limit.
    pub fn check(&self) -> Result<(), HardBlockReason> {
        if self.is_safe_mode() {
            return Err(HardBlockReason::SafeModeActive);
        }

        let state = self.store.get_system_state();
        if state.status != SystemStatus::Connected {
            return Err(HardBlockReason::ObserverNotConnected(state.status.to_string()));
        }

        let now_epoch = self.clock.epoch_us().0;
        let age_us = now_epoch - state.last_update_us;
        if age_us > HEARTBEAT_FRESHNESS_LIMIT_US {
            return Err(HardBlockReason::HeartbeatStale {
                age_us,
                limit_us: HEARTBEAT_FRESHNESS_LIMIT_US,
            });
        }

        let now_mono = self.clock.monotonic_us();
        if !self.bucket.lock().consume(1.0, now_mono) {
            return Err(HardBlockReason::RateLimited);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use control_core::{clock::FixedClock, state::InMemoryStateStore};

    fn guard() -> (ExecutionGuard, Arc<FixedClock>, Arc<dyn StateStore>, std::path::PathBuf) {
        let path = std::env::temp_dir().join(format!(
            "control-gatekeeper-guard-test-{}-{}",
            std::process::id(),
            COUNTER.fetch_add(1, std::sync::atomic::Ordering::Relaxed)
        ));
        std::fs::File::create(&path).unwrap();
        let journal = Arc::new(parking_lot::Mutex::new(Journal::open(&path).unwrap()));
        let store: Arc<dyn StateStore> = Arc::new(InMemoryStateStore::new());
        let clock = Arc::new(FixedClock::new(0, 0));
        store.put_system_state(control_core::state::SystemState {
            status: SystemStatus::Connected,
            last_update_us: 0,
            gap_count: 0,
        });
        let guard = ExecutionGuard::new(Arc::clone(&store), clock.clone(), journal);
        (guard, clock, store, path)
    }

    static COUNTER: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);

    #[test]
    fn passes_when_connected_fresh_and_not_rate_limited() {
        let (guard, _clock, _store, _path) = guard();
        assert!(guard.check().is_ok());
    }

    #[test]
    fn safe_mode_short_circuits_everything_else() {
        let (guard, _clock, _store, _path) = guard();
        guard.activate_safe_mode("reconciliation drift");
        assert_eq!(guard.check(), Err(HardBlockReason::SafeModeActive));
    }

    #[test]
    fn not_connected_blocks() {
        let (guard, _clock, store, _path) = guard();
        store.put_system_state(control_core::state::SystemState {
            status: SystemStatus::Degraded,
            last_update_us: 0,
            gap_count: 0,
        });
        assert_eq!(
            guard.check(),
            Err(HardBlockReason::ObserverNotConnected("DEGRADED".to_owned()))
        );
    }

    #[test]
    fn stale_heartbeat_blocks() {
        let (guard, clock, _store, _path) = guard();
        clock.set_epoch(3_000_000);
        assert_eq!(
            guard.check(),
            Err(HardBlockReason::HeartbeatStale {
                age_us: 3_000_000,
                limit_us: HEARTBEAT_FRESHNESS_LIMIT_US
            })
        );
    }

    #[test]
    fn exhausted_rate_limit_blocks() {
        let (guard, _clock, _store, _path) = guard();
        for _ in 0..50 {
            assert!(guard.check().is_ok());
        }
        assert_eq!(guard.check(), Err(HardBlockReason::RateLimited));
    }
}
