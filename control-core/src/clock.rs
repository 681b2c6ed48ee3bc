//! Two time domains that must never be mixed:
//! - [`MonotonicUs`]: a monotonic clock reading, used only for local durations (eg/ token
//!   bucket refill, heartbeat staleness). Never compared against an exchange timestamp.
//! - [`EpochUs`]: a wall-clock reading in the same domain as exchange timestamps, used for
//!   [`drift`] and journal ordering.
//!
//! Keeping these as distinct new types (rather than a bare `i64`) makes mixing them a
//! compile error instead of a 500ms production incident.

use serde::{Deserialize, Serialize};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// A monotonic clock reading in microseconds. Only meaningfully subtracted from another
/// [`MonotonicUs`]; never compared with [`EpochUs`].
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default, Deserialize, Serialize,
)]
pub struct MonotonicUs(pub i64);

impl MonotonicUs {
    pub fn elapsed_since(self, earlier: MonotonicUs) -> i64 {
        self.0 - earlier.0
    }
}

/// An epoch (wall-clock) reading in microseconds, in the same domain as exchange timestamps.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default, Deserialize, Serialize,
)]
pub struct EpochUs(pub i64);

impl EpochUs {
    /// Signed drift: `exchange - local`, both in the epoch domain.
    ///
    /// This is the *only* place drift is defined; callers must not subtract a
    /// [`MonotonicUs`] from an [`EpochUs`] (the type system forbids it).
    pub fn drift(exchange: EpochUs, local: EpochUs) -> i64 {
        exchange.0 - local.0
    }
}

/// Source of both time domains. Generally an implementor will use:
/// * [`SystemClock`] for live ingestion / execution.
/// * [`FixedClock`] for deterministic replay and tests.
pub trait Clock: Send + Sync {
    fn monotonic_us(&self) -> MonotonicUs;
    fn epoch_us(&self) -> EpochUs;
}

/// [`Clock`] backed by the OS monotonic and wall-clock sources.
#[derive(Debug, Copy, Clone, Default)]
pub struct SystemClock {
    origin: Option<Instant>,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Some(Instant::now()),
        }
    }
}

impl Clock for SystemClock {
    fn monotonic_us(&self) -> MonotonicUs {
        let origin = self.origin.unwrap_or_else(Instant::now);
        MonotonicUs(Instant::now().duration_since(origin).as_micros() as i64)
    }

    fn epoch_us(&self) -> EpochUs {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        EpochUs(now.as_micros() as i64)
    }
}

/// Deterministic [`Clock`] that only advances when told to. Used by the Simulator, which
/// must never read the wall clock, and by unit tests that need reproducible timing.
#[derive(Debug, Clone)]
pub struct FixedClock {
    monotonic_us: parking_lot::Mutex<i64>,
    epoch_us: parking_lot::Mutex<i64>,
}

impl FixedClock {
    pub fn new(monotonic_us: i64, epoch_us: i64) -> Self {
        Self {
            monotonic_us: parking_lot::Mutex::new(monotonic_us),
            epoch_us: parking_lot::Mutex::new(epoch_us),
        }
    }

    pub fn advance_monotonic(&self, delta_us: i64) {
        *self.monotonic_us.lock() += delta_us;
    }

    pub fn set_epoch(&self, epoch_us: i64) {
        *self.epoch_us.lock() = epoch_us;
    }
}

impl Clock for FixedClock {
    fn monotonic_us(&self) -> MonotonicUs {
        MonotonicUs(*self.monotonic_us.lock())
    }

    fn epoch_us(&self) -> EpochUs {
        EpochUs(*self.epoch_us.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drift_is_exchange_minus_local() {
        let exchange = EpochUs(1_000_600);
        let local = EpochUs(1_000_000);
        assert_eq!(EpochUs::drift(exchange, local), 600);
    }

    #[test]
    fn drift_can_be_negative() {
        let exchange = EpochUs(900);
        let local = EpochUs(1_000);
        assert_eq!(EpochUs::drift(exchange, local), -100);
    }

    #[test]
    fn fixed_clock_only_advances_on_command() {
        let clock = FixedClock::new(0, 0);
        assert_eq!(clock.monotonic_us(), MonotonicUs(0));
        clock.advance_monotonic(500_000);
        assert_eq!(clock.monotonic_us(), MonotonicUs(500_000));
    }

    #[test]
    fn system_clock_monotonic_never_decreases() {
        let clock = SystemClock::new();
        let first = clock.monotonic_us();
        spin_sleep::sleep(std::time::Duration::from_millis(5));
        let second = clock.monotonic_us();
        assert!(second.elapsed_since(first) >= 0);
    }
}
