//! Reconciliation Engine: periodic comparison against an authoritative exchange snapshot
//! (spec 4.4.5). First-failure-wins: aborts the cycle on the first symbol that drifts beyond
//! tolerance, to preserve forensic clarity.

use crate::guard::ExecutionGuard;
use control_core::{decimal, state::{PositionsMap, StateStore}};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info};

/// Outcome of a single [`ReconciliationEngine::run`] cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconciliationOutcome {
    Passed,
    /// The first symbol found to drift beyond tolerance. Safe mode has already been
    /// activated on the Guard by the time this is returned.
    Drift {
        symbol: String,
        internal: Decimal,
        exchange: Decimal,
    },
}

pub struct ReconciliationEngine {
    store: Arc<dyn StateStore>,
    guard: Arc<ExecutionGuard>,
    tolerance: Decimal,
}

impl ReconciliationEngine {
    pub fn new(store: Arc<dyn StateStore>, guard: Arc<ExecutionGuard>, tolerance: Decimal) -> Self {
        Self {
            store,
            guard,
            tolerance,
        }
    }

    /// Compares `exchange_snapshot` against the internal positions. Iterates symbols in
    /// lexicographic order so the "first symbol" in first-failure-wins is deterministic.
    pub fn run(&self, exchange_snapshot: &PositionsMap) -> Result<ReconciliationOutcome, decimal::DecimalError> {
        for (symbol, exchange_qty) in exchange_snapshot {
            let internal_qty = self.store.get_position(symbol);
            let diff = decimal::checked_sub(internal_qty, *exchange_qty)?.abs();

            if diff > self.tolerance {
                error!(
                    symbol,
                    internal = %internal_qty,
                    exchange = %exchange_qty,
                    "CRITICAL_STATE_DRIFT"
                );
                self.guard
                    .activate_safe_mode(&format!("reconciliation drift on {symbol}"));

                return Ok(ReconciliationOutcome::Drift {
                    symbol: symbol.clone(),
                    internal: internal_qty,
                    exchange: *exchange_qty,
                });
            }
        }

        info!("reconciliation_passed");
        Ok(ReconciliationOutcome::Passed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use control_core::{clock::FixedClock, state::InMemoryStateStore};
    use rust_decimal_macros::dec;

    fn engine(tolerance: Decimal) -> (ReconciliationEngine, Arc<dyn StateStore>, Arc<ExecutionGuard>) {
        let path = std::env::temp_dir().join(format!(
            "control-gatekeeper-recon-test-{}-{}",
            std::process::id(),
            COUNTER.fetch_add(1, std::sync::atomic::Ordering::Relaxed)
        ));
        std::fs::File::create(&path).unwrap();
        let journal = Arc::new(parking_lot::Mutex::new(control_core::journal::Journal::open(&path).unwrap()));
        let store: Arc<dyn StateStore> = Arc::new(InMemoryStateStore::new());
        let clock = Arc::new(FixedClock::new(0, 0));
        let guard = Arc::new(ExecutionGuard::new(Arc::clone(&store), clock, journal));
        (
            ReconciliationEngine::new(Arc::clone(&store), Arc::clone(&guard), tolerance),
            store,
            guard,
        )
    }

    static COUNTER: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);

    #[test]
    fn clean_pass_does_not_activate_safe_mode() {
        let (engine, store, guard) = engine(Decimal::ZERO);
        store.incr_position("X", dec!(5));
        let mut snapshot = PositionsMap::new();
        snapshot.insert("X".into(), dec!(5));

        assert_eq!(engine.run(&snapshot).unwrap(), ReconciliationOutcome::Passed);
        assert!(!guard.is_safe_mode());
    }

    #[test]
    fn drift_beyond_tolerance_activates_safe_mode_and_aborts() {
        let (engine, store, guard) = engine(Decimal::ZERO);
        store.incr_position("X", dec!(5));
        let mut snapshot = PositionsMap::new();
        snapshot.insert("X".into(), dec!(7));

        let outcome = engine.run(&snapshot).unwrap();
        assert_eq!(
            outcome,
            ReconciliationOutcome::Drift {
                symbol: "X".into(),
                internal: dec!(5),
                exchange: dec!(7)
            }
        );
        assert!(guard.is_safe_mode());
    }

    #[test]
    fn within_tolerance_passes() {
        let (engine, store, _guard) = engine(dec!(0.01));
        store.incr_position("X", dec!(5.005));
        let mut snapshot = PositionsMap::new();
        snapshot.insert("X".into(), dec!(5.0));

        assert_eq!(engine.run(&snapshot).unwrap(), ReconciliationOutcome::Passed);
    }
}
