//! State Controller: the sole mutator of positions and orders (spec 4.4.4).

use crate::{error::HardBlockReason, guard::ExecutionGuard, registry::{CommandRegistry, RegisterOutcome}};
use control_core::{decimal, model::{ExecutionReport, OrderIntent}, state::StateStore};
use std::sync::Arc;
use tracing::info;

/// Outcome of [`GatekeeperStateController::submit_intent`].
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum SubmitOutcome {
    Accepted,
    Duplicate,
}

/// The only component permitted to mutate orders-state or positions-state (spec 4.4).
pub struct GatekeeperStateController {
    registry: parking_lot::Mutex<CommandRegistry>,
    guard: ExecutionGuard,
    store: Arc<dyn StateStore>,
}

impl GatekeeperStateController {
    pub fn new(guard: ExecutionGuard, store: Arc<dyn StateStore>) -> Self {
        decimal::DecimalContext::init();
        Self {
            registry: parking_lot::Mutex::new(CommandRegistry::new()),
            guard,
            store,
        }
    }

    pub fn guard(&self) -> &ExecutionGuard {
        &self.guard
    }

    /// Idempotency check, then Guard validation. Never mutates positions or orders (spec
    /// 4.4.4).
    pub fn submit_intent(&self, intent: OrderIntent) -> Result<SubmitOutcome, HardBlockReason> {
        // Single-writer discipline: the registry check and the Guard's rate limiter are
        // serialised under the same lock so concurrent submissions cannot race each other
        // (spec 5).
        let mut registry = self.registry.lock();

        match registry.register(intent.clone()) {
            RegisterOutcome::Duplicate => {
                info!(cloid = %intent.client_order_id, "duplicate intent, no-op");
                Ok(SubmitOutcome::Duplicate)
            }
            RegisterOutcome::Accepted => {
                self.guard.check()?;
                info!(cloid = %intent.client_order_id, "intent accepted");
                Ok(SubmitOutcome::Accepted)
            }
        }
    }

    /// Overwrites `orders[client_order_id]` with `report`. Folds fills into `positions`
    /// using the exact signed-decimal accumulation in [`control_core::decimal`] (spec 4.4.4,
    /// invariant 2).
    pub fn process_execution_report(&self, report: ExecutionReport) {
        if report.status.is_fill() {
            let delta = report.side.signed(report.filled_quantity);
            self.store.incr_position(&report.symbol, delta);
        }
        self.store.put_order(&report.client_order_id, report);
    }

    pub fn positions_snapshot(&self) -> control_core::state::PositionsMap {
        self.store.positions_snapshot()
    }

    pub fn orders_snapshot(&self) -> control_core::state::OrdersMap {
        self.store.orders_snapshot()
    }
}

/// Re-exported so callers that only need the exact accumulation rule (eg/ the Simulator's
/// `apply` mirror) do not need to depend on the whole controller.
pub fn fold_fill(
    positions: &mut control_core::state::PositionsMap,
    report: &ExecutionReport,
) -> Result<(), decimal::DecimalError> {
    if !report.status.is_fill() {
        return Ok(());
    }
    let delta = report.side.signed(report.filled_quantity);
    let entry = positions
        .entry(report.symbol.clone())
        .or_insert(rust_decimal::Decimal::ZERO);
    *entry = decimal::checked_add(*entry, delta)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use control_core::{
        clock::{EpochUs, FixedClock},
        model::{ExecStatus, OrderType, Side, TimeInForce},
        state::InMemoryStateStore,
    };
    use rust_decimal_macros::dec;

    fn controller() -> GatekeeperStateController {
        let path = std::env::temp_dir().join(format!(
            "control-gatekeeper-sc-test-{}-{}",
            std::process::id(),
            COUNTER.fetch_add(1, std::sync::atomic::Ordering::Relaxed)
        ));
        std::fs::File::create(&path).unwrap();
        let journal = Arc::new(parking_lot::Mutex::new(control_core::journal::Journal::open(&path).unwrap()));
        let store: Arc<dyn StateStore> = Arc::new(InMemoryStateStore::new());
        store.put_system_state(control_core::state::SystemState {
            status: control_core::model::SystemStatus::Connected,
            last_update_us: 0,
            gap_count: 0,
        });
        let clock = Arc::new(FixedClock::new(0, 0));
        let guard = ExecutionGuard::new(Arc::clone(&store), clock, journal);
        GatekeeperStateController::new(guard, store)
    }

    static COUNTER: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);

    fn intent(cloid: &str) -> OrderIntent {
        OrderIntent {
            client_order_id: cloid.to_owned(),
            symbol: "X".to_owned(),
            side: Side::Buy,
            order_type: OrderType::Limit,
            quantity: dec!(1.0),
            price: Some(dec!(100)),
            time_in_force: TimeInForce::Gtc,
            created_ts: EpochUs(0),
        }
    }

    #[test]
    fn idempotent_submit_does_not_mutate_state_either_time() {
        let controller = controller();
        assert_eq!(controller.submit_intent(intent("A")).unwrap(), SubmitOutcome::Accepted);
        assert_eq!(controller.submit_intent(intent("A")).unwrap(), SubmitOutcome::Duplicate);
        assert!(controller.positions_snapshot().is_empty());
        assert!(controller.orders_snapshot().is_empty());
    }

    #[test]
    fn fill_accumulation_is_exact() {
        let controller = controller();
        controller.process_execution_report(ExecutionReport {
            client_order_id: "A".into(),
            exchange_order_id: "E1".into(),
            symbol: "X".into(),
            side: Side::Buy,
            status: ExecStatus::PartialFill,
            filled_quantity: dec!(0.4),
            last_filled_price: Some(dec!(100)),
            remaining_quantity: dec!(0.6),
            exchange_ts: EpochUs(0),
        });
        controller.process_execution_report(ExecutionReport {
            client_order_id: "A".into(),
            exchange_order_id: "E1".into(),
            symbol: "X".into(),
            side: Side::Buy,
            status: ExecStatus::Filled,
            filled_quantity: dec!(0.6),
            last_filled_price: Some(dec!(100)),
            remaining_quantity: dec!(0),
            exchange_ts: EpochUs(0),
        });

        assert_eq!(controller.positions_snapshot().get("X"), Some(&dec!(1.0)));
        assert_eq!(
            controller.orders_snapshot().get("A").unwrap().status,
            ExecStatus::Filled
        );
    }
}
