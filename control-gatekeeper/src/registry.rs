//! Command Registry: idempotency on `client_order_id` (spec 4.4.1).

use control_core::model::OrderIntent;
use std::collections::HashMap;

/// Outcome of [`CommandRegistry::register`].
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RegisterOutcome {
    Accepted,
    Duplicate,
}

/// Maps `client_order_id -> OrderIntent`. Stable across the process lifetime; persistence
/// across restarts is a deployment decision (see `Open question — idempotent on-process
/// restart` in the spec, resolved in `DESIGN.md`).
#[derive(Debug, Default)]
pub struct CommandRegistry {
    intents: HashMap<String, OrderIntent>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `intent`. A duplicate `client_order_id` is a no-op: no re-validation, no
    /// mutation, no side effect beyond the caller's own structured log line.
    pub fn register(&mut self, intent: OrderIntent) -> RegisterOutcome {
        if self.intents.contains_key(&intent.client_order_id) {
            return RegisterOutcome::Duplicate;
        }
        self.intents.insert(intent.client_order_id.clone(), intent);
        RegisterOutcome::Accepted
    }

    pub fn get(&self, client_order_id: &str) -> Option<&OrderIntent> {
        self.intents.get(client_order_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use control_core::{clock::EpochUs, model::{OrderType, Side, TimeInForce}};
    use rust_decimal_macros::dec;

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
    fn first_registration_is_accepted_and_retrievable() {
        let mut registry = CommandRegistry::new();
        assert_eq!(registry.register(intent("A")), RegisterOutcome::Accepted);
        assert_eq!(registry.get("A"), Some(&intent("A")));
    }

    #[test]
    fn duplicate_registration_is_a_no_op() {
        let mut registry = CommandRegistry::new();
        registry.register(intent("A"));
        assert_eq!(registry.register(intent("A")), RegisterOutcome::Duplicate);
        // still exactly the original intent
        assert_eq!(registry.get("A"), Some(&intent("A")));
    }
}
