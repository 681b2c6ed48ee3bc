//! Canonical state hashing (spec 4.5.4): SHA-256 over a self-describing encoding of
//! `{positions, orders, system_status, gap_count}` with keys in lexicographic order and
//! decimals as their canonical decimal string. Independent of insertion order and of
//! host-language map iteration order.

use crate::replay::ReplayState;
use control_core::{decimal::canonical_string, payload::CanonicalMap};
use sha2::{Digest, Sha256};

/// Builds the canonical, order-independent encoding of `state`.
pub fn canonicalize(state: &ReplayState) -> CanonicalMap {
    let mut positions = CanonicalMap::new();
    for (symbol, qty) in &state.positions {
        positions.insert(symbol.clone(), canonical_string(*qty));
    }

    let mut orders = CanonicalMap::new();
    for (cloid, report) in &state.orders {
        let mut entry = CanonicalMap::new();
        entry
            .insert("exchange_order_id", report.exchange_order_id.as_str())
            .insert("symbol", report.symbol.as_str())
            .insert("status", format!("{:?}", report.status))
            .insert("filled_quantity", canonical_string(report.filled_quantity))
            .insert("remaining_quantity", canonical_string(report.remaining_quantity));
        orders.insert(cloid.clone(), control_core::payload::CanonicalValue::Map(entry));
    }

    let mut root = CanonicalMap::new();
    root.insert("positions", control_core::payload::CanonicalValue::Map(positions))
        .insert("orders", control_core::payload::CanonicalValue::Map(orders))
        .insert("system_status", state.system_status.to_string())
        .insert("gap_count", state.gap_count as i64);
    root
}

/// SHA-256 hex digest of the canonical encoding's JSON serialisation. JSON serialisation of
/// a `BTreeMap`-backed [`CanonicalMap`] is itself order-independent, so this is stable across
/// insertion order and process/language.
pub fn hash_state(state: &ReplayState) -> String {
    let canonical = canonicalize(state);
    let bytes = serde_json::to_vec(&canonical).expect("canonical map always serialises");
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use control_core::model::SystemStatus;
    use rust_decimal_macros::dec;

    #[test]
    fn hash_is_independent_of_position_insertion_order() {
        let mut a = ReplayState::default();
        a.positions.insert("X".into(), dec!(1));
        a.positions.insert("Y".into(), dec!(2));

        let mut b = ReplayState::default();
        b.positions.insert("Y".into(), dec!(2));
        b.positions.insert("X".into(), dec!(1));

        assert_eq!(hash_state(&a), hash_state(&b));
    }

    #[test]
    fn hash_changes_when_a_position_changes() {
        let mut a = ReplayState::default();
        a.positions.insert("X".into(), dec!(1));

        let mut b = ReplayState::default();
        b.positions.insert("X".into(), dec!(2));

        assert_ne!(hash_state(&a), hash_state(&b));
    }

    #[test]
    fn hash_reflects_system_status_and_gap_count() {
        let mut a = ReplayState::default();
        a.system_status = SystemStatus::Connected;
        let mut b = ReplayState::default();
        b.system_status = SystemStatus::Degraded;
        assert_ne!(hash_state(&a), hash_state(&b));

        let mut c = ReplayState::default();
        c.gap_count = 1;
        assert_ne!(hash_state(&a), hash_state(&c));
    }
}
