//! Core data contract shared by the Observer, Gatekeeper and Simulator (spec section 3).

use crate::{
    clock::EpochUs,
    payload::CanonicalMap,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An immutable, normalised market-data packet produced by an [`Ingestor`](crate) and
/// journaled before it is enqueued for downstream processing.
///
/// Both timestamps share the epoch domain; `drift` is pre-computed at construction so
/// downstream consumers never need to re-derive it from a mismatched pair of clocks.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Packet {
    pub exchange_ts: EpochUs,
    pub local_ts: EpochUs,
    pub source: String,
    pub topic: String,
    pub payload: CanonicalMap,
    pub sequence_id: Option<i64>,
}

impl Packet {
    pub fn new(
        exchange_ts: EpochUs,
        local_ts: EpochUs,
        source: impl Into<String>,
        topic: impl Into<String>,
        payload: CanonicalMap,
        sequence_id: Option<i64>,
    ) -> Self {
        Self {
            exchange_ts,
            local_ts,
            source: source.into(),
            topic: topic.into(),
            payload,
            sequence_id,
        }
    }

    /// Signed drift in microseconds: `exchange_ts - local_ts`.
    pub fn drift_us(&self) -> i64 {
        EpochUs::drift(self.exchange_ts, self.local_ts)
    }

    pub fn key(&self) -> (String, String) {
        (self.source.clone(), self.topic.clone())
    }
}

/// Side of an order or fill.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// `signed(q, BUY) = +q`, `signed(q, SELL) = -q` (spec 4.4.4).
    pub fn signed(self, quantity: Decimal) -> Decimal {
        match self {
            Side::Buy => quantity,
            Side::Sell => -quantity,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub enum OrderType {
    Limit,
    Market,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub enum TimeInForce {
    Gtc,
    Ioc,
    Fok,
}

/// A strategy-submitted order intent. Immutable once constructed; the Gatekeeper's
/// [`CommandRegistry`](crate) is the only place a `client_order_id` is ever inspected
/// for duplication.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OrderIntent {
    pub client_order_id: String,
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
    pub time_in_force: TimeInForce,
    pub created_ts: EpochUs,
}

/// Exchange order status, authoritative over any locally held view.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub enum ExecStatus {
    New,
    PartialFill,
    Filled,
    Canceled,
    Rejected,
}

impl ExecStatus {
    /// Whether this status carries a fill that should be folded into positions.
    pub fn is_fill(self) -> bool {
        matches!(self, ExecStatus::PartialFill | ExecStatus::Filled)
    }
}

/// An authoritative execution report from the exchange. Never constructed by the Gatekeeper
/// itself; only consumed.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ExecutionReport {
    pub client_order_id: String,
    pub exchange_order_id: String,
    pub symbol: String,
    pub side: Side,
    pub status: ExecStatus,
    pub filled_quantity: Decimal,
    pub last_filled_price: Option<Decimal>,
    pub remaining_quantity: Decimal,
    pub exchange_ts: EpochUs,
}

/// Global health status, owned by the Observer; read by the Gatekeeper and operators.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default, Deserialize, Serialize)]
pub enum SystemStatus {
    #[default]
    Connected,
    Degraded,
    Halt,
}

impl SystemStatus {
    /// Returns `true` if `self -> next` is a valid edge in the status DAG
    /// (`CONNECTED -> DEGRADED`, `CONNECTED -> HALT`, `DEGRADED -> HALT`). `HALT` has no
    /// outgoing edges within a session.
    pub fn can_transition_to(self, next: SystemStatus) -> bool {
        use SystemStatus::*;
        matches!(
            (self, next),
            (Connected, Degraded) | (Connected, Halt) | (Degraded, Halt)
        )
    }
}

impl std::fmt::Display for SystemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SystemStatus::Connected => "CONNECTED",
            SystemStatus::Degraded => "DEGRADED",
            SystemStatus::Halt => "HALT",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_quantity_flips_sign_for_sell() {
        assert_eq!(Side::Sell.signed(Decimal::ONE), -Decimal::ONE);
        assert_eq!(Side::Buy.signed(Decimal::ONE), Decimal::ONE);
    }

    #[test]
    fn status_dag_forbids_reverse_and_skip_edges() {
        assert!(SystemStatus::Connected.can_transition_to(SystemStatus::Degraded));
        assert!(SystemStatus::Connected.can_transition_to(SystemStatus::Halt));
        assert!(SystemStatus::Degraded.can_transition_to(SystemStatus::Halt));
        assert!(!SystemStatus::Degraded.can_transition_to(SystemStatus::Connected));
        assert!(!SystemStatus::Halt.can_transition_to(SystemStatus::Connected));
        assert!(!SystemStatus::Halt.can_transition_to(SystemStatus::Degraded));
    }

    #[test]
    fn packet_drift_matches_epoch_subtraction() {
        let packet = Packet::new(
            EpochUs(1_000_500),
            EpochUs(1_000_000),
            "binance",
            "trades",
            CanonicalMap::new(),
            Some(1),
        );
        assert_eq!(packet.drift_us(), 500);
    }
}
