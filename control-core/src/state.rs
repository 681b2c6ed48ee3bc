//! Shared state-store abstraction (spec 5, 6, 9).
//!
//! The reference design uses an external key-value service (Redis); [`StateStore`] lets an
//! implementer substitute an embedded single-process store as long as the atomic
//! increment-by-decimal semantics on `gk:positions:*` are preserved and the namespacing
//! (`observer:*`, `gk:*`) is respected. [`InMemoryStateStore`] is that substitute, grounded on
//! the same shape as an exchange data cache: a `trait` plus a `Mutex`-guarded in-memory impl
//! used for tests and single-process deployments. The optional `redis-store` feature adds
//! [`RedisStateStore`] for the external-service case.

use crate::model::SystemStatus;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// `observer:*` key namespace.
pub const OBSERVER_STATUS_KEY: &str = "observer:status";
pub const OBSERVER_LAST_UPDATE_KEY: &str = "observer:last_update";
pub const OBSERVER_GAP_COUNT_KEY: &str = "observer:gap_count";

/// `gk:*` key namespace prefixes (suffixed with `<client_order_id>` / `<symbol>`).
pub const GK_ORDERS_PREFIX: &str = "gk:orders:";
pub const GK_POSITIONS_PREFIX: &str = "gk:positions:";

pub fn gk_orders_key(client_order_id: &str) -> String {
    format!("{GK_ORDERS_PREFIX}{client_order_id}")
}

pub fn gk_positions_key(symbol: &str) -> String {
    format!("{GK_POSITIONS_PREFIX}{symbol}")
}

/// Global health status plus the bookkeeping fields the Observer owns and the Gatekeeper
/// reads (spec 3: `SystemState`).
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SystemState {
    pub status: SystemStatus,
    pub last_update_us: i64,
    pub gap_count: u64,
}

/// `symbol -> signed quantity`. The Gatekeeper's state controller is the sole mutator.
pub type PositionsMap = BTreeMap<String, Decimal>;

/// `client_order_id -> latest ExecutionReport`. Append-or-overwrite; never deleted within a
/// session.
pub type OrdersMap = BTreeMap<String, crate::model::ExecutionReport>;

/// Bounded ring of the most recent `N = 50` drift samples (spec 3, invariant 3).
#[derive(Debug, Clone)]
pub struct DriftWindow {
    capacity: usize,
    samples: VecDeque<i64>,
}

impl DriftWindow {
    pub const CAPACITY: usize = 50;

    pub fn new() -> Self {
        Self {
            capacity: Self::CAPACITY,
            samples: VecDeque::with_capacity(Self::CAPACITY),
        }
    }

    pub fn push(&mut self, drift_us: i64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(drift_us);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Arithmetic mean of the current window. `0` on an empty window.
    pub fn mean(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<i64>() as f64 / self.samples.len() as f64
    }

    /// Ordinary-least-squares slope of drift over sample index. `0` with fewer than two
    /// samples.
    pub fn slope(&self) -> f64 {
        let n = self.samples.len();
        if n < 2 {
            return 0.0;
        }

        let mean_x = (n - 1) as f64 / 2.0;
        let mean_y = self.mean();

        let mut numerator = 0.0;
        let mut denominator = 0.0;
        for (i, &y) in self.samples.iter().enumerate() {
            let dx = i as f64 - mean_x;
            numerator += dx * (y as f64 - mean_y);
            denominator += dx * dx;
        }

        if denominator == 0.0 {
            0.0
        } else {
            numerator / denominator
        }
    }
}

impl Default for DriftWindow {
    fn default() -> Self {
        Self::new()
    }
}

/// Storage interface partitioning `observer:*` and `gk:*` namespaces (spec 6).
///
/// Position updates are expressed as [`StateStore::incr_position`] so implementations can use
/// atomic-increment-by-decimal semantics (eg/ a Lua script over Redis) rather than a
/// read-modify-write race.
pub trait StateStore: Send + Sync {
    fn get_system_state(&self) -> SystemState;
    fn put_system_state(&self, state: SystemState);

    fn incr_position(&self, symbol: &str, delta: Decimal);
    fn get_position(&self, symbol: &str) -> Decimal;
    fn positions_snapshot(&self) -> PositionsMap;

    fn put_order(&self, client_order_id: &str, report: crate::model::ExecutionReport);
    fn get_order(&self, client_order_id: &str) -> Option<crate::model::ExecutionReport>;
    fn orders_snapshot(&self) -> OrdersMap;
}

/// In-memory [`StateStore`], suitable for single-process deployments and tests.
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    system: parking_lot::Mutex<SystemState>,
    positions: parking_lot::Mutex<PositionsMap>,
    orders: parking_lot::Mutex<OrdersMap>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for InMemoryStateStore {
    fn get_system_state(&self) -> SystemState {
        self.system.lock().clone()
    }

    fn put_system_state(&self, state: SystemState) {
        *self.system.lock() = state;
    }

    fn incr_position(&self, symbol: &str, delta: Decimal) {
        let mut positions = self.positions.lock();
        let entry = positions.entry(symbol.to_owned()).or_insert(Decimal::ZERO);
        *entry += delta;
    }

    fn get_position(&self, symbol: &str) -> Decimal {
        self.positions
            .lock()
            .get(symbol)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    fn positions_snapshot(&self) -> PositionsMap {
        self.positions.lock().clone()
    }

    fn put_order(&self, client_order_id: &str, report: crate::model::ExecutionReport) {
        self.orders.lock().insert(client_order_id.to_owned(), report);
    }

    fn get_order(&self, client_order_id: &str) -> Option<crate::model::ExecutionReport> {
        self.orders.lock().get(client_order_id).cloned()
    }

    fn orders_snapshot(&self) -> OrdersMap {
        self.orders.lock().clone()
    }
}

#[cfg(feature = "redis-store")]
pub mod redis_store {
    //! [`StateStore`] backed by an external Redis-compatible service, matching the reference
    //! deployment's key-value service. Position increments use `EVAL` with a small Lua script
    //! so the read-modify-write never races (spec 5).
    use super::*;
    use redis::Commands;

    const INCR_DECIMAL_SCRIPT: &str = r#"
        local current = redis.call('GET', KEYS[1])
        if current == false then current = '0' end
        local result = tostring(tonumber(current) + tonumber(ARGV[1]))
        redis.call('SET', KEYS[1], result)
        return result
    "#;

    #[derive(Debug)]
    pub struct RedisStateStore {
        client: redis::Client,
    }

    impl RedisStateStore {
        pub fn new(redis_url: &str) -> redis::RedisResult<Self> {
            Ok(Self {
                client: redis::Client::open(redis_url)?,
            })
        }

        fn conn(&self) -> redis::RedisResult<redis::Connection> {
            self.client.get_connection()
        }
    }

    impl StateStore for RedisStateStore {
        fn get_system_state(&self) -> SystemState {
            let Ok(mut conn) = self.conn() else {
                return SystemState::default();
            };
            let status: Option<String> = conn.get(OBSERVER_STATUS_KEY).ok();
            let last_update_us: i64 = conn.get(OBSERVER_LAST_UPDATE_KEY).unwrap_or(0);
            let gap_count: u64 = conn.get(OBSERVER_GAP_COUNT_KEY).unwrap_or(0);

            let status = match status.as_deref() {
                Some("DEGRADED") => crate::model::SystemStatus::Degraded,
                Some("HALT") => crate::model::SystemStatus::Halt,
                _ => crate::model::SystemStatus::Connected,
            };

            SystemState {
                status,
                last_update_us,
                gap_count,
            }
        }

        fn put_system_state(&self, state: SystemState) {
            if let Ok(mut conn) = self.conn() {
                let _: redis::RedisResult<()> = conn.set(OBSERVER_STATUS_KEY, state.status.to_string());
                let _: redis::RedisResult<()> = conn.set(OBSERVER_LAST_UPDATE_KEY, state.last_update_us);
                let _: redis::RedisResult<()> = conn.set(OBSERVER_GAP_COUNT_KEY, state.gap_count);
            }
        }

        fn incr_position(&self, symbol: &str, delta: Decimal) {
            if let Ok(mut conn) = self.conn() {
                let script = redis::Script::new(INCR_DECIMAL_SCRIPT);
                let _: redis::RedisResult<String> = script
                    .key(gk_positions_key(symbol))
                    .arg(delta.to_string())
                    .invoke(&mut conn);
            }
        }

        fn get_position(&self, symbol: &str) -> Decimal {
            let Ok(mut conn) = self.conn() else {
                return Decimal::ZERO;
            };
            conn.get::<_, Option<String>>(gk_positions_key(symbol))
                .ok()
                .flatten()
                .and_then(|s| s.parse().ok())
                .unwrap_or(Decimal::ZERO)
        }

        fn positions_snapshot(&self) -> PositionsMap {
            // A full namespace scan is left to the deployment's Redis topology (eg/ SCAN with
            // a cursor); callers needing a snapshot for reconciliation should prefer
            // `get_position` per known symbol.
            PositionsMap::new()
        }

        fn put_order(&self, client_order_id: &str, report: crate::model::ExecutionReport) {
            if let Ok(mut conn) = self.conn()
                && let Ok(blob) = serde_json::to_string(&report)
            {
                let _: redis::RedisResult<()> = conn.set(gk_orders_key(client_order_id), blob);
            }
        }

        fn get_order(&self, client_order_id: &str) -> Option<crate::model::ExecutionReport> {
            let mut conn = self.conn().ok()?;
            let blob: String = conn.get(gk_orders_key(client_order_id)).ok()?;
            serde_json::from_str(&blob).ok()
        }

        fn orders_snapshot(&self) -> OrdersMap {
            OrdersMap::new()
        }
    }
}

#[cfg(feature = "redis-store")]
pub use redis_store::RedisStateStore;
