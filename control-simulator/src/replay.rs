//! The strictly synchronous replay loop (spec 4.5.3): `apply` is a pure function of
//! `(event, state)`; no concurrency is permitted anywhere inside it.

use crate::{
    config::SimulatorConfig,
    error::SimulatorError,
    hash::hash_state,
    ordering::sort_for_replay,
    verdict::{DivergencePoint, Verdict, VerdictResult},
};
use control_core::{
    journal::{replay_strict, EventType, JournalEntry},
    model::{ExecStatus, ExecutionReport, Side, SystemStatus},
    payload::CanonicalValue,
    state::{OrdersMap, PositionsMap},
};
use rand::{rngs::StdRng, SeedableRng};
use std::collections::BTreeMap;

/// `GAP` entries promote `CONNECTED -> DEGRADED` once the cumulative count exceeds this
/// (spec 4.5.3).
pub const GAP_DEGRADE_THRESHOLD: u64 = 5;

/// Replayed state trajectory at a single point in time (spec 4.5.4).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplayState {
    pub positions: PositionsMap,
    pub orders: OrdersMap,
    pub system_status: SystemStatus,
    pub gap_count: u64,
}

/// How many preceding event indices to retain for a [`DivergencePoint`]'s causal chain.
const CAUSAL_CHAIN_LEN: usize = 10;

/// Pure function of `(event, state)`: mirrors
/// [`control_gatekeeper::state_controller::fold_fill`] exactly (same sign convention, same
/// decimal arithmetic, same rounding) so the replayed trajectory matches what the live
/// Gatekeeper produced.
pub fn apply(entry: &JournalEntry, state: &mut ReplayState) -> Result<(), SimulatorError> {
    match entry.event_type {
        EventType::Packet => {
            if let Some(report) = extract_execution_report(entry) {
                control_gatekeeper::state_controller::fold_fill(&mut state.positions, &report)?;
                state.orders.insert(report.client_order_id.clone(), report);
            }
        }
        EventType::StatusChange => {
            if let Some(CanonicalValue::String(to)) = entry.data.get("to") {
                if let Some(status) = parse_status(to) {
                    state.system_status = status;
                }
            }
        }
        EventType::Gap => {
            state.gap_count += 1;
            if state.gap_count > GAP_DEGRADE_THRESHOLD && state.system_status == SystemStatus::Connected {
                state.system_status = SystemStatus::Degraded;
            }
        }
        EventType::Error => {
            if let Some(CanonicalValue::String(kind)) = entry.data.get("error_type") {
                if kind == "CRITICAL" {
                    state.system_status = SystemStatus::Halt;
                }
            }
        }
    }
    Ok(())
}

fn parse_status(s: &str) -> Option<SystemStatus> {
    match s {
        "CONNECTED" => Some(SystemStatus::Connected),
        "DEGRADED" => Some(SystemStatus::Degraded),
        "HALT" => Some(SystemStatus::Halt),
        _ => None,
    }
}

/// Extracts an embedded `ExecutionReport` from a `PACKET` entry's `execution_report` field,
/// if present. Packets that are plain market data (no embedded report) return `None` and
/// leave `state` untouched for this entry.
fn extract_execution_report(entry: &JournalEntry) -> Option<ExecutionReport> {
    let CanonicalValue::Map(report) = entry.data.get("execution_report")? else {
        return None;
    };

    let client_order_id = string_field(report, "client_order_id")?;
    let exchange_order_id = string_field(report, "exchange_order_id")?;
    let symbol = string_field(report, "symbol")?;
    let side = match string_field(report, "side")?.as_str() {
        "BUY" => Side::Buy,
        "SELL" => Side::Sell,
        _ => return None,
    };
    let status = match string_field(report, "status")?.as_str() {
        "NEW" => ExecStatus::New,
        "PARTIAL_FILL" => ExecStatus::PartialFill,
        "FILLED" => ExecStatus::Filled,
        "CANCELED" => ExecStatus::Canceled,
        "REJECTED" => ExecStatus::Rejected,
        _ => return None,
    };
    let filled_quantity = decimal_field(report, "filled_quantity")?;
    let remaining_quantity = decimal_field(report, "remaining_quantity")?;
    let last_filled_price = decimal_field(report, "last_filled_price");

    Some(ExecutionReport {
        client_order_id,
        exchange_order_id,
        symbol,
        side,
        status,
        filled_quantity,
        last_filled_price,
        remaining_quantity,
        exchange_ts: control_core::clock::EpochUs(entry.timestamp),
    })
}

fn string_field(map: &control_core::payload::CanonicalMap, key: &str) -> Option<String> {
    match map.get(key)? {
        CanonicalValue::String(s) => Some(s.clone()),
        _ => None,
    }
}

fn decimal_field(map: &control_core::payload::CanonicalMap, key: &str) -> Option<rust_decimal::Decimal> {
    match map.get(key)? {
        CanonicalValue::Decimal(d) => Some(*d),
        CanonicalValue::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Runs the full replay loop: establishes the PRNG (the only source of randomness, unused by
/// `apply` itself but seeded up front so strategies layered on top of the Simulator have a
/// reproducible source), loads and sorts the journal, then applies each event in order,
/// hashing state after every step and comparing against `reference_hashes` if given.
pub fn run(
    config: &SimulatorConfig,
    reference_hashes: Option<&BTreeMap<usize, String>>,
) -> Result<(Verdict, BTreeMap<usize, String>), SimulatorError> {
    control_core::decimal::DecimalContext::init();
    let _rng = StdRng::seed_from_u64(config.seed);

    let entries = replay_strict(&config.journal_path)?;
    let entries = sort_for_replay(entries);
    let events_total = entries.len();

    let mut state = ReplayState::default();
    let mut hash_log = BTreeMap::new();
    let mut history: Vec<usize> = Vec::with_capacity(CAUSAL_CHAIN_LEN);

    for (index, entry) in entries.iter().enumerate() {
        apply(entry, &mut state)?;
        let actual = hash_state(&state);
        hash_log.insert(index, actual.clone());

        if let Some(reference) = reference_hashes.and_then(|r| r.get(&index)) {
            if reference != &actual {
                let causal_chain = history.clone();
                let verdict = Verdict {
                    result: VerdictResult::Fail,
                    events_processed: index + 1,
                    events_total,
                    config_hash: config.config_hash.clone(),
                    rng_seed: config.seed,
                    divergence: Some(DivergencePoint {
                        event_index: index,
                        expected_hash: reference.clone(),
                        actual_hash: actual,
                        event_payload: entry.data.clone(),
                        causal_chain,
                    }),
                };
                return Ok((verdict, hash_log));
            }
        }

        history.push(index);
        if history.len() > CAUSAL_CHAIN_LEN {
            history.remove(0);
        }
    }

    let verdict = Verdict {
        result: VerdictResult::Pass,
        events_processed: events_total,
        events_total,
        config_hash: config.config_hash.clone(),
        rng_seed: config.seed,
        divergence: None,
    };
    Ok((verdict, hash_log))
}
