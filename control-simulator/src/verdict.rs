//! Replay verdict and divergence reporting (spec 4.5.5).

use control_core::payload::CanonicalMap;
use serde::{Deserialize, Serialize};

/// The first event index at which a replayed state hash differs from its reference, along
/// with up to 10 preceding indices for forensic context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DivergencePoint {
    pub event_index: usize,
    pub expected_hash: String,
    pub actual_hash: String,
    pub event_payload: CanonicalMap,
    /// Up to 10 preceding event indices, ascending.
    pub causal_chain: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub result: VerdictResult,
    pub events_processed: usize,
    pub events_total: usize,
    pub config_hash: String,
    pub rng_seed: u64,
    pub divergence: Option<DivergencePoint>,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VerdictResult {
    Pass,
    Fail,
    Error,
}

impl Verdict {
    /// Process exit code (spec 6): `0` on PASS, `1` on FAIL or ERROR.
    pub fn exit_code(&self) -> i32 {
        match self.result {
            VerdictResult::Pass => 0,
            VerdictResult::Fail | VerdictResult::Error => 1,
        }
    }
}
