use thiserror::Error;

/// Reasons the Execution Guard refused a submission before it reached state mutation
/// (spec 4.4.2, 7). Never mutates state.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum HardBlockReason {
    #[error("safe mode is active")]
    SafeModeActive,

    #[error("observer status is {0}, require CONNECTED")]
    ObserverNotConnected(String),

    #[error("heartbeat stale: {age_us}us since last update, limit {limit_us}us")]
    HeartbeatStale { age_us: i64, limit_us: i64 },

    #[error("rate limit exceeded")]
    RateLimited,
}

/// All errors generated in `control-gatekeeper`.
#[derive(Debug, Error)]
pub enum GatekeeperError {
    #[error("HARD_BLOCK: {0}")]
    HardBlock(#[from] HardBlockReason),

    #[error(transparent)]
    Core(#[from] control_core::CoreError),
}
