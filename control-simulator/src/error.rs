use thiserror::Error;

/// All errors generated in `control-simulator`.
#[derive(Debug, Error)]
pub enum SimulatorError {
    /// Spec 7: `MALFORMED_JOURNAL` — the whole run fails; never silently skipped.
    #[error("malformed journal, replay aborted: {0}")]
    MalformedJournal(#[from] control_core::CoreError),

    #[error("decimal arithmetic trapped during replay: {0}")]
    Decimal(#[from] control_core::decimal::DecimalError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("reference hash log malformed: {0}")]
    ReferenceHashLog(String),
}
