use thiserror::Error;

/// All [`Error`](std::error::Error)s generated in `control-core`.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("journal io error: {0}")]
    JournalIo(#[from] std::io::Error),

    #[error("malformed journal record at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    #[error("decimal arithmetic trapped: {0}")]
    Decimal(#[from] crate::decimal::DecimalError),

    #[error("state store error: {0}")]
    StateStore(String),
}
