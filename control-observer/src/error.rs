use thiserror::Error;

/// All errors generated in `control-observer`.
#[derive(Debug, Error)]
pub enum ObserverError {
    /// An exchange stream raised an error. This propagates out of the ingestor and causes
    /// the Observer to transition to `HALT` (spec 4.3, 7). Never silently retried inside the
    /// core; reconnection belongs to the adapter boundary.
    #[error("stream failure on source {source_id}: {reason}")]
    StreamFailure { source_id: String, reason: String },

    #[error(transparent)]
    Core(#[from] control_core::CoreError),
}
