#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::type_complexity, clippy::too_many_arguments)]

//! # Control-Observer
//! Ingestion pipeline: one [`ingestor::Ingestor`] task per exchange adapter feeding a bounded
//! queue, a single [`processor::Processor`] consuming it, and [`pipeline::Observer`] wiring
//! the two together with write-ahead journaling and backpressure (spec 4.3, 5).

/// Exchange-adapter boundary: the `Ingestor` trait and nothing concerning its concrete
/// connections (those are out-of-scope external collaborators per spec 1).
pub mod ingestor;

/// Sequence-gap detection keyed by `(source, topic)`.
pub mod sequencer;

/// Single-consumer packet processing: gap detection, drift tracking, health predicates.
pub mod processor;

/// Wires ingestors, the bounded queue and the processor into a runnable `Observer`.
pub mod pipeline;

/// All [`Error`](std::error::Error)s generated in `control-observer`.
pub mod error;

pub use error::ObserverError;
pub use pipeline::Observer;
