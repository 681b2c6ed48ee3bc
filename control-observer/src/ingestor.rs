//! Ingestor boundary: one per exchange adapter (spec 4.3, out of scope in 1: the adapters
//! themselves are external collaborators; only the interface the core requires is fixed here).

use crate::error::ObserverError;
use control_core::model::Packet;
use futures::Stream;
use std::pin::Pin;

/// Boxed, pinned stream of packets: the object-safe return type every [`Ingestor`] converts
/// itself into, so the pipeline can hold a homogeneous `Vec<Box<dyn Ingestor>>`.
pub type PacketStream = Pin<Box<dyn Stream<Item = Result<Packet, ObserverError>> + Send>>;

/// A lazy asynchronous sequence of [`Packet`]s from a single exchange adapter.
///
/// Implementors own their connection lifecycle and MUST surface any stream failure through
/// an `Err` item rather than silently reconnecting: silent reconnection without journaling
/// is forbidden (spec 4.3.1). A `None` terminates the stream, e.g. on a clean adapter
/// shutdown.
///
/// `into_stream` takes `self: Box<Self>` and returns a boxed, pinned stream rather than
/// `impl Stream` so the trait stays dyn-compatible: the pipeline only ever holds ingestors
/// as `Box<dyn Ingestor>`.
pub trait Ingestor: Send {
    /// Stable identifier used as the `source` half of the `(source, topic)` sequencing key.
    fn source_id(&self) -> &str;

    fn into_stream(self: Box<Self>) -> PacketStream;
}
