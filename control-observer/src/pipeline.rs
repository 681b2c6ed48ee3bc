//! Observer pipeline: one ingestor task per exchange adapter feeding a bounded queue, and a
//! single processor task consuming it (spec 4.3, 5).

use crate::{error::ObserverError, ingestor::Ingestor, processor::Processor};
use control_core::{
    clock::EpochUs,
    journal::{EventType, Journal, JournalEntry},
    payload::CanonicalMap,
    state::StateStore,
};
use futures::StreamExt;
use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Bounded queue capacity between ingestors and the processor. Full queue means ingestors
/// block; packets are never dropped (spec 5).
pub const DEFAULT_QUEUE_CAPACITY: usize = 1_024;

/// Deadline the pipeline waits for the queue to drain on shutdown before closing the
/// journal regardless (spec 5: "drains the queue up to a bounded deadline").
pub const SHUTDOWN_DRAIN_DEADLINE: Duration = Duration::from_secs(5);

/// Owns the bounded queue and journal shared by every ingestor task and the single
/// processor task.
pub struct Observer {
    journal: Arc<parking_lot::Mutex<Journal>>,
    store: Arc<dyn StateStore>,
    queue_capacity: usize,
}

impl Observer {
    pub fn new(journal: Journal, store: Arc<dyn StateStore>) -> Self {
        control_core::decimal::DecimalContext::init();
        Self {
            journal: Arc::new(parking_lot::Mutex::new(journal)),
            store,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Runs every ingestor concurrently and a single processor task until every ingestor
    /// stream has ended or a stream failure halts the system, then drains and shuts down.
    pub async fn run(self, ingestors: Vec<Box<dyn Ingestor>>) -> Result<(), ObserverError> {
        let (tx, mut rx) = mpsc::channel(self.queue_capacity);
        let processor_journal = Arc::clone(&self.journal);
        let processor_store = Arc::clone(&self.store);

        let mut ingestor_handles = Vec::new();
        for ingestor in ingestors {
            let tx = tx.clone();
            let journal = Arc::clone(&self.journal);
            let store = Arc::clone(&self.store);
            let source_id = ingestor.source_id().to_owned();
            ingestor_handles.push(tokio::spawn(run_ingestor(
                ingestor, tx, journal, store, source_id,
            )));
        }
        drop(tx);

        let processor_handle = tokio::spawn(async move {
            let mut processor = Processor::new(processor_store, processor_journal);
            while let Some(packet) = rx.recv().await {
                processor.process(&packet);
            }
            processor
        });

        for handle in ingestor_handles {
            if let Err(join_err) = handle.await {
                error!(%join_err, "ingestor task panicked");
            }
        }

        match tokio::time::timeout(SHUTDOWN_DRAIN_DEADLINE, processor_handle).await {
            Ok(Ok(_processor)) => {}
            Ok(Err(join_err)) => error!(%join_err, "processor task panicked"),
            Err(_) => warn!("processor did not drain within shutdown deadline"),
        }

        self.halt_on_shutdown();
        Ok(())
    }

    /// Transitions to `HALT` on SIGINT/SIGTERM (spec 5). Idempotent if already halted.
    fn halt_on_shutdown(&self) {
        let mut state = self.store.get_system_state();
        if state.status == control_core::model::SystemStatus::Halt {
            return;
        }
        let from = state.status;
        state.status = control_core::model::SystemStatus::Halt;
        self.store.put_system_state(state);

        let mut data = CanonicalMap::new();
        data.insert("from", from.to_string())
            .insert("to", "HALT")
            .insert("reason", "shutdown");
        if let Err(err) = self
            .journal
            .lock()
            .append(&JournalEntry::new(EventType::StatusChange, 0, data))
        {
            error!(%err, "failed to journal shutdown HALT transition");
        }
        info!("observer HALT on shutdown");
    }
}

async fn run_ingestor(
    ingestor: Box<dyn Ingestor>,
    tx: mpsc::Sender<control_core::model::Packet>,
    journal: Arc<parking_lot::Mutex<Journal>>,
    store: Arc<dyn StateStore>,
    source_id: String,
) {
    let mut stream = ingestor.into_stream();

    while let Some(item) = stream.next().await {
        match item {
            Ok(packet) => {
                journal_packet(&journal, &packet);
                // Bounded send: backpressure, never dropped.
                if tx.send(packet).await.is_err() {
                    break;
                }
            }
            Err(err) => {
                warn!(source_id, %err, "ingestor stream failure, propagating");
                halt_due_to_stream_failure(&store, &journal, &source_id, &err.to_string());
                break;
            }
        }
    }
}

/// A stream failure is never silently retried inside the core: it halts immediately and is
/// journaled as both an `ERROR` record and a `STATUS_CHANGE` (spec 4.3, 7).
fn halt_due_to_stream_failure(
    store: &Arc<dyn StateStore>,
    journal: &Arc<parking_lot::Mutex<Journal>>,
    source_id: &str,
    reason: &str,
) {
    let mut state = store.get_system_state();
    let from = state.status;
    if from == control_core::model::SystemStatus::Halt {
        return;
    }
    state.status = control_core::model::SystemStatus::Halt;
    store.put_system_state(state);

    journal_error(journal, source_id, reason);

    let mut data = CanonicalMap::new();
    data.insert("from", from.to_string())
        .insert("to", "HALT")
        .insert("reason", reason);
    if let Err(err) = journal
        .lock()
        .append(&JournalEntry::new(EventType::StatusChange, 0, data))
    {
        error!(%err, "failed to journal stream-failure HALT transition");
    }
}

fn journal_packet(journal: &Arc<parking_lot::Mutex<Journal>>, packet: &control_core::model::Packet) {
    let mut data = CanonicalMap::new();
    data.insert("source", packet.source.as_str())
        .insert("topic", packet.topic.as_str())
        .insert("exchange_ts", packet.exchange_ts.0)
        .insert("local_ts", packet.local_ts.0);
    if let Some(seq) = packet.sequence_id {
        data.insert("sequence_id", seq);
    }
    if let Err(err) = journal
        .lock()
        .append(&JournalEntry::new(EventType::Packet, packet.local_ts.0, data))
    {
        error!(%err, "failed to journal packet (write-ahead)");
    }
}

fn journal_error(journal: &Arc<parking_lot::Mutex<Journal>>, source_id: &str, reason: &str) {
    let mut data = CanonicalMap::new();
    data.insert("source_id", source_id).insert("reason", reason);
    if let Err(err) = journal
        .lock()
        .append(&JournalEntry::new(EventType::Error, 0, data))
    {
        error!(%err, "failed to journal stream failure");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestor::test_support::ScriptedIngestor;
    use control_core::{model::Packet, state::InMemoryStateStore};

    fn tempfile() -> std::path::PathBuf {
        std::env::temp_dir().join(format!(
            "control-observer-pipeline-test-{}-{}",
            std::process::id(),
            COUNTER.fetch_add(1, std::sync::atomic::Ordering::Relaxed)
        ))
    }
    static COUNTER: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);

    #[tokio::test]
    async fn packets_are_journaled_before_processing_completes() {
        let path = tempfile();
        let journal = Journal::open(&path).unwrap();
        let store: Arc<dyn StateStore> = Arc::new(InMemoryStateStore::new());
        let observer = Observer::new(journal, Arc::clone(&store));

        let packet = Packet::new(
            EpochUs(1),
            EpochUs(1),
            "e",
            "t",
            CanonicalMap::new(),
            Some(1),
        );
        let ingestor = Box::new(ScriptedIngestor {
            source_id: "e".into(),
            script: vec![Ok(packet)],
        });

        observer.run(vec![ingestor]).await.unwrap();

        let entries = control_core::journal::replay(&path).unwrap();
        assert!(entries.iter().any(|e| e.event_type == EventType::Packet));
        // Shutdown path journals a final HALT transition.
        assert!(entries.iter().any(|e| e.event_type == EventType::StatusChange));
    }

    #[tokio::test]
    async fn stream_failure_halts_and_is_journaled() {
        let path = tempfile();
        let journal = Journal::open(&path).unwrap();
        let store: Arc<dyn StateStore> = Arc::new(InMemoryStateStore::new());
        let observer = Observer::new(journal, Arc::clone(&store));

        let ingestor = Box::new(ScriptedIngestor {
            source_id: "e".into(),
            script: vec![Err(ObserverError::StreamFailure {
                source_id: "e".into(),
                reason: "disconnected".into(),
            })],
        });

        observer.run(vec![ingestor]).await.unwrap();

        assert_eq!(
            store.get_system_state().status,
            control_core::model::SystemStatus::Halt
        );
    }
}
