//! Single-consumer packet processor: gap detection, drift tracking, health predicates and
//! status transitions (spec 4.3.1, 4.3.2, 4.3.3).

use crate::sequencer::{SequenceOutcome, SequenceTracker};
use control_core::{
    clock::EpochUs,
    journal::{EventType, Journal, JournalEntry},
    model::{Packet, SystemStatus},
    payload::CanonicalMap,
    state::{DriftWindow, StateStore, SystemState},
};
use std::sync::Arc;
use tracing::{info, warn};

/// `|mean drift| > 500ms` trips `HALT` (spec 4.3.2).
pub const DRIFT_HALT_THRESHOLD_US: f64 = 500_000.0;

/// Processes packets one at a time, mutating [`SystemState`] and journaling every status
/// transition, gap, and drift violation it observes. Never rewinds itself on a drift
/// violation: it freezes (`HALT`) and keeps journaling, giving operators a stable forensic
/// surface (spec 4.3.2).
pub struct Processor {
    store: Arc<dyn StateStore>,
    journal: Arc<parking_lot::Mutex<Journal>>,
    sequences: SequenceTracker,
    drift: DriftWindow,
}

impl Processor {
    pub fn new(store: Arc<dyn StateStore>, journal: Arc<parking_lot::Mutex<Journal>>) -> Self {
        Self {
            store,
            journal,
            sequences: SequenceTracker::new(),
            drift: DriftWindow::new(),
        }
    }

    /// Processes a single packet: gap detection, drift tracking, health evaluation. The
    /// packet's own `PACKET` journal entry is written by the ingestor for write-ahead safety
    /// (spec 4.2); this only writes the entries the packet's *evaluation* produces.
    pub fn process(&mut self, packet: &Packet) {
        self.check_sequence(packet);
        self.track_drift(packet);
        self.refresh_heartbeat(packet.local_ts);
    }

    fn check_sequence(&mut self, packet: &Packet) {
        let Some(sequence_id) = packet.sequence_id else {
            return;
        };

        match self.sequences.observe(packet.key(), sequence_id) {
            SequenceOutcome::First | SequenceOutcome::InOrder => {}
            SequenceOutcome::Duplicate => {
                warn!(source = %packet.source, topic = %packet.topic, sequence_id, "duplicate sequence id, skipping");
            }
            SequenceOutcome::OutOfOrder => {
                warn!(source = %packet.source, topic = %packet.topic, sequence_id, "out-of-order sequence id");
            }
            SequenceOutcome::Gap {
                expected,
                got,
                gap,
            } => {
                warn!(source = %packet.source, topic = %packet.topic, expected, got, gap, "sequence gap detected");
                self.journal_gap(packet, expected, got, gap);

                let mut state = self.store.get_system_state();
                state.gap_count += 1;
                let promoted = state.status == SystemStatus::Connected;
                if promoted {
                    state.status = SystemStatus::Degraded;
                }
                self.store.put_system_state(state);

                if promoted {
                    self.journal_status_change(
                        packet.local_ts,
                        SystemStatus::Connected,
                        SystemStatus::Degraded,
                        "sequence gap detected",
                    );
                }
            }
        }
    }

    fn track_drift(&mut self, packet: &Packet) {
        self.drift.push(packet.drift_us());

        if self.drift.len() < DriftWindow::CAPACITY {
            return;
        }

        let mean = self.drift.mean();
        if mean.abs() <= DRIFT_HALT_THRESHOLD_US {
            return;
        }

        let state = self.store.get_system_state();
        if state.status == SystemStatus::Halt {
            return;
        }

        let from = state.status;
        self.store.put_system_state(SystemState {
            status: SystemStatus::Halt,
            ..state
        });

        warn!(mean, threshold = DRIFT_HALT_THRESHOLD_US, "drift HALT predicate tripped");
        self.journal_status_change(
            packet.local_ts,
            from,
            SystemStatus::Halt,
            &format!("drift mean {mean:.0}us exceeds {DRIFT_HALT_THRESHOLD_US:.0}us"),
        );
    }

    fn refresh_heartbeat(&self, local_ts: EpochUs) {
        let mut state = self.store.get_system_state();
        state.last_update_us = local_ts.0;
        self.store.put_system_state(state);
    }

    /// Propagates a [`crate::error::ObserverError::StreamFailure`] into a `HALT` transition
    /// (spec 4.3: "failure propagates out of the stream and causes the Observer to
    /// transition to HALT").
    pub fn on_stream_failure(&self, at: EpochUs, source_id: &str, reason: &str) {
        let state = self.store.get_system_state();
        let from = state.status;
        if from == SystemStatus::Halt {
            return;
        }

        self.store.put_system_state(SystemState {
            status: SystemStatus::Halt,
            ..state
        });

        let mut data = CanonicalMap::new();
        data.insert("source_id", source_id).insert("reason", reason);
        self.append(JournalEntry::new(EventType::Error, at.0, data));
        self.journal_status_change(at, from, SystemStatus::Halt, reason);
        info!(source_id, reason, "observer HALT due to stream failure");
    }

    fn journal_gap(&self, packet: &Packet, expected: i64, got: i64, gap: i64) {
        let mut data = CanonicalMap::new();
        data.insert("source", packet.source.as_str())
            .insert("topic", packet.topic.as_str())
            .insert("expected", expected)
            .insert("got", got)
            .insert("gap", gap);
        self.append(JournalEntry::new(EventType::Gap, packet.local_ts.0, data));
    }

    fn journal_status_change(
        &self,
        at: EpochUs,
        from: SystemStatus,
        to: SystemStatus,
        reason: &str,
    ) {
        let mut data = CanonicalMap::new();
        data.insert("from", from.to_string())
            .insert("to", to.to_string())
            .insert("reason", reason);
        self.append(JournalEntry::new(EventType::StatusChange, at.0, data));
    }

    fn append(&self, entry: JournalEntry) {
        if let Err(err) = self.journal.lock().append(&entry) {
            tracing::error!(%err, "failed to append journal entry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use control_core::state::InMemoryStateStore;
    use std::io::Write;

    fn processor() -> (Processor, std::path::PathBuf) {
        let path = std::env::temp_dir().join(format!(
            "control-observer-processor-test-{}-{}",
            std::process::id(),
            COUNTER.fetch_add(1, std::sync::atomic::Ordering::Relaxed)
        ));
        std::fs::File::create(&path).unwrap().flush().unwrap();
        let journal = Arc::new(parking_lot::Mutex::new(Journal::open(&path).unwrap()));
        let store: Arc<dyn StateStore> = Arc::new(InMemoryStateStore::new());
        (Processor::new(store, journal), path)
    }

    static COUNTER: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);

    fn packet(seq: Option<i64>, drift: i64) -> Packet {
        Packet::new(
            EpochUs(1_000_000 + drift),
            EpochUs(1_000_000),
            "e",
            "t",
            CanonicalMap::new(),
            seq,
        )
    }

    #[test]
    fn sequence_gap_promotes_connected_to_degraded() {
        let (mut processor, _path) = processor();
        processor.process(&packet(Some(1), 0));
        processor.process(&packet(Some(2), 0));
        processor.process(&packet(Some(5), 0));

        let state = processor.store.get_system_state();
        assert_eq!(state.status, SystemStatus::Degraded);
        assert_eq!(state.gap_count, 1);
    }

    #[test]
    fn fifty_samples_of_large_drift_trips_halt() {
        let (mut processor, _path) = processor();
        for _ in 0..50 {
            processor.process(&packet(None, 600_000));
        }
        assert_eq!(processor.store.get_system_state().status, SystemStatus::Halt);
    }

    #[test]
    fn observer_keeps_journaling_after_halt() {
        let (mut processor, path) = processor();
        for _ in 0..50 {
            processor.process(&packet(None, 600_000));
        }
        // A subsequent packet should still be processable without panicking, and the
        // journal file should contain more than zero bytes (status-change entries).
        processor.process(&packet(None, 600_000));
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn stream_failure_halts_from_connected() {
        let (processor, _path) = processor();
        processor.on_stream_failure(EpochUs(1), "binance", "ws closed");
        assert_eq!(processor.store.get_system_state().status, SystemStatus::Halt);
    }
}
