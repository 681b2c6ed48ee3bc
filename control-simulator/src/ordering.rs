//! Deterministic event ordering (spec 4.5.2): sort by
//! `(local_arrival_ts, sequence_id_or_+inf, source_priority)`, a total order even under ties
//! and across sources.

use control_core::journal::{EventType, JournalEntry};

/// Source priority: WS streams = 1, REST snapshots = 2, all else = 3 (spec 4.5.2).
///
/// The journal payload carries a `source_kind` field set by the ingestor; entries without
/// one (eg/ `STATUS_CHANGE`, `ERROR`, `GAP`) default to the lowest priority (3) since they
/// carry no market-data provenance to rank by.
fn source_priority(entry: &JournalEntry) -> u8 {
    match entry.data.get("source_kind") {
        Some(control_core::payload::CanonicalValue::String(kind)) if kind == "ws" => 1,
        Some(control_core::payload::CanonicalValue::String(kind)) if kind == "rest" => 2,
        _ => 3,
    }
}

fn sequence_id_or_inf(entry: &JournalEntry) -> i64 {
    match entry.data.get("sequence_id") {
        Some(control_core::payload::CanonicalValue::Int(seq)) => *seq,
        _ => i64::MAX,
    }
}

/// Sorts `entries` into the total order required for replay. Stable sort preserves append
/// order for entries that compare fully equal, which matches "deterministic event ordering"
/// since append order is itself deterministic within a single journal file.
pub fn sort_for_replay(mut entries: Vec<JournalEntry>) -> Vec<JournalEntry> {
    entries.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| sequence_id_or_inf(a).cmp(&sequence_id_or_inf(b)))
            .then_with(|| source_priority(a).cmp(&source_priority(b)))
    });
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use control_core::payload::CanonicalMap;

    fn packet(ts: i64, seq: Option<i64>, kind: &str) -> JournalEntry {
        let mut data = CanonicalMap::new();
        if let Some(seq) = seq {
            data.insert("sequence_id", seq);
        }
        data.insert("source_kind", kind);
        JournalEntry::new(EventType::Packet, ts, data)
    }

    #[test]
    fn sorts_by_timestamp_first() {
        let entries = vec![packet(2, None, "ws"), packet(1, None, "ws")];
        let sorted = sort_for_replay(entries);
        assert_eq!(sorted[0].timestamp, 1);
        assert_eq!(sorted[1].timestamp, 2);
    }

    #[test]
    fn ties_break_on_sequence_id_then_source_priority() {
        let entries = vec![
            packet(1, Some(2), "ws"),
            packet(1, None, "rest"),
            packet(1, Some(1), "ws"),
        ];
        let sorted = sort_for_replay(entries);
        let seqs: Vec<_> = sorted
            .iter()
            .map(|e| match e.data.get("sequence_id") {
                Some(control_core::payload::CanonicalValue::Int(s)) => Some(*s),
                _ => None,
            })
            .collect();
        assert_eq!(seqs, vec![Some(1), Some(2), None]);
    }

    #[test]
    fn ordering_is_a_total_order_independent_of_input_order() {
        let a = vec![packet(1, Some(1), "ws"), packet(1, Some(2), "ws"), packet(2, None, "ws")];
        let mut b = a.clone();
        b.reverse();

        let sorted_a = sort_for_replay(a);
        let sorted_b = sort_for_replay(b);

        let ts_a: Vec<_> = sorted_a.iter().map(|e| e.timestamp).collect();
        let ts_b: Vec<_> = sorted_b.iter().map(|e| e.timestamp).collect();
        assert_eq!(ts_a, ts_b);
    }
}
