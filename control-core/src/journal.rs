//! Append-only, line-delimited write-ahead event log (spec 4.2 / 6).
//!
//! One self-describing JSON record per line. Durability is flush-on-newline: [`Journal::append`]
//! does not return until the line (including its trailing `\n`) has been handed to the OS via
//! `write_all` + `flush`, so a crash after `append` returns always leaves the record recoverable
//! and a crash before it leaves the event un-observed, never half-written.

use crate::{error::CoreError, payload::CanonicalMap};
use serde::{Deserialize, Serialize};
use std::{
    fs::{File, OpenOptions},
    io::{BufRead, BufReader, Write},
    path::Path,
};

/// Sum type over the four kinds of journal record (spec 3).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventType {
    Packet,
    StatusChange,
    Error,
    Gap,
}

/// A single append-only record. Entries are never mutated once written and are
/// self-contained: replay needs only file order, never cross-entry references.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct JournalEntry {
    pub event_type: EventType,
    pub timestamp: i64,
    pub data: CanonicalMap,
}

impl JournalEntry {
    pub fn new(event_type: EventType, timestamp: i64, data: CanonicalMap) -> Self {
        Self {
            event_type,
            timestamp,
            data,
        }
    }
}

/// Append-exclusive writer over a single journal file. Only one [`Journal`] should hold a
/// given path open for writing at a time (spec 5: "the journal file is append-exclusive").
#[derive(Debug)]
pub struct Journal {
    file: File,
}

impl Journal {
    /// Opens `path` for appending, creating it if it does not exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self { file })
    }

    /// Appends `entry` and blocks until it is durable (flush-on-newline). Serialises to a
    /// single line so that a torn write can only ever be detected as a malformed trailing
    /// line on replay, never silently merged with the next record.
    pub fn append(&mut self, entry: &JournalEntry) -> Result<(), CoreError> {
        let mut line = serde_json::to_string(entry).map_err(|e| CoreError::MalformedRecord {
            line: 0,
            reason: e.to_string(),
        })?;
        line.push('\n');
        self.file.write_all(line.as_bytes())?;
        self.file.flush()?;
        Ok(())
    }
}

/// Replays `path` and yields entries in file (append) order.
///
/// Empty lines are skipped. A malformed line logs a loud warning and is skipped rather than
/// aborting the whole replay, matching the journal reader contract in spec 6. Callers that
/// must treat a malformed record as fatal (the Simulator, per `MALFORMED_JOURNAL` in spec 7)
/// should use [`replay_strict`] instead.
pub fn replay(path: impl AsRef<Path>) -> Result<Vec<JournalEntry>, CoreError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut entries = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<JournalEntry>(&line) {
            Ok(entry) => entries.push(entry),
            Err(err) => {
                tracing::warn!(line_number = idx + 1, error = %err, "skipping malformed journal record");
            }
        }
    }

    Ok(entries)
}

/// As [`replay`], but fails the whole run on the first malformed line rather than skipping
/// it. Used by the Simulator, for which a record it cannot parse is `MALFORMED_JOURNAL`
/// (spec 7): never silently skipped.
pub fn replay_strict(path: impl AsRef<Path>) -> Result<Vec<JournalEntry>, CoreError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut entries = Vec::with_capacity(1024);

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let entry = serde_json::from_str::<JournalEntry>(&line).map_err(|err| {
            CoreError::MalformedRecord {
                line: idx + 1,
                reason: err.to_string(),
            }
        })?;
        entries.push(entry);
    }

    Ok(entries)
}
