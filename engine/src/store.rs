//! The append-only, replay-capable event store.
//!
//! Appends are linearizable per table: the store assigns each event a
//! strictly increasing per-table sequence. `load` always returns copies;
//! an unknown table is an empty log, never an error.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::EngineError;
use crate::event::Event;
use crate::types::TableId;

pub trait EventStore: Send + Sync {
    /// Append atomically to the table-scoped log, stamping the event's
    /// per-table sequence. Events without a table id are rejected.
    fn append(&self, event: Event) -> Result<Event, EngineError>;

    /// The full ordered log for a table; empty when the table is unknown.
    fn load(&self, table_id: TableId) -> Vec<Event>;
}

/// In-memory store: one vector per table behind a single mutex.
#[derive(Default)]
pub struct MemoryEventStore {
    logs: Mutex<HashMap<TableId, Vec<Event>>>,
}

impl MemoryEventStore {
    pub fn new() -> MemoryEventStore {
        MemoryEventStore::default()
    }
}

impl EventStore for MemoryEventStore {
    fn append(&self, mut event: Event) -> Result<Event, EngineError> {
        let table_id = event.table_id.ok_or(EngineError::MissingTableId)?;
        let mut logs = self.logs.lock().unwrap_or_else(|e| e.into_inner());
        let log = logs.entry(table_id).or_default();
        event.sequence = log.len() as u64 + 1;
        log.push(event.clone());
        Ok(event)
    }

    fn load(&self, table_id: TableId) -> Vec<Event> {
        let logs = self.logs.lock().unwrap_or_else(|e| e.into_inner());
        logs.get(&table_id).cloned().unwrap_or_default()
    }
}

/// Durable store: one line-delimited JSON file per table under `dir`.
pub struct JsonFileEventStore {
    dir: PathBuf,
    /// Next sequence per table; lazily initialized from the file length.
    sequences: Mutex<HashMap<TableId, u64>>,
}

impl JsonFileEventStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<JsonFileEventStore, EngineError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| EngineError::Store(e.to_string()))?;
        Ok(JsonFileEventStore {
            dir,
            sequences: Mutex::new(HashMap::new()),
        })
    }

    fn log_path(&self, table_id: TableId) -> PathBuf {
        self.dir.join(format!("{table_id}.jsonl"))
    }

    fn read_log(&self, table_id: TableId) -> Vec<Event> {
        let file = match fs::File::open(self.log_path(table_id)) {
            Ok(file) => file,
            Err(_) => return Vec::new(),
        };
        let mut events = Vec::new();
        for line in BufReader::new(file).lines() {
            let Ok(line) = line else { break };
            match serde_json::from_str::<Event>(&line) {
                Ok(event) => events.push(event),
                Err(e) => {
                    tracing::warn!(table = %table_id, error = %e, "skipping unreadable event line");
                }
            }
        }
        events
    }
}

impl EventStore for JsonFileEventStore {
    fn append(&self, mut event: Event) -> Result<Event, EngineError> {
        let table_id = event.table_id.ok_or(EngineError::MissingTableId)?;
        let mut sequences = self.sequences.lock().unwrap_or_else(|e| e.into_inner());
        let next = sequences
            .entry(table_id)
            .or_insert_with(|| self.read_log(table_id).len() as u64);
        event.sequence = *next + 1;

        let line =
            serde_json::to_string(&event).map_err(|e| EngineError::Store(e.to_string()))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.log_path(table_id))
            .map_err(|e| EngineError::Store(e.to_string()))?;
        writeln!(file, "{line}").map_err(|e| EngineError::Store(e.to_string()))?;

        *next += 1;
        Ok(event)
    }

    fn load(&self, table_id: TableId) -> Vec<Event> {
        // Hold the sequence lock so a concurrent append is not half-visible.
        let _guard = self.sequences.lock().unwrap_or_else(|e| e.into_inner());
        self.read_log(table_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use crate::types::PlayerId;

    fn event_for(table_id: Option<TableId>) -> Event {
        Event {
            table_id,
            hand_id: None,
            sequence: 0,
            timestamp_ms: 42,
            kind: EventKind::PlayerLeftTable {
                player: PlayerId::new(),
            },
        }
    }

    #[test]
    fn append_assigns_increasing_sequences_per_table() {
        let store = MemoryEventStore::new();
        let a = TableId::new();
        let b = TableId::new();

        let first = store.append(event_for(Some(a))).unwrap();
        let second = store.append(event_for(Some(a))).unwrap();
        let other = store.append(event_for(Some(b))).unwrap();

        assert_eq!(first.sequence, 1);
        assert_eq!(second.sequence, 2);
        assert_eq!(other.sequence, 1);

        let log = store.load(a);
        assert_eq!(log.len(), 2);
        assert!(log.windows(2).all(|w| w[0].sequence < w[1].sequence));
    }

    #[test]
    fn append_without_table_id_is_rejected() {
        let store = MemoryEventStore::new();
        assert_eq!(
            store.append(event_for(None)),
            Err(EngineError::MissingTableId)
        );
    }

    #[test]
    fn load_unknown_table_is_empty() {
        let store = MemoryEventStore::new();
        assert!(store.load(TableId::new()).is_empty());
    }

    #[test]
    fn loaded_events_are_copies() {
        let store = MemoryEventStore::new();
        let table = TableId::new();
        store.append(event_for(Some(table))).unwrap();

        let mut loaded = store.load(table);
        loaded.clear();
        assert_eq!(store.load(table).len(), 1);
    }

    #[test]
    fn json_file_store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let table = TableId::new();
        let stamped = {
            let store = JsonFileEventStore::new(dir.path()).unwrap();
            store.append(event_for(Some(table))).unwrap();
            store.append(event_for(Some(table))).unwrap()
        };
        assert_eq!(stamped.sequence, 2);

        // A fresh store over the same directory continues the sequence.
        let store = JsonFileEventStore::new(dir.path()).unwrap();
        let log = store.load(table);
        assert_eq!(log.len(), 2);
        let third = store.append(event_for(Some(table))).unwrap();
        assert_eq!(third.sequence, 3);
    }
}
