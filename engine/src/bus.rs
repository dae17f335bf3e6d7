//! Append-then-fan-out pipeline that every emitted event goes through.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::clock::{Clock, SystemClock};
use crate::error::EngineError;
use crate::event::{Event, EventKind};
use crate::store::{EventStore, MemoryEventStore};
use crate::types::{HandId, TableId};

/// Capacity of the observer channel; slow observers lag and drop, they
/// never block the table.
const OBSERVER_BUFFER: usize = 256;

#[derive(Clone)]
pub struct EventBus {
    store: Arc<dyn EventStore>,
    clock: Arc<dyn Clock>,
    observers: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new(store: Arc<dyn EventStore>, clock: Arc<dyn Clock>) -> EventBus {
        let (observers, _) = broadcast::channel(OBSERVER_BUFFER);
        EventBus {
            store,
            clock,
            observers,
        }
    }

    /// A bus over a scratch store that nobody observes; used when folding
    /// an existing log back into state.
    pub fn detached() -> EventBus {
        EventBus::new(Arc::new(MemoryEventStore::new()), Arc::new(SystemClock))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.observers.subscribe()
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.unix_millis()
    }

    /// Stamp, append and fan out one event. The stored copy (with its
    /// assigned sequence) is what observers see.
    pub fn emit(
        &self,
        table_id: TableId,
        hand_id: Option<HandId>,
        kind: EventKind,
    ) -> Result<Event, EngineError> {
        let event = Event {
            table_id: Some(table_id),
            hand_id,
            sequence: 0,
            timestamp_ms: self.clock.unix_millis(),
            kind,
        };
        let stored = self.store.append(event)?;
        let _ = self.observers.send(stored.clone());
        Ok(stored)
    }
}
