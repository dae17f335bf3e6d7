//! Event-sourced, timer-driven multi-table poker engine.
//!
//! Each table is a single-writer state machine: external actions enter
//! through a mailbox, every successful mutation is appended to the event
//! store and fanned out to observers in order, and the full table state
//! can be rebuilt by folding the log from the beginning. Tables run in
//! parallel; within a table there is no parallelism at all.

pub mod bus;
pub mod clock;
pub mod error;
pub mod event;
pub mod hand;
pub mod lobby;
pub mod replay;
pub mod runtime;
pub mod store;
pub mod table;
pub mod types;

mod betting;
mod selection;
mod showdown;
mod timeout;


pub use bus::EventBus;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::EngineError;
pub use event::{Event, EventKind, PotShare, ShowdownResult};
pub use hand::{DeadlineKind, Hand};
pub use lobby::Lobby;
pub use replay::rebuild;
pub use runtime::TableHandle;
pub use store::{EventStore, JsonFileEventStore, MemoryEventStore};
pub use table::{ChipLedger, Table, TableSnapshot};
pub use types::{
    Chips, HandId, Phase, Player, PlayerAction, PlayerId, TableId, TableRules, TableStatus,
};
