//! The closed error taxonomy returned to action callers.
//!
//! Action failures never mutate state and never emit events; the caller
//! may retry after observing newer events. Engine-driven timeouts are not
//! errors (they surface as `PlayerTimedOut` events).

use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("action is not valid in the current phase")]
    WrongPhase,
    #[error("not this player's turn, or the player is not active")]
    WrongActor,
    #[error("player already made this decision")]
    AlreadyDecided,
    #[error("amount does not match the required value")]
    InvalidAmount,
    #[error("player lacks chips for the required transfer")]
    InsufficientChips,
    #[error("card is not selectable")]
    InvalidSelection,
    #[error("the community selection window has closed")]
    WindowClosed,
    #[error("player is not seated at this table")]
    NotSeated,
    #[error("player is already seated at this table")]
    AlreadySeated,
    #[error("the table does not accept this operation in its current status")]
    WrongStatus,
    #[error("unknown table or hand")]
    NotFound,
    #[error("event is not scoped to a table")]
    MissingTableId,
    #[error("event store failure: {0}")]
    Store(String),
    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),
}

impl EngineError {
    pub(crate) fn invariant(msg: impl Into<String>) -> EngineError {
        EngineError::InternalInvariant(msg.into())
    }
}
