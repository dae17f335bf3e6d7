//! The per-table single-writer task.
//!
//! Each table runs in one Tokio task that owns the `Table` value outright.
//! Inbound commands arrive on a bounded mailbox and are applied one at a
//! time; between commands the task sleeps until the earliest deadline the
//! current state derives. There are no background timer tasks and no
//! locks inside a table.

use std::time::Instant;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time;

use crate::error::EngineError;
use crate::event::Event;
use crate::table::{Table, TableSnapshot};
use crate::types::{Chips, HandId, PlayerAction, PlayerId, TableId};

const MAILBOX_CAPACITY: usize = 64;

enum Command {
    Seat {
        player: PlayerId,
        name: String,
        reply: oneshot::Sender<Result<(), EngineError>>,
    },
    Leave {
        player: PlayerId,
        reply: oneshot::Sender<Result<Chips, EngineError>>,
    },
    BuyIn {
        player: PlayerId,
        amount: Chips,
        reply: oneshot::Sender<Result<(), EngineError>>,
    },
    AllowPlaying {
        reply: oneshot::Sender<Result<(), EngineError>>,
    },
    StartHand {
        reply: oneshot::Sender<Result<HandId, EngineError>>,
    },
    Action {
        player: PlayerId,
        action: PlayerAction,
        reply: oneshot::Sender<Result<(), EngineError>>,
    },
    Subscribe {
        reply: oneshot::Sender<broadcast::Receiver<Event>>,
    },
    Snapshot {
        reply: oneshot::Sender<TableSnapshot>,
    },
    Shutdown,
}

/// Cloneable address of a table task.
#[derive(Clone)]
pub struct TableHandle {
    id: TableId,
    tx: mpsc::Sender<Command>,
}

impl TableHandle {
    /// Move the table into its own task and return its address.
    pub fn spawn(table: Table) -> TableHandle {
        let id = table.id();
        let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
        tokio::spawn(run_table(table, rx));
        TableHandle { id, tx }
    }

    pub fn id(&self) -> TableId {
        self.id
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(build(reply_tx))
            .await
            .map_err(|_| EngineError::NotFound)?;
        reply_rx.await.map_err(|_| EngineError::NotFound)
    }

    pub async fn seat(&self, player: PlayerId, name: String) -> Result<(), EngineError> {
        self.request(|reply| Command::Seat {
            player,
            name,
            reply,
        })
        .await?
    }

    pub async fn leave(&self, player: PlayerId) -> Result<Chips, EngineError> {
        self.request(|reply| Command::Leave { player, reply }).await?
    }

    pub async fn buy_in(&self, player: PlayerId, amount: Chips) -> Result<(), EngineError> {
        self.request(|reply| Command::BuyIn {
            player,
            amount,
            reply,
        })
        .await?
    }

    pub async fn allow_playing(&self) -> Result<(), EngineError> {
        self.request(|reply| Command::AllowPlaying { reply }).await?
    }

    pub async fn start_hand(&self) -> Result<HandId, EngineError> {
        self.request(|reply| Command::StartHand { reply }).await?
    }

    pub async fn submit(&self, player: PlayerId, action: PlayerAction) -> Result<(), EngineError> {
        self.request(|reply| Command::Action {
            player,
            action,
            reply,
        })
        .await?
    }

    /// An ordered stream of this table's events. Slow receivers lag and
    /// drop; the stored log stays authoritative.
    pub async fn subscribe(&self) -> Result<broadcast::Receiver<Event>, EngineError> {
        self.request(|reply| Command::Subscribe { reply }).await
    }

    pub async fn snapshot(&self) -> Result<TableSnapshot, EngineError> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// Stop the table task. Pending timers die with it; the mailbox is
    /// drained without further effect.
    pub async fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown).await;
    }
}

async fn run_table(mut table: Table, mut rx: mpsc::Receiver<Command>) {
    tracing::info!(table = %table.id(), name = table.name(), "table task started");
    loop {
        start_pending_hand(&mut table);
        let deadline = table.next_deadline();
        let wake_at = deadline.map(|(at, _)| at).unwrap_or_else(Instant::now);
        tokio::select! {
            cmd = rx.recv() => {
                match cmd {
                    None | Some(Command::Shutdown) => break,
                    Some(cmd) => handle_command(&mut table, cmd),
                }
            }
            _ = time::sleep_until(time::Instant::from_std(wake_at)), if deadline.is_some() => {
                let Some((_, kind)) = deadline else { continue };
                let now = time::Instant::now().into_std();
                let result = table.on_deadline(kind, now);
                note_invariant(&mut table, &result, now);
            }
        }
    }
    tracing::info!(table = %table.id(), "table task stopped");
}

fn handle_command(table: &mut Table, cmd: Command) {
    let now = time::Instant::now().into_std();
    match cmd {
        Command::Seat {
            player,
            name,
            reply,
        } => {
            let result = table.seat(player, &name);
            note_invariant(table, &result, now);
            let _ = reply.send(result);
        }
        Command::Leave { player, reply } => {
            let result = table.leave(player, now);
            note_invariant(table, &result, now);
            let _ = reply.send(result);
        }
        Command::BuyIn {
            player,
            amount,
            reply,
        } => {
            let result = table.buy_in(player, amount);
            note_invariant(table, &result, now);
            let _ = reply.send(result);
        }
        Command::AllowPlaying { reply } => {
            let result = table.allow_playing();
            let _ = reply.send(result);
        }
        Command::StartHand { reply } => {
            let result = table.start_new_hand(now);
            note_invariant(table, &result, now);
            let _ = reply.send(result);
        }
        Command::Action {
            player,
            action,
            reply,
        } => {
            let result = table.apply_action(player, action, now);
            note_invariant(table, &result, now);
            let _ = reply.send(result);
        }
        Command::Subscribe { reply } => {
            let _ = reply.send(table.subscribe());
        }
        Command::Snapshot { reply } => {
            let _ = reply.send(table.snapshot());
        }
        Command::Shutdown => {}
    }
}

fn start_pending_hand(table: &mut Table) {
    while table.should_start_next_hand() {
        let now = time::Instant::now().into_std();
        match table.start_new_hand(now) {
            Ok(hand_id) => {
                tracing::info!(table = %table.id(), hand = %hand_id, "next hand started");
            }
            Err(e) => {
                tracing::error!(table = %table.id(), error = %e, "failed to start next hand");
                table.poison(now);
            }
        }
    }
}

fn note_invariant<T>(table: &mut Table, result: &Result<T, EngineError>, now: Instant) {
    if let Err(EngineError::InternalInvariant(msg)) = result {
        tracing::error!(table = %table.id(), error = %msg, "invariant violation");
        table.poison(now);
    }
}
