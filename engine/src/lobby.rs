//! The global directory: players with their off-table balances, and the
//! tables they can join.
//!
//! The lobby holds no game state. It routes requests to table tasks and
//! owns the one cross-table resource besides the store: the registry of
//! global balances. Buy-ins reserve chips from the registry first and are
//! refunded when the table refuses, so chips never duplicate.

use std::collections::HashMap;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::{broadcast, RwLock};

use crate::bus::EventBus;
use crate::clock::Clock;
use crate::error::EngineError;
use crate::event::{Event, EventKind};
use crate::runtime::TableHandle;
use crate::store::EventStore;
use crate::table::{Table, TableSnapshot};
use crate::types::{Chips, HandId, Player, PlayerAction, PlayerId, TableId, TableRules};

const LOBBY_OBSERVER_BUFFER: usize = 64;

pub struct Lobby {
    store: Arc<dyn EventStore>,
    clock: Arc<dyn Clock>,
    players: RwLock<HashMap<PlayerId, Player>>,
    tables: RwLock<HashMap<TableId, TableHandle>>,
    observers: broadcast::Sender<Event>,
}

impl Lobby {
    pub fn new(store: Arc<dyn EventStore>, clock: Arc<dyn Clock>) -> Lobby {
        let (observers, _) = broadcast::channel(LOBBY_OBSERVER_BUFFER);
        Lobby {
            store,
            clock,
            players: RwLock::new(HashMap::new()),
            tables: RwLock::new(HashMap::new()),
            observers,
        }
    }

    pub fn store(&self) -> Arc<dyn EventStore> {
        self.store.clone()
    }

    /// Lobby-scoped events. They carry no table id and are never
    /// persisted; table events flow through the per-table subscriptions.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.observers.subscribe()
    }

    fn emit_lobby(&self, kind: EventKind) {
        let event = Event {
            table_id: None,
            hand_id: None,
            sequence: 0,
            timestamp_ms: self.clock.unix_millis(),
            kind,
        };
        let _ = self.observers.send(event);
    }

    pub async fn enter_lobby(&self, name: &str, balance: Chips) -> Player {
        let player = Player {
            id: PlayerId::new(),
            name: name.to_string(),
            balance,
        };
        self.players.write().await.insert(player.id, player.clone());
        self.emit_lobby(EventKind::PlayerEnteredLobby {
            player: player.id,
            name: player.name.clone(),
        });
        tracing::info!(player = %player.id, name = %player.name, "player entered lobby");
        player
    }

    pub async fn leave_lobby(&self, player: PlayerId) -> Result<(), EngineError> {
        self.players
            .write()
            .await
            .remove(&player)
            .ok_or(EngineError::NotFound)?;
        self.emit_lobby(EventKind::PlayerLeftLobby { player });
        Ok(())
    }

    pub async fn player(&self, id: PlayerId) -> Option<Player> {
        self.players.read().await.get(&id).cloned()
    }

    pub async fn create_table(&self, name: &str, ante: Chips) -> TableId {
        self.create_table_with_rules(name, TableRules::with_ante(ante))
            .await
    }

    pub async fn create_table_with_rules(&self, name: &str, rules: TableRules) -> TableId {
        let id = TableId::new();
        let bus = EventBus::new(self.store.clone(), self.clock.clone());
        let table = Table::new(id, name, rules, bus, StdRng::from_entropy());
        let handle = TableHandle::spawn(table);
        self.tables.write().await.insert(id, handle);
        tracing::info!(table = %id, name, "table created");
        id
    }

    async fn table(&self, id: TableId) -> Result<TableHandle, EngineError> {
        self.tables
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(EngineError::NotFound)
    }

    pub async fn seat(&self, table_id: TableId, player: PlayerId) -> Result<(), EngineError> {
        let name = self
            .player(player)
            .await
            .ok_or(EngineError::NotFound)?
            .name;
        self.table(table_id).await?.seat(player, name).await
    }

    /// Reserve chips from the global balance, then move them onto the
    /// table. The reservation is refunded when the table refuses.
    pub async fn buy_in(
        &self,
        table_id: TableId,
        player: PlayerId,
        amount: Chips,
    ) -> Result<(), EngineError> {
        let handle = self.table(table_id).await?;
        {
            let mut players = self.players.write().await;
            let entry = players.get_mut(&player).ok_or(EngineError::NotFound)?;
            if entry.balance < amount {
                return Err(EngineError::InsufficientChips);
            }
            entry.balance -= amount;
        }
        let result = handle.buy_in(player, amount).await;
        if result.is_err() {
            if let Some(entry) = self.players.write().await.get_mut(&player) {
                entry.balance += amount;
            }
        }
        result
    }

    /// Release the seat and cash the table buy-in back into the global
    /// balance.
    pub async fn leave_table(
        &self,
        table_id: TableId,
        player: PlayerId,
    ) -> Result<(), EngineError> {
        let refund = self.table(table_id).await?.leave(player).await?;
        if refund > 0 {
            if let Some(entry) = self.players.write().await.get_mut(&player) {
                entry.balance += refund;
            }
        }
        Ok(())
    }

    pub async fn allow_playing(&self, table_id: TableId) -> Result<(), EngineError> {
        self.table(table_id).await?.allow_playing().await
    }

    pub async fn start_hand(&self, table_id: TableId) -> Result<HandId, EngineError> {
        self.table(table_id).await?.start_hand().await
    }

    /// The transport entry point: route one player action to its table.
    pub async fn submit_action(
        &self,
        table_id: TableId,
        player: PlayerId,
        action: PlayerAction,
    ) -> Result<(), EngineError> {
        self.table(table_id).await?.submit(player, action).await
    }

    pub async fn subscribe_table(
        &self,
        table_id: TableId,
    ) -> Result<broadcast::Receiver<Event>, EngineError> {
        self.table(table_id).await?.subscribe().await
    }

    pub async fn snapshot(&self, table_id: TableId) -> Result<TableSnapshot, EngineError> {
        self.table(table_id).await?.snapshot().await
    }

    /// Stop every table task. Pending timers are dropped with the tasks;
    /// in-flight appends finish before each task observes the shutdown.
    pub async fn shutdown(&self) {
        let handles: Vec<TableHandle> = self.tables.write().await.drain().map(|(_, h)| h).collect();
        for handle in handles {
            handle.shutdown().await;
        }
    }
}
