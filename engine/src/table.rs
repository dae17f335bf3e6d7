//! Table state: seats, buy-ins, button rotation and the hand lifecycle.
//!
//! The table is the single owner of its hand and of the buy-in map. The
//! hand moves chips exclusively through the [`ChipLedger`] handle, which
//! emits a `PlayerChipsChanged` event for every transfer, so the chip
//! conservation invariant is visible in the log.

use std::collections::HashMap;
use std::time::Instant;

use poker_cards::Card;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::bus::EventBus;
use crate::error::EngineError;
use crate::event::{Event, EventKind};
use crate::hand::{DeadlineKind, Hand};
use crate::types::{
    Chips, HandId, Phase, PlayerAction, PlayerId, TableId, TableRules, TableStatus,
};

/// The only chip-moving operations a hand may perform against its table.
pub trait ChipLedger {
    fn balance(&self, player: PlayerId) -> Result<Chips, EngineError>;
    fn decrease(&mut self, player: PlayerId, amount: Chips) -> Result<(), EngineError>;
    fn increase(&mut self, player: PlayerId, amount: Chips) -> Result<(), EngineError>;
}

/// Ledger over a table's buy-ins; every change emits `PlayerChipsChanged`.
pub(crate) struct BuyInLedger<'a> {
    pub(crate) buy_ins: &'a mut HashMap<PlayerId, Chips>,
    pub(crate) bus: &'a EventBus,
    pub(crate) table_id: TableId,
    pub(crate) hand_id: Option<HandId>,
}

impl ChipLedger for BuyInLedger<'_> {
    fn balance(&self, player: PlayerId) -> Result<Chips, EngineError> {
        self.buy_ins
            .get(&player)
            .copied()
            .ok_or(EngineError::NotSeated)
    }

    fn decrease(&mut self, player: PlayerId, amount: Chips) -> Result<(), EngineError> {
        let before = self.balance(player)?;
        let after = before
            .checked_sub(amount)
            .ok_or(EngineError::InsufficientChips)?;
        self.buy_ins.insert(player, after);
        self.bus.emit(
            self.table_id,
            self.hand_id,
            EventKind::PlayerChipsChanged {
                player,
                before,
                after,
                delta: -(amount as i64),
            },
        )?;
        Ok(())
    }

    fn increase(&mut self, player: PlayerId, amount: Chips) -> Result<(), EngineError> {
        let before = self.balance(player)?;
        let after = before + amount;
        self.buy_ins.insert(player, after);
        self.bus.emit(
            self.table_id,
            self.hand_id,
            EventKind::PlayerChipsChanged {
                player,
                before,
                after,
                delta: amount as i64,
            },
        )?;
        Ok(())
    }
}

pub struct Table {
    pub(crate) id: TableId,
    pub(crate) name: String,
    pub(crate) rules: TableRules,
    pub(crate) status: TableStatus,
    /// Seat order is clockwise order.
    pub(crate) seats: Vec<PlayerId>,
    pub(crate) seat_names: HashMap<PlayerId, String>,
    pub(crate) buy_ins: HashMap<PlayerId, Chips>,
    pub(crate) button_index: usize,
    pub(crate) hands_played: u64,
    /// The latest hand; kept after it ends until the next one replaces it.
    pub(crate) hand: Option<Hand>,
    pub(crate) bus: EventBus,
    pub(crate) rng: StdRng,
    pub(crate) poisoned: bool,
}

impl Table {
    pub fn new(id: TableId, name: &str, rules: TableRules, bus: EventBus, rng: StdRng) -> Table {
        Table {
            id,
            name: name.to_string(),
            rules,
            status: TableStatus::Waiting,
            seats: Vec::new(),
            seat_names: HashMap::new(),
            buy_ins: HashMap::new(),
            button_index: 0,
            hands_played: 0,
            hand: None,
            bus,
            rng,
            poisoned: false,
        }
    }

    /// A table nobody observes, for folding a stored log back into state.
    pub(crate) fn detached(id: TableId, name: &str, rules: TableRules) -> Table {
        Table::new(id, name, rules, EventBus::detached(), StdRng::seed_from_u64(0))
    }

    pub fn id(&self) -> TableId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rules(&self) -> &TableRules {
        &self.rules
    }

    pub fn status(&self) -> TableStatus {
        self.status
    }

    pub fn seats(&self) -> &[PlayerId] {
        &self.seats
    }

    pub fn buy_in_of(&self, player: PlayerId) -> Option<Chips> {
        self.buy_ins.get(&player).copied()
    }

    pub fn button_index(&self) -> usize {
        self.button_index
    }

    /// The hand in progress, if any. An ended hand no longer counts.
    pub fn current_hand(&self) -> Option<&Hand> {
        self.hand.as_ref().filter(|h| !h.is_ended())
    }

    /// The latest hand, even after it ended.
    pub fn last_hand(&self) -> Option<&Hand> {
        self.hand.as_ref()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    fn emit(&self, kind: EventKind) -> Result<(), EngineError> {
        self.bus.emit(self.id, None, kind).map(|_| ())
    }

    fn ensure_live(&self) -> Result<(), EngineError> {
        if self.poisoned {
            Err(EngineError::invariant("table is poisoned"))
        } else {
            Ok(())
        }
    }

    /// Seat a player. Allowed while waiting or playing; a player seated
    /// mid-hand joins from the next hand.
    pub fn seat(&mut self, player: PlayerId, name: &str) -> Result<(), EngineError> {
        self.ensure_live()?;
        if !matches!(self.status, TableStatus::Waiting | TableStatus::Playing) {
            return Err(EngineError::WrongStatus);
        }
        if self.seats.contains(&player) {
            return Err(EngineError::AlreadySeated);
        }
        if self.seats.len() >= self.rules.max_seats {
            return Err(EngineError::WrongStatus);
        }
        self.seats.push(player);
        self.seat_names.insert(player, name.to_string());
        self.buy_ins.insert(player, 0);
        self.emit(EventKind::PlayerJoinedTable {
            player,
            name: name.to_string(),
        })
    }

    /// Release a seat and cash the buy-in back out. A player leaving
    /// mid-hand is folded out of the running hand first. Returns the
    /// refunded chips.
    pub fn leave(&mut self, player: PlayerId, now: Instant) -> Result<Chips, EngineError> {
        self.ensure_live()?;
        if !self.seats.contains(&player) {
            return Err(EngineError::NotSeated);
        }
        if let Some(hand) = self.hand.as_mut() {
            if !hand.is_ended() {
                let hand_id = hand.id();
                let mut ledger = BuyInLedger {
                    buy_ins: &mut self.buy_ins,
                    bus: &self.bus,
                    table_id: self.id,
                    hand_id: Some(hand_id),
                };
                hand.force_fold(player, now, &mut ledger)?;
            }
        }
        let refund = self.buy_ins.get(&player).copied().unwrap_or(0);
        if refund > 0 {
            let mut ledger = BuyInLedger {
                buy_ins: &mut self.buy_ins,
                bus: &self.bus,
                table_id: self.id,
                hand_id: None,
            };
            ledger.decrease(player, refund)?;
        }
        self.remove_seat(player);
        self.emit(EventKind::PlayerLeftTable { player })?;
        Ok(refund)
    }

    pub(crate) fn remove_seat(&mut self, player: PlayerId) {
        if let Some(pos) = self.seats.iter().position(|&p| p == player) {
            self.seats.remove(pos);
            if pos < self.button_index {
                self.button_index -= 1;
            }
        }
        self.buy_ins.remove(&player);
        self.seat_names.remove(&player);
    }

    /// Move chips from the player's (already debited) global balance onto
    /// the table. Only while the table is still waiting.
    pub fn buy_in(&mut self, player: PlayerId, amount: Chips) -> Result<(), EngineError> {
        self.ensure_live()?;
        if self.status != TableStatus::Waiting {
            return Err(EngineError::WrongStatus);
        }
        if !self.seats.contains(&player) {
            return Err(EngineError::NotSeated);
        }
        let before = self.buy_ins.get(&player).copied().unwrap_or(0);
        let after = before + amount;
        self.buy_ins.insert(player, after);
        self.emit(EventKind::PlayerChipsChanged {
            player,
            before,
            after,
            delta: amount as i64,
        })
    }

    /// Open play once at least two players are seated.
    pub fn allow_playing(&mut self) -> Result<(), EngineError> {
        self.ensure_live()?;
        if self.status != TableStatus::Waiting || self.seats.len() < 2 {
            return Err(EngineError::WrongStatus);
        }
        self.status = TableStatus::Playing;
        Ok(())
    }

    /// Rotate the button and deal a new hand.
    pub fn start_new_hand(&mut self, now: Instant) -> Result<HandId, EngineError> {
        self.ensure_live()?;
        if self.status != TableStatus::Playing {
            return Err(EngineError::WrongStatus);
        }
        if self.current_hand().is_some() {
            return Err(EngineError::WrongStatus);
        }
        if self.seats.len() < 2 {
            return Err(EngineError::WrongStatus);
        }

        // The first hand pins the button to seat 0; afterwards it rotates
        // clockwise. Leavers are gone from `seats`, so the rotation lands
        // on an eligible seat by construction.
        self.button_index = if self.hands_played == 0 {
            0
        } else {
            (self.button_index + 1) % self.seats.len()
        };
        self.hands_played += 1;

        let hand_id = HandId::new();
        let hand_rng = StdRng::seed_from_u64(self.rng.gen());
        let mut ledger = BuyInLedger {
            buy_ins: &mut self.buy_ins,
            bus: &self.bus,
            table_id: self.id,
            hand_id: Some(hand_id),
        };
        let hand = Hand::start(
            hand_id,
            self.id,
            self.seats.clone(),
            self.button_index,
            self.rules.clone(),
            self.bus.clone(),
            hand_rng,
            now,
            &mut ledger,
        )?;
        self.hand = Some(hand);
        Ok(hand_id)
    }

    /// Route a player action into the running hand.
    pub fn apply_action(
        &mut self,
        player: PlayerId,
        action: PlayerAction,
        now: Instant,
    ) -> Result<(), EngineError> {
        self.ensure_live()?;
        if !self.seats.contains(&player) {
            return Err(EngineError::NotSeated);
        }
        let Some(hand) = self.hand.as_mut() else {
            return Err(EngineError::NotFound);
        };
        if hand.is_ended() {
            return Err(EngineError::NotFound);
        }
        let hand_id = hand.id();
        let mut ledger = BuyInLedger {
            buy_ins: &mut self.buy_ins,
            bus: &self.bus,
            table_id: self.id,
            hand_id: Some(hand_id),
        };
        match action {
            PlayerAction::PlaceAnte { amount } => hand.place_ante(player, amount, now, &mut ledger),
            PlayerAction::PlaceContinuationBet { amount } => {
                hand.place_continuation_bet(player, amount, now, &mut ledger)
            }
            PlayerAction::Fold => hand.fold(player, now, &mut ledger),
            PlayerAction::SelectCommunityCard { card } => {
                hand.select_community_card(player, card, now, &mut ledger)
            }
        }
    }

    /// The earliest deadline the runtime should arm, if any.
    pub fn next_deadline(&self) -> Option<(Instant, DeadlineKind)> {
        self.current_hand().and_then(|h| h.next_deadline())
    }

    /// Dispatch a fired deadline into the running hand.
    pub fn on_deadline(&mut self, kind: DeadlineKind, now: Instant) -> Result<(), EngineError> {
        self.ensure_live()?;
        let Some(hand) = self.hand.as_mut() else {
            return Ok(());
        };
        if hand.is_ended() {
            return Ok(());
        }
        let hand_id = hand.id();
        let mut ledger = BuyInLedger {
            buy_ins: &mut self.buy_ins,
            bus: &self.bus,
            table_id: self.id,
            hand_id: Some(hand_id),
        };
        hand.on_deadline(kind, now, &mut ledger)
    }

    /// Whether the runtime should deal the next hand on its own: a hand
    /// has already been played, none is running, and at least two seated
    /// players still hold chips.
    pub fn should_start_next_hand(&self) -> bool {
        !self.poisoned
            && self.status == TableStatus::Playing
            && self.hands_played > 0
            && self.current_hand().is_none()
            && self
                .seats
                .iter()
                .filter(|p| self.buy_ins.get(*p).copied().unwrap_or(0) > 0)
                .count()
                >= 2
    }

    /// Mark the table unusable after an internal invariant failure. The
    /// running hand gets a best-effort `HandEnded`; nothing is appended
    /// afterwards.
    pub fn poison(&mut self, now: Instant) {
        if self.poisoned {
            return;
        }
        tracing::error!(table = %self.id, "table poisoned by invariant violation");
        if let Some(hand) = self.hand.as_mut() {
            if !hand.is_ended() {
                let _ = hand.abort(now);
            }
        }
        self.poisoned = true;
    }

    /// Every observable field, for observers and the replay-equality
    /// property.
    pub fn snapshot(&self) -> TableSnapshot {
        let hand = self.hand.as_ref();
        let mut active: Vec<PlayerId> = hand
            .map(|h| h.active.iter().copied().collect())
            .unwrap_or_default();
        active.sort();
        TableSnapshot {
            id: self.id,
            name: self.name.clone(),
            status: self.status,
            seats: self.seats.clone(),
            seat_names: self.seat_names.clone(),
            buy_ins: self.buy_ins.clone(),
            button_index: self.button_index,
            hands_played: self.hands_played,
            phase: hand.map(|h| h.phase),
            pot: hand.map_or(0, |h| h.pot),
            community: hand.map(|h| h.community.clone()).unwrap_or_default(),
            hole_cards: hand.map(|h| h.hole_cards.clone()).unwrap_or_default(),
            selections: hand.map(|h| h.selections.clone()).unwrap_or_default(),
            active,
            current_actor: hand.and_then(|h| h.current_actor),
            winners: hand.map(|h| h.winners.clone()).unwrap_or_default(),
        }
    }
}

/// A comparable, serializable view of everything observable about a table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub id: TableId,
    pub name: String,
    pub status: TableStatus,
    pub seats: Vec<PlayerId>,
    pub seat_names: HashMap<PlayerId, String>,
    pub buy_ins: HashMap<PlayerId, Chips>,
    pub button_index: usize,
    pub hands_played: u64,
    pub phase: Option<Phase>,
    pub pot: Chips,
    pub community: Vec<Card>,
    pub hole_cards: HashMap<PlayerId, Vec<Card>>,
    pub selections: HashMap<PlayerId, Vec<Card>>,
    pub active: Vec<PlayerId>,
    pub current_actor: Option<PlayerId>,
    pub winners: Vec<PlayerId>,
}
