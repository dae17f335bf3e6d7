//! Per-hand state and the phase engine core.
//!
//! A hand is created by its table, owns the deck and all per-hand maps,
//! and moves through the phase sequence `Start → Antes → Hole →
//! Continuation → CommunityDeal → CommunitySelection → Decision → Payout →
//! Ended`. Phases that need no player input run their entry effects and
//! transition immediately; the others wait on the mailbox or on a
//! deadline. Chips only move through the [`ChipLedger`] handle the table
//! passes in, so the hand never touches the buy-in map directly.
//!
//! The betting rounds, community selection, showdown and timeout handlers
//! live in sibling modules; this file holds the state, the transition
//! switch and the dealing entries.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use poker_cards::{Card, Deck};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::bus::EventBus;
use crate::error::EngineError;
use crate::event::{EventKind, ShowdownResult};
use crate::table::ChipLedger;
use crate::types::{Chips, HandId, Phase, PlayerId, TableId, TableRules};

/// A deadline the runtime should arm for this hand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeadlineKind {
    /// The current actor's turn timer.
    Turn,
    /// A community selection reminder wave.
    Wave(usize),
    /// Hard end of the community selection window.
    SelectionEnd,
}

pub struct Hand {
    pub(crate) id: HandId,
    pub(crate) table_id: TableId,
    pub(crate) phase: Phase,
    /// Seat snapshot in clockwise order, fixed at hand start.
    pub(crate) players: Vec<PlayerId>,
    pub(crate) button_index: usize,
    pub(crate) rules: TableRules,
    pub(crate) deck: Deck,
    pub(crate) hole_cards: HashMap<PlayerId, Vec<Card>>,
    pub(crate) community: Vec<Card>,
    pub(crate) pot: Chips,
    pub(crate) antes_paid: HashMap<PlayerId, Chips>,
    pub(crate) continuation_bets: HashMap<PlayerId, Chips>,
    pub(crate) selections: HashMap<PlayerId, Vec<Card>>,
    pub(crate) active: HashSet<PlayerId>,
    pub(crate) current_actor: Option<PlayerId>,
    pub(crate) turn_deadline: Option<Instant>,
    /// `None` for hands rebuilt from the log.
    pub(crate) started_at: Option<Instant>,
    pub(crate) selection_started_at: Option<Instant>,
    pub(crate) waves_fired: usize,
    pub(crate) results: Vec<ShowdownResult>,
    pub(crate) winners: Vec<PlayerId>,
    pub(crate) bus: EventBus,
    pub(crate) rng: StdRng,
}

impl Hand {
    /// Start a live hand: shuffle a fresh deck, mark every seat active and
    /// run the phase entries up to the first ante turn.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn start(
        id: HandId,
        table_id: TableId,
        players: Vec<PlayerId>,
        button_index: usize,
        rules: TableRules,
        bus: EventBus,
        mut rng: StdRng,
        now: Instant,
        ledger: &mut dyn ChipLedger,
    ) -> Result<Hand, EngineError> {
        if players.len() < 2 {
            return Err(EngineError::WrongStatus);
        }
        let mut deck = Deck::new_standard();
        deck.shuffle(&mut rng);

        let mut hand = Hand {
            id,
            table_id,
            phase: Phase::Start,
            active: players.iter().copied().collect(),
            players,
            button_index,
            rules,
            deck,
            hole_cards: HashMap::new(),
            community: Vec::new(),
            pot: 0,
            antes_paid: HashMap::new(),
            continuation_bets: HashMap::new(),
            selections: HashMap::new(),
            current_actor: None,
            turn_deadline: None,
            started_at: Some(now),
            selection_started_at: None,
            waves_fired: 0,
            results: Vec::new(),
            winners: Vec::new(),
            bus,
            rng,
        };
        hand.emit(EventKind::HandStarted {
            players: hand.players.clone(),
            button_index: hand.button_index,
        })?;
        hand.emit(EventKind::PotChanged {
            before: 0,
            after: 0,
        })?;
        // Start immediately gives way to the ante round.
        hand.transition(Phase::Antes, now, ledger)?;
        Ok(hand)
    }

    /// An empty shell populated purely by event appliers.
    pub(crate) fn replayed(
        id: HandId,
        table_id: TableId,
        players: Vec<PlayerId>,
        button_index: usize,
        rules: TableRules,
        bus: EventBus,
    ) -> Hand {
        Hand {
            id,
            table_id,
            phase: Phase::Start,
            active: players.iter().copied().collect(),
            players,
            button_index,
            rules,
            deck: Deck::empty(),
            hole_cards: HashMap::new(),
            community: Vec::new(),
            pot: 0,
            antes_paid: HashMap::new(),
            continuation_bets: HashMap::new(),
            selections: HashMap::new(),
            current_actor: None,
            turn_deadline: None,
            started_at: None,
            selection_started_at: None,
            waves_fired: 0,
            results: Vec::new(),
            winners: Vec::new(),
            bus,
            rng: StdRng::seed_from_u64(0),
        }
    }

    pub fn id(&self) -> HandId {
        self.id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn pot(&self) -> Chips {
        self.pot
    }

    pub fn community(&self) -> &[Card] {
        &self.community
    }

    pub fn hole_cards(&self) -> &HashMap<PlayerId, Vec<Card>> {
        &self.hole_cards
    }

    pub fn selections(&self) -> &HashMap<PlayerId, Vec<Card>> {
        &self.selections
    }

    pub fn active(&self) -> &HashSet<PlayerId> {
        &self.active
    }

    pub fn current_actor(&self) -> Option<PlayerId> {
        self.current_actor
    }

    pub fn results(&self) -> &[ShowdownResult] {
        &self.results
    }

    pub fn winners(&self) -> &[PlayerId] {
        &self.winners
    }

    pub fn is_ended(&self) -> bool {
        self.phase == Phase::Ended
    }

    pub(crate) fn emit(&self, kind: EventKind) -> Result<(), EngineError> {
        self.bus.emit(self.table_id, Some(self.id), kind).map(|_| ())
    }

    /// Move to `to`, emitting the phase change and running its entry
    /// effects.
    pub(crate) fn transition(
        &mut self,
        to: Phase,
        now: Instant,
        ledger: &mut dyn ChipLedger,
    ) -> Result<(), EngineError> {
        let from = self.phase;
        self.phase = to;
        self.emit(EventKind::PhaseChanged { from, to })?;
        match to {
            Phase::Start => Ok(()),
            Phase::Antes => self.enter_betting_round(now),
            Phase::Hole => self.enter_hole(now, ledger),
            Phase::Continuation => {
                if self.active.len() == 1 {
                    self.declare_single_winner(now, ledger)
                } else {
                    self.enter_betting_round(now)
                }
            }
            Phase::CommunityDeal => self.enter_community_deal(now, ledger),
            Phase::CommunitySelection => self.enter_community_selection(now),
            Phase::Decision => self.enter_decision(now, ledger),
            Phase::Payout => self.enter_payout(now, ledger),
            Phase::Ended => self.enter_ended(now),
        }
    }

    /// Seats clockwise starting left of the button, active players only.
    pub(crate) fn active_order(&self) -> Vec<PlayerId> {
        let n = self.players.len();
        (1..=n)
            .map(|i| self.players[(self.button_index + i) % n])
            .filter(|p| self.active.contains(p))
            .collect()
    }

    pub(crate) fn begin_turn(&mut self, player: PlayerId, now: Instant) -> Result<(), EngineError> {
        self.current_actor = Some(player);
        self.turn_deadline = Some(now + self.rules.player_timeout);
        let deadline_ms = self.bus.now_ms() + self.rules.player_timeout.as_millis() as u64;
        self.emit(EventKind::PlayerTurnStarted {
            player,
            deadline_ms,
        })
    }

    pub(crate) fn enter_betting_round(&mut self, now: Instant) -> Result<(), EngineError> {
        let first = self
            .active_order()
            .first()
            .copied()
            .ok_or_else(|| EngineError::invariant("betting round with no active players"))?;
        self.emit(EventKind::BettingRoundStarted {
            phase: self.phase,
            first_to_act: first,
        })?;
        self.begin_turn(first, now)
    }

    /// Deal two cards per active player in two clockwise passes starting
    /// left of the button, then move straight on to the continuation bets.
    pub(crate) fn enter_hole(
        &mut self,
        now: Instant,
        ledger: &mut dyn ChipLedger,
    ) -> Result<(), EngineError> {
        let order = self.active_order();
        let mut deal_order = Vec::with_capacity(order.len() * 2);
        for _pass in 0..2 {
            for &player in &order {
                let card = self
                    .deck
                    .deal()
                    .ok_or_else(|| EngineError::invariant("deck exhausted dealing hole cards"))?;
                self.hole_cards.entry(player).or_default().push(card);
                self.emit(EventKind::HoleCardDealt { player, card })?;
                deal_order.push(player);
            }
        }
        self.emit(EventKind::HoleCardsDealt { deal_order })?;
        self.transition(Phase::Continuation, now, ledger)
    }

    /// Burn one card, deal the community face up, then open the selection
    /// window.
    pub(crate) fn enter_community_deal(
        &mut self,
        now: Instant,
        ledger: &mut dyn ChipLedger,
    ) -> Result<(), EngineError> {
        if !self.deck.burn() {
            return Err(EngineError::invariant("deck exhausted on burn"));
        }
        self.emit(EventKind::CardBurned)?;
        for index in 0..self.rules.community_deal_count {
            let card = self
                .deck
                .deal()
                .ok_or_else(|| EngineError::invariant("deck exhausted dealing community"))?;
            self.community.push(card);
            self.emit(EventKind::CommunityCardDealt { index, card })?;
        }
        self.transition(Phase::CommunitySelection, now, ledger)
    }

    pub(crate) fn enter_community_selection(&mut self, now: Instant) -> Result<(), EngineError> {
        self.selection_started_at = Some(now);
        self.waves_fired = 0;
        self.emit(EventKind::CommunitySelectionStarted {
            time_limit_ms: self.rules.community_window.as_millis() as u64,
        })
    }

    /// The next timer the runtime should arm for this hand.
    pub fn next_deadline(&self) -> Option<(Instant, DeadlineKind)> {
        match self.phase {
            Phase::Antes | Phase::Continuation => {
                self.turn_deadline.map(|d| (d, DeadlineKind::Turn))
            }
            Phase::CommunitySelection => {
                let started = self.selection_started_at?;
                for (i, offset) in self.rules.community_waves.iter().enumerate() {
                    if i >= self.waves_fired {
                        return Some((started + *offset, DeadlineKind::Wave(i)));
                    }
                }
                Some((
                    started + self.rules.community_window,
                    DeadlineKind::SelectionEnd,
                ))
            }
            _ => None,
        }
    }

    /// Best-effort termination after an invariant failure: mark the hand
    /// ended and record it, skipping normal phase entry effects.
    pub(crate) fn abort(&mut self, now: Instant) -> Result<(), EngineError> {
        self.phase = Phase::Ended;
        self.current_actor = None;
        self.turn_deadline = None;
        self.enter_ended(now)
    }
}
