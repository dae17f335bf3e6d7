//! The ante and continuation betting rounds.

use std::time::Instant;

use crate::error::EngineError;
use crate::event::EventKind;
use crate::hand::Hand;
use crate::table::ChipLedger;
use crate::types::{Chips, Phase, PlayerId};

impl Hand {
    /// Pay the mandatory ante. Only the current actor may pay, the amount
    /// must equal the table's ante, and each player pays at most once.
    pub(crate) fn place_ante(
        &mut self,
        player: PlayerId,
        amount: Chips,
        now: Instant,
        ledger: &mut dyn ChipLedger,
    ) -> Result<(), EngineError> {
        if self.phase != Phase::Antes {
            return Err(EngineError::WrongPhase);
        }
        if self.current_actor != Some(player) {
            return Err(EngineError::WrongActor);
        }
        if self.antes_paid.contains_key(&player) {
            return Err(EngineError::AlreadyDecided);
        }
        if amount != self.rules.ante {
            return Err(EngineError::InvalidAmount);
        }
        if ledger.balance(player)? < amount {
            return Err(EngineError::InsufficientChips);
        }

        ledger.decrease(player, amount)?;
        let before = self.pot;
        self.pot += amount;
        self.antes_paid.insert(player, amount);
        self.emit(EventKind::AntePlaced { player, amount })?;
        self.emit(EventKind::PotChanged {
            before,
            after: self.pot,
        })?;

        if self.antes_complete() {
            self.end_betting_round(Phase::Hole, now, ledger)
        } else {
            match self.next_pending_ante(player) {
                Some(next) => self.begin_turn(next, now),
                None => Err(EngineError::invariant("ante round has no next actor")),
            }
        }
    }

    /// Pay the continuation bet (`ante * multiplier`) to stay in the hand.
    pub(crate) fn place_continuation_bet(
        &mut self,
        player: PlayerId,
        amount: Chips,
        now: Instant,
        ledger: &mut dyn ChipLedger,
    ) -> Result<(), EngineError> {
        if self.phase != Phase::Continuation {
            return Err(EngineError::WrongPhase);
        }
        if self.current_actor != Some(player) {
            return Err(EngineError::WrongActor);
        }
        if self.continuation_bets.contains_key(&player) {
            return Err(EngineError::AlreadyDecided);
        }
        if amount != self.rules.continuation_bet() {
            return Err(EngineError::InvalidAmount);
        }
        if ledger.balance(player)? < amount {
            return Err(EngineError::InsufficientChips);
        }

        ledger.decrease(player, amount)?;
        let before = self.pot;
        self.pot += amount;
        self.continuation_bets.insert(player, amount);
        self.emit(EventKind::ContinuationBetPlaced { player, amount })?;
        self.emit(EventKind::PotChanged {
            before,
            after: self.pot,
        })?;

        if self.bets_complete() {
            self.end_betting_round(Phase::CommunityDeal, now, ledger)
        } else {
            match self.next_pending_bet(player) {
                Some(next) => self.begin_turn(next, now),
                None => Err(EngineError::invariant("continuation round has no next actor")),
            }
        }
    }

    /// Give up the hand. Folding is a continuation-round decision; the
    /// ante round collapses through its timeout instead.
    pub(crate) fn fold(
        &mut self,
        player: PlayerId,
        now: Instant,
        ledger: &mut dyn ChipLedger,
    ) -> Result<(), EngineError> {
        if self.phase != Phase::Continuation {
            return Err(EngineError::WrongPhase);
        }
        if self.current_actor != Some(player) {
            return Err(EngineError::WrongActor);
        }
        self.active.remove(&player);
        self.emit(EventKind::PlayerFolded { player })?;
        self.after_departure(player, now, ledger)
    }

    /// A player left the hand mid-flight (seat released, disconnect):
    /// fold them out regardless of whose turn it is.
    pub(crate) fn force_fold(
        &mut self,
        player: PlayerId,
        now: Instant,
        ledger: &mut dyn ChipLedger,
    ) -> Result<(), EngineError> {
        if self.is_ended() || !self.active.contains(&player) {
            return Ok(());
        }
        self.active.remove(&player);
        self.emit(EventKind::PlayerFolded { player })?;
        self.after_departure(player, now, ledger)
    }

    /// Re-establish round flow after `player` dropped out of `active`.
    pub(crate) fn after_departure(
        &mut self,
        player: PlayerId,
        now: Instant,
        ledger: &mut dyn ChipLedger,
    ) -> Result<(), EngineError> {
        if self.active.len() == 1 {
            if matches!(self.phase, Phase::Antes | Phase::Continuation) {
                self.emit(EventKind::BettingRoundEnded {
                    phase: self.phase,
                    total_bets: self.pot,
                })?;
            }
            self.current_actor = None;
            self.turn_deadline = None;
            return self.declare_single_winner(now, ledger);
        }
        if self.active.is_empty() {
            return self.transition(Phase::Ended, now, ledger);
        }

        match self.phase {
            Phase::Antes => {
                if self.current_actor == Some(player) {
                    return match self.next_pending_ante(player) {
                        Some(next) => self.begin_turn(next, now),
                        None => self.end_betting_round(Phase::Hole, now, ledger),
                    };
                }
                if self.antes_complete() {
                    return self.end_betting_round(Phase::Hole, now, ledger);
                }
                Ok(())
            }
            Phase::Continuation => {
                if self.current_actor == Some(player) {
                    return match self.next_pending_bet(player) {
                        Some(next) => self.begin_turn(next, now),
                        None => self.end_betting_round(Phase::CommunityDeal, now, ledger),
                    };
                }
                if self.bets_complete() {
                    return self.end_betting_round(Phase::CommunityDeal, now, ledger);
                }
                Ok(())
            }
            Phase::CommunitySelection => {
                if self.all_active_selected() {
                    return self.finish_selection(now, ledger);
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn antes_complete(&self) -> bool {
        self.active.iter().all(|p| self.antes_paid.contains_key(p))
    }

    pub(crate) fn bets_complete(&self) -> bool {
        self.active
            .iter()
            .all(|p| self.continuation_bets.contains_key(p))
    }

    /// First active seat clockwise after `after` still owing an ante.
    fn next_pending_ante(&self, after: PlayerId) -> Option<PlayerId> {
        self.next_matching(after, |hand, p| !hand.antes_paid.contains_key(&p))
    }

    /// First active seat clockwise after `after` still owing a
    /// continuation decision.
    fn next_pending_bet(&self, after: PlayerId) -> Option<PlayerId> {
        self.next_matching(after, |hand, p| !hand.continuation_bets.contains_key(&p))
    }

    fn next_matching(
        &self,
        after: PlayerId,
        pending: impl Fn(&Hand, PlayerId) -> bool,
    ) -> Option<PlayerId> {
        let n = self.players.len();
        let pos = self.players.iter().position(|&p| p == after)?;
        (1..n)
            .map(|i| self.players[(pos + i) % n])
            .find(|&p| self.active.contains(&p) && pending(self, p))
    }

    pub(crate) fn end_betting_round(
        &mut self,
        next_phase: Phase,
        now: Instant,
        ledger: &mut dyn ChipLedger,
    ) -> Result<(), EngineError> {
        self.current_actor = None;
        self.turn_deadline = None;
        self.emit(EventKind::BettingRoundEnded {
            phase: self.phase,
            total_bets: self.pot,
        })?;
        self.transition(next_phase, now, ledger)
    }
}
