//! Deadline handling: turn timeouts, the ante-round collapse and the
//! community selection cutoff.
//!
//! Timeouts are not failures. They emit ordinary `PlayerTimedOut` events
//! and move the hand along; a late action arriving after a deadline has
//! been processed fails the normal phase/actor validation.

use std::time::Instant;

use poker_cards::Card;
use rand::Rng;

use crate::error::EngineError;
use crate::event::EventKind;
use crate::hand::{DeadlineKind, Hand};
use crate::table::ChipLedger;
use crate::types::{Phase, PlayerId};

impl Hand {
    /// Route an armed deadline that fired.
    pub(crate) fn on_deadline(
        &mut self,
        kind: DeadlineKind,
        now: Instant,
        ledger: &mut dyn ChipLedger,
    ) -> Result<(), EngineError> {
        match kind {
            DeadlineKind::Turn => self.handle_turn_timeout(now, ledger),
            DeadlineKind::Wave(index) => {
                self.handle_selection_wave(index);
                Ok(())
            }
            DeadlineKind::SelectionEnd => self.handle_selection_deadline(now, ledger),
        }
    }

    /// The current actor's timer lapsed. The ante round collapses as a
    /// whole; in the continuation round only the actor folds.
    pub(crate) fn handle_turn_timeout(
        &mut self,
        now: Instant,
        ledger: &mut dyn ChipLedger,
    ) -> Result<(), EngineError> {
        match self.phase {
            Phase::Antes => self.handle_ante_timeout(now, ledger),
            Phase::Continuation => {
                let Some(player) = self.current_actor else {
                    return Ok(());
                };
                self.active.remove(&player);
                self.emit(EventKind::PlayerTimedOut {
                    player,
                    default_action: "fold".to_string(),
                })?;
                self.after_departure(player, now, ledger)
            }
            // Stale timer; the hand moved on before it fired.
            _ => Ok(()),
        }
    }

    /// Fold every active player who has not paid the ante, end the round
    /// and move on with whoever remains (or end the hand when nobody
    /// does).
    pub(crate) fn handle_ante_timeout(
        &mut self,
        now: Instant,
        ledger: &mut dyn ChipLedger,
    ) -> Result<(), EngineError> {
        if self.phase != Phase::Antes {
            return Ok(());
        }
        let unpaid: Vec<PlayerId> = self
            .active_order()
            .into_iter()
            .filter(|p| !self.antes_paid.contains_key(p))
            .collect();
        for player in unpaid {
            self.active.remove(&player);
            self.emit(EventKind::PlayerTimedOut {
                player,
                default_action: "fold".to_string(),
            })?;
        }
        self.current_actor = None;
        self.turn_deadline = None;
        self.emit(EventKind::BettingRoundEnded {
            phase: Phase::Antes,
            total_bets: self.pot,
        })?;
        if self.active.is_empty() {
            self.transition(Phase::Ended, now, ledger)
        } else {
            self.transition(Phase::Hole, now, ledger)
        }
    }

    /// Reminder waves carry no state transitions; they only mark progress
    /// toward the window end.
    pub(crate) fn handle_selection_wave(&mut self, index: usize) {
        if self.phase != Phase::CommunitySelection {
            return;
        }
        self.waves_fired = self.waves_fired.max(index + 1);
        let pending = self
            .active
            .iter()
            .filter(|p| {
                self.selections.get(p).map_or(0, |v| v.len())
                    < self.rules.community_selection_count
            })
            .count();
        tracing::debug!(hand = %self.id, wave = index, pending, "community selection wave");
    }

    /// Hard cutoff at the window end: fill the stragglers' picks with
    /// uniformly random community cards, or forfeit them, per the rules.
    pub(crate) fn handle_selection_deadline(
        &mut self,
        now: Instant,
        ledger: &mut dyn ChipLedger,
    ) -> Result<(), EngineError> {
        if self.phase != Phase::CommunitySelection {
            return Ok(());
        }
        let need = self.rules.community_selection_count;
        let stragglers: Vec<PlayerId> = self
            .active_order()
            .into_iter()
            .filter(|p| self.selections.get(p).map_or(0, |v| v.len()) < need)
            .collect();

        if self.rules.auto_fill_selections {
            for player in stragglers {
                loop {
                    let picked = self.selections.get(&player).map_or(0, |v| v.len());
                    if picked >= need {
                        break;
                    }
                    let available: Vec<Card> = self
                        .community
                        .iter()
                        .copied()
                        .filter(|c| {
                            !self
                                .selections
                                .get(&player)
                                .is_some_and(|v| v.contains(c))
                        })
                        .collect();
                    if available.is_empty() {
                        return Err(EngineError::invariant(
                            "no community cards left to fill selections",
                        ));
                    }
                    let card = available[self.rng.gen_range(0..available.len())];
                    self.selections.entry(player).or_default().push(card);
                    self.emit(EventKind::CommunityCardSelected {
                        player,
                        card,
                        order: picked + 1,
                    })?;
                }
            }
            self.finish_selection(now, ledger)
        } else {
            for player in &stragglers {
                self.active.remove(player);
                self.selections.remove(player);
                self.emit(EventKind::PlayerTimedOut {
                    player: *player,
                    default_action: "forfeit".to_string(),
                })?;
            }
            if self.active.is_empty() {
                self.transition(Phase::Ended, now, ledger)
            } else if self.active.len() == 1 {
                self.declare_single_winner(now, ledger)
            } else {
                self.finish_selection(now, ledger)
            }
        }
    }
}
