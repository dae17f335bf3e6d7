//! Showdown: evaluation, pot distribution and the end of the hand.

use std::time::Instant;

use crate::error::EngineError;
use crate::event::{EventKind, PotShare, ShowdownResult};
use crate::hand::Hand;
use crate::table::ChipLedger;
use crate::types::{Phase, PlayerId};

impl Hand {
    /// Close the selection window, reveal and evaluate every remaining
    /// hand, then head to payout (or straight to the end when nothing
    /// could be evaluated).
    pub(crate) fn enter_decision(
        &mut self,
        now: Instant,
        ledger: &mut dyn ChipLedger,
    ) -> Result<(), EngineError> {
        self.current_actor = None;
        self.turn_deadline = None;
        self.emit(EventKind::CommunitySelectionEnded)?;

        let order = self.active_order();
        let mut entries = Vec::with_capacity(order.len());
        for &player in &order {
            let mut cards = self.hole_cards.get(&player).cloned().unwrap_or_default();
            if let Some(picks) = self.selections.get(&player) {
                cards.extend_from_slice(picks);
            }
            // Players without enough cards (forfeited selections) sit out
            // of the evaluation but are still shown.
            if cards.len() < 5 {
                continue;
            }
            let evaluation = poker_cards::best_hand(&cards)
                .map_err(|e| EngineError::invariant(e.to_string()))?;
            entries.push((player, evaluation));
        }

        self.emit(EventKind::ShowdownStarted {
            players: order.clone(),
        })?;
        for &player in &order {
            self.emit(EventKind::PlayerShowedHand {
                player,
                hole: self.hole_cards.get(&player).cloned().unwrap_or_default(),
                selections: self.selections.get(&player).cloned().unwrap_or_default(),
            })?;
        }

        let results: Vec<ShowdownResult> = poker_cards::rank_showdown(entries)
            .into_iter()
            .map(|p| ShowdownResult {
                player: p.entrant,
                evaluation: p.evaluation,
                place: p.place,
                is_winner: p.is_winner,
            })
            .collect();
        self.results = results.clone();
        self.winners = results
            .iter()
            .filter(|r| r.is_winner)
            .map(|r| r.player)
            .collect();
        self.emit(EventKind::HandsEvaluated { results })?;

        if self.results.is_empty() {
            self.transition(Phase::Ended, now, ledger)
        } else {
            self.transition(Phase::Payout, now, ledger)
        }
    }

    /// Award the pot to the winners, emptying it, then end the hand. Ties
    /// split the pot evenly; a positive remainder goes to the winner
    /// seated closest clockwise of the button.
    pub(crate) fn enter_payout(
        &mut self,
        now: Instant,
        ledger: &mut dyn ChipLedger,
    ) -> Result<(), EngineError> {
        let pot = self.pot;
        let winners = self.winners.clone();
        match winners.as_slice() {
            [] => return Err(EngineError::invariant("payout with no winners")),
            [winner] => {
                let reason = if self.results.is_empty() {
                    "last player standing"
                } else {
                    "winner takes all"
                };
                ledger.increase(*winner, pot)?;
                self.emit(EventKind::PotAmountAwarded {
                    player: *winner,
                    amount: pot,
                    reason: reason.to_string(),
                })?;
            }
            _ => {
                let count = winners.len() as u64;
                let share = pot / count;
                let remainder = pot - share * count;
                let closest = self
                    .closest_clockwise_of_button(&winners)
                    .ok_or_else(|| EngineError::invariant("winner without a seat"))?;
                let shares: Vec<PotShare> = winners
                    .iter()
                    .map(|&player| PotShare {
                        player,
                        amount: share + if player == closest { remainder } else { 0 },
                    })
                    .collect();
                self.emit(EventKind::PotBrokenDown {
                    shares: shares.clone(),
                })?;
                for share in &shares {
                    ledger.increase(share.player, share.amount)?;
                    self.emit(EventKind::PotAmountAwarded {
                        player: share.player,
                        amount: share.amount,
                        reason: "split pot".to_string(),
                    })?;
                }
            }
        }
        let before = self.pot;
        self.pot = 0;
        self.emit(EventKind::PotChanged { before, after: 0 })?;
        self.transition(Phase::Ended, now, ledger)
    }

    /// The winner seated closest clockwise of the button.
    fn closest_clockwise_of_button(&self, winners: &[PlayerId]) -> Option<PlayerId> {
        let n = self.players.len();
        (1..=n)
            .map(|i| self.players[(self.button_index + i) % n])
            .find(|p| winners.contains(p))
    }

    /// Collapse to a single-winner payout once only one active player
    /// remains.
    pub(crate) fn declare_single_winner(
        &mut self,
        now: Instant,
        ledger: &mut dyn ChipLedger,
    ) -> Result<(), EngineError> {
        let winner = self
            .active
            .iter()
            .next()
            .copied()
            .ok_or_else(|| EngineError::invariant("no active player left"))?;
        self.current_actor = None;
        self.turn_deadline = None;
        self.results.clear();
        self.winners = vec![winner];
        self.emit(EventKind::SingleWinnerDetermined {
            player: winner,
            reason: "last player standing".to_string(),
        })?;
        self.transition(Phase::Payout, now, ledger)
    }

    pub(crate) fn enter_ended(&mut self, now: Instant) -> Result<(), EngineError> {
        self.current_actor = None;
        self.turn_deadline = None;
        let duration_ms = self
            .started_at
            .map(|t| now.saturating_duration_since(t).as_millis() as u64)
            .unwrap_or(0);
        self.emit(EventKind::HandEnded {
            duration_ms,
            final_pot: self.pot,
            winners: self.winners.clone(),
        })
    }
}
