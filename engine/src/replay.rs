//! Rebuilding table state from its event log.
//!
//! Authority map — each observable field is written by exactly one event
//! kind: seats by `PlayerJoinedTable`/`PlayerLeftTable`, buy-ins by
//! `PlayerChipsChanged` (its `after` is authoritative), the pot by
//! `PotChanged`, the phase by `PhaseChanged`/`HandEnded`, membership of
//! the active set by `PlayerFolded`/`PlayerTimedOut`, cards by the
//! deal/select events, placings by `HandsEvaluated`, winners by
//! `SingleWinnerDetermined`/`HandsEvaluated`/`HandEnded`. Award and
//! summary events apply nothing; they describe transfers whose state
//! effects arrive as `PlayerChipsChanged` and `PotChanged`.

use crate::event::{Event, EventKind};
use crate::hand::Hand;
use crate::table::Table;
use crate::types::{Phase, TableId, TableRules, TableStatus};

/// Fold a stored log into a fresh table constructed with the same
/// configuration. With no actions in flight, the result matches the live
/// table on every observable field.
pub fn rebuild(id: TableId, name: &str, rules: TableRules, events: &[Event]) -> Table {
    let mut table = Table::detached(id, name, rules);
    for event in events {
        table.apply(event);
    }
    table
}

impl Table {
    /// Fold one stored event into state. Appliers never emit.
    pub fn apply(&mut self, event: &Event) {
        match &event.kind {
            EventKind::PlayerJoinedTable { player, name } => {
                if !self.seats.contains(player) {
                    self.seats.push(*player);
                    self.seat_names.insert(*player, name.clone());
                    self.buy_ins.insert(*player, 0);
                }
            }
            EventKind::PlayerLeftTable { player } => self.remove_seat(*player),
            EventKind::PlayerChipsChanged { player, after, .. } => {
                if self.seats.contains(player) {
                    self.buy_ins.insert(*player, *after);
                }
            }
            EventKind::HandStarted {
                players,
                button_index,
            } => {
                let Some(hand_id) = event.hand_id else { return };
                self.status = TableStatus::Playing;
                self.button_index = *button_index;
                self.hands_played += 1;
                self.hand = Some(Hand::replayed(
                    hand_id,
                    self.id,
                    players.clone(),
                    *button_index,
                    self.rules.clone(),
                    self.bus.clone(),
                ));
            }
            kind => {
                if let Some(hand) = self.hand.as_mut() {
                    hand.apply(kind);
                }
            }
        }
    }
}

impl Hand {
    pub(crate) fn apply(&mut self, kind: &EventKind) {
        match kind {
            EventKind::PhaseChanged { to, .. } => self.phase = *to,
            EventKind::PlayerTurnStarted { player, .. } => self.current_actor = Some(*player),
            EventKind::BettingRoundEnded { .. } => self.current_actor = None,
            EventKind::AntePlaced { player, amount } => {
                self.antes_paid.insert(*player, *amount);
            }
            EventKind::ContinuationBetPlaced { player, amount } => {
                self.continuation_bets.insert(*player, *amount);
            }
            EventKind::PlayerFolded { player } => {
                self.active.remove(player);
            }
            EventKind::PlayerTimedOut {
                player,
                default_action,
            } => {
                self.active.remove(player);
                if default_action == "forfeit" {
                    self.selections.remove(player);
                }
            }
            EventKind::HoleCardDealt { player, card } => {
                self.hole_cards.entry(*player).or_default().push(*card);
            }
            EventKind::CommunityCardDealt { card, .. } => self.community.push(*card),
            EventKind::CommunityCardSelected { player, card, .. } => {
                self.selections.entry(*player).or_default().push(*card);
            }
            EventKind::PotChanged { after, .. } => self.pot = *after,
            EventKind::HandsEvaluated { results } => {
                self.results = results.clone();
                self.winners = results
                    .iter()
                    .filter(|r| r.is_winner)
                    .map(|r| r.player)
                    .collect();
            }
            EventKind::SingleWinnerDetermined { player, .. } => {
                self.results.clear();
                self.winners = vec![*player];
            }
            EventKind::HandEnded { winners, .. } => {
                self.phase = Phase::Ended;
                self.winners = winners.clone();
                self.current_actor = None;
            }
            // Deal summaries, showdown announcements, award records and
            // lobby events carry no state of their own.
            _ => {}
        }
    }
}
