//! The community card selection sub-protocol.
//!
//! All community cards are face up before the window opens; players pick a
//! fixed number of them to complete their hands. The window has reminder
//! waves and a hard cutoff, both driven by the runtime's deadlines
//! (`timeout.rs` handles the cutoff itself).

use std::time::Instant;

use poker_cards::Card;

use crate::error::EngineError;
use crate::event::EventKind;
use crate::hand::Hand;
use crate::table::ChipLedger;
use crate::types::{Phase, PlayerId};

impl Hand {
    /// Pick one community card. Valid while the window is open, for
    /// active players, for cards actually on the table, no duplicates,
    /// and at most the configured number of picks.
    pub(crate) fn select_community_card(
        &mut self,
        player: PlayerId,
        card: Card,
        now: Instant,
        ledger: &mut dyn ChipLedger,
    ) -> Result<(), EngineError> {
        if self.phase != Phase::CommunitySelection {
            return Err(EngineError::WrongPhase);
        }
        if !self.active.contains(&player) {
            return Err(EngineError::WrongActor);
        }
        let started = self
            .selection_started_at
            .ok_or_else(|| EngineError::invariant("selection window not armed"))?;
        if now >= started + self.rules.community_window {
            return Err(EngineError::WindowClosed);
        }
        if !self.community.contains(&card) {
            return Err(EngineError::InvalidSelection);
        }
        let picked = self.selections.get(&player).map_or(0, |v| v.len());
        if picked >= self.rules.community_selection_count {
            return Err(EngineError::InvalidSelection);
        }
        if self
            .selections
            .get(&player)
            .is_some_and(|v| v.contains(&card))
        {
            return Err(EngineError::InvalidSelection);
        }

        self.selections.entry(player).or_default().push(card);
        self.emit(EventKind::CommunityCardSelected {
            player,
            card,
            order: picked + 1,
        })?;

        if self.all_active_selected() {
            return self.finish_selection(now, ledger);
        }
        Ok(())
    }

    pub(crate) fn all_active_selected(&self) -> bool {
        self.active.iter().all(|p| {
            self.selections.get(p).map_or(0, |v| v.len()) == self.rules.community_selection_count
        })
    }

    pub(crate) fn finish_selection(
        &mut self,
        now: Instant,
        ledger: &mut dyn ChipLedger,
    ) -> Result<(), EngineError> {
        self.transition(Phase::Decision, now, ledger)
    }
}
