//! The closed domain event sum and its envelope.
//!
//! Every successful mutation of a table is described by one or more of
//! these events; appending them to the store and fanning them out to
//! observers is the only way state becomes visible. The envelope exposes
//! the owning table directly — there is no reflective field discovery —
//! and lobby-scoped events simply carry no table id, which is exactly the
//! case the store rejects.

use poker_cards::{Card, HandEvaluation};
use serde::{Deserialize, Serialize};

use crate::types::{Chips, HandId, Phase, PlayerId, TableId};

/// One seat's showdown outcome, carried by [`EventKind::HandsEvaluated`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShowdownResult {
    pub player: PlayerId,
    pub evaluation: HandEvaluation,
    /// 0 is the best hand; tying hands share a place.
    pub place: usize,
    pub is_winner: bool,
}

/// One winner's share of a split pot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PotShare {
    pub player: PlayerId,
    pub amount: Chips,
}

/// Envelope around a domain event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Owning table; `None` only for lobby-scoped events, which are never
    /// persisted.
    pub table_id: Option<TableId>,
    pub hand_id: Option<HandId>,
    /// Monotonic per-table position, assigned by the store on append.
    pub sequence: u64,
    /// Wall-clock milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    pub kind: EventKind,
}

impl Event {
    pub fn table_id(&self) -> Option<TableId> {
        self.table_id
    }

    pub fn hand_id(&self) -> Option<HandId> {
        self.hand_id
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    HandStarted {
        players: Vec<PlayerId>,
        button_index: usize,
    },
    PhaseChanged {
        from: Phase,
        to: Phase,
    },
    BettingRoundStarted {
        phase: Phase,
        first_to_act: PlayerId,
    },
    PlayerTurnStarted {
        player: PlayerId,
        /// Wall-clock deadline for the default action.
        deadline_ms: u64,
    },
    AntePlaced {
        player: PlayerId,
        amount: Chips,
    },
    ContinuationBetPlaced {
        player: PlayerId,
        amount: Chips,
    },
    PlayerFolded {
        player: PlayerId,
    },
    PlayerTimedOut {
        player: PlayerId,
        default_action: String,
    },
    CardBurned,
    HoleCardDealt {
        player: PlayerId,
        card: Card,
    },
    /// Summary emitted after both hole passes.
    HoleCardsDealt {
        deal_order: Vec<PlayerId>,
    },
    CommunityCardDealt {
        index: usize,
        card: Card,
    },
    CommunitySelectionStarted {
        time_limit_ms: u64,
    },
    CommunityCardSelected {
        player: PlayerId,
        card: Card,
        /// 1-based position within the player's picks.
        order: usize,
    },
    CommunitySelectionEnded,
    BettingRoundEnded {
        phase: Phase,
        total_bets: Chips,
    },
    HandsEvaluated {
        results: Vec<ShowdownResult>,
    },
    ShowdownStarted {
        players: Vec<PlayerId>,
    },
    PlayerShowedHand {
        player: PlayerId,
        hole: Vec<Card>,
        selections: Vec<Card>,
    },
    PotChanged {
        before: Chips,
        after: Chips,
    },
    PotBrokenDown {
        shares: Vec<PotShare>,
    },
    PotAmountAwarded {
        player: PlayerId,
        amount: Chips,
        reason: String,
    },
    SingleWinnerDetermined {
        player: PlayerId,
        reason: String,
    },
    HandEnded {
        duration_ms: u64,
        final_pot: Chips,
        winners: Vec<PlayerId>,
    },
    PlayerJoinedTable {
        player: PlayerId,
        name: String,
    },
    PlayerLeftTable {
        player: PlayerId,
    },
    PlayerChipsChanged {
        player: PlayerId,
        before: Chips,
        after: Chips,
        delta: i64,
    },
    PlayerEnteredLobby {
        player: PlayerId,
        name: String,
    },
    PlayerLeftLobby {
        player: PlayerId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_round_trip_through_json() {
        let event = Event {
            table_id: Some(TableId::new()),
            hand_id: Some(HandId::new()),
            sequence: 7,
            timestamp_ms: 1_700_000_000_000,
            kind: EventKind::HoleCardDealt {
                player: PlayerId::new(),
                card: "A♠".parse().unwrap(),
            },
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn unit_variants_round_trip() {
        let event = Event {
            table_id: Some(TableId::new()),
            hand_id: None,
            sequence: 1,
            timestamp_ms: 0,
            kind: EventKind::CardBurned,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("card_burned"));
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
