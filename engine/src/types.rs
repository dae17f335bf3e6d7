//! Identifiers, chips, rules and the other small domain types.

use std::fmt;
use std::time::Duration;

use poker_cards::Card;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            #[allow(clippy::new_without_default)]
            pub fn new() -> $name {
                $name(Uuid::new_v4())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Identifies a player across the lobby and every table.
    PlayerId
);
id_type!(
    /// Identifies a table.
    TableId
);
id_type!(
    /// Identifies a single hand played at a table.
    HandId
);

/// Chip amounts are plain unsigned counts.
pub type Chips = u64;

/// A player known to the lobby. `balance` is the chip reserve held off any
/// table; it shrinks on buy-in and grows on cash-out.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub balance: Chips,
}

/// Table lifecycle status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableStatus {
    Waiting,
    Playing,
    Ended,
}

/// Hand phases in their only legal order. An early exit to `Ended` exists
/// from any phase when no active players remain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phase {
    Start,
    Antes,
    Hole,
    Continuation,
    CommunityDeal,
    CommunitySelection,
    Decision,
    Payout,
    Ended,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Start => "start",
            Phase::Antes => "antes",
            Phase::Hole => "hole",
            Phase::Continuation => "continuation",
            Phase::CommunityDeal => "community-deal",
            Phase::CommunitySelection => "community-selection",
            Phase::Decision => "decision",
            Phase::Payout => "payout",
            Phase::Ended => "ended",
        };
        f.write_str(s)
    }
}

/// Per-table game options.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TableRules {
    /// Mandatory contribution from every player before the hole cards.
    pub ante: Chips,
    /// The continuation bet is `ante * continuation_multiplier`.
    pub continuation_multiplier: u64,
    /// How long a player may sit on their turn before the default action.
    pub player_timeout: Duration,
    /// Offsets of the community selection reminder waves.
    pub community_waves: [Duration; 3],
    /// Hard end of the community selection window.
    pub community_window: Duration,
    /// How many community cards each player picks.
    pub community_selection_count: usize,
    /// How many community cards are dealt face up.
    pub community_deal_count: usize,
    pub max_seats: usize,
    /// At the window end, fill missing picks randomly instead of
    /// forfeiting the player.
    pub auto_fill_selections: bool,
}

impl Default for TableRules {
    fn default() -> TableRules {
        TableRules {
            ante: 10,
            continuation_multiplier: 3,
            player_timeout: Duration::from_secs(15),
            community_waves: [
                Duration::from_secs(0),
                Duration::from_secs(5),
                Duration::from_secs(8),
            ],
            community_window: Duration::from_secs(10),
            community_selection_count: 3,
            community_deal_count: 8,
            max_seats: 6,
            auto_fill_selections: true,
        }
    }
}

impl TableRules {
    pub fn with_ante(ante: Chips) -> TableRules {
        TableRules {
            ante,
            ..TableRules::default()
        }
    }

    /// Required continuation bet size.
    pub fn continuation_bet(&self) -> Chips {
        self.ante * self.continuation_multiplier
    }
}

/// Player-submitted hand actions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlayerAction {
    PlaceAnte { amount: Chips },
    PlaceContinuationBet { amount: Chips },
    Fold,
    SelectCommunityCard { card: Card },
}
