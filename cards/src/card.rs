//! Cards, suits, ranks and the shorthand codec.
//!
//! A card renders as its rank followed by a Unicode suit glyph: `A♠`,
//! `10♥`, `7♣`. Parsing accepts the glyph forms and the ASCII suit letters
//! in either case (`as`, `10H`, `7c`). The uppercase literal `W` is the
//! wildcard; it has no suit or rank and never appears in play.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One of the four French suits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Suit {
    Spades,
    Hearts,
    Diamonds,
    Clubs,
}

impl Suit {
    /// All suits in canonical deck order.
    pub const ALL: [Suit; 4] = [Suit::Spades, Suit::Hearts, Suit::Diamonds, Suit::Clubs];

    /// The Unicode glyph used by the shorthand format.
    pub fn glyph(self) -> char {
        match self {
            Suit::Spades => '♠',
            Suit::Hearts => '♥',
            Suit::Diamonds => '♦',
            Suit::Clubs => '♣',
        }
    }

    fn from_char(c: char) -> Option<Suit> {
        match c {
            '♠' | 's' | 'S' => Some(Suit::Spades),
            '♥' | 'h' | 'H' => Some(Suit::Hearts),
            '♦' | 'd' | 'D' => Some(Suit::Diamonds),
            '♣' | 'c' | 'C' => Some(Suit::Clubs),
            _ => None,
        }
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.glyph())
    }
}

/// Card rank, ordered Two (lowest) through Ace (highest).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rank {
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

impl Rank {
    /// All ranks in ascending order.
    pub const ALL: [Rank; 13] = [
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
        Rank::Ace,
    ];

    /// Numeric value, Two = 2 through Ace = 14.
    pub fn value(self) -> u8 {
        match self {
            Rank::Two => 2,
            Rank::Three => 3,
            Rank::Four => 4,
            Rank::Five => 5,
            Rank::Six => 6,
            Rank::Seven => 7,
            Rank::Eight => 8,
            Rank::Nine => 9,
            Rank::Ten => 10,
            Rank::Jack => 11,
            Rank::Queen => 12,
            Rank::King => 13,
            Rank::Ace => 14,
        }
    }

    /// Shorthand symbol: `2`..`10`, `J`, `Q`, `K`, `A`.
    pub fn symbol(self) -> &'static str {
        match self {
            Rank::Two => "2",
            Rank::Three => "3",
            Rank::Four => "4",
            Rank::Five => "5",
            Rank::Six => "6",
            Rank::Seven => "7",
            Rank::Eight => "8",
            Rank::Nine => "9",
            Rank::Ten => "10",
            Rank::Jack => "J",
            Rank::Queen => "Q",
            Rank::King => "K",
            Rank::Ace => "A",
        }
    }

    fn from_symbol(s: &str) -> Option<Rank> {
        match s {
            "2" => Some(Rank::Two),
            "3" => Some(Rank::Three),
            "4" => Some(Rank::Four),
            "5" => Some(Rank::Five),
            "6" => Some(Rank::Six),
            "7" => Some(Rank::Seven),
            "8" => Some(Rank::Eight),
            "9" => Some(Rank::Nine),
            "10" => Some(Rank::Ten),
            "J" => Some(Rank::Jack),
            "Q" => Some(Rank::Queen),
            "K" => Some(Rank::King),
            "A" => Some(Rank::Ace),
            _ => None,
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A playing card. Equality is structural.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Card {
    /// Placeholder card with no suit or rank. Round-trips through the
    /// codec as `W` but is never dealt.
    Wildcard,
    /// An ordinary suited card.
    Suited { suit: Suit, rank: Rank },
}

impl Card {
    pub fn new(suit: Suit, rank: Rank) -> Card {
        Card::Suited { suit, rank }
    }

    /// Suit and rank, or `None` for the wildcard.
    pub fn parts(self) -> Option<(Suit, Rank)> {
        match self {
            Card::Wildcard => None,
            Card::Suited { suit, rank } => Some((suit, rank)),
        }
    }

    pub fn rank(self) -> Option<Rank> {
        self.parts().map(|(_, r)| r)
    }

    pub fn suit(self) -> Option<Suit> {
        self.parts().map(|(s, _)| s)
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Card::Wildcard => f.write_str("W"),
            Card::Suited { suit, rank } => write!(f, "{rank}{suit}"),
        }
    }
}

/// Failure to parse a card from its shorthand form.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ParseCardError {
    #[error("card shorthand is too short")]
    TooShort,
    #[error("unrecognized rank {0:?}")]
    BadRank(String),
    #[error("unrecognized suit {0:?}")]
    BadSuit(char),
}

impl FromStr for Card {
    type Err = ParseCardError;

    fn from_str(s: &str) -> Result<Card, ParseCardError> {
        if s == "W" {
            return Ok(Card::Wildcard);
        }
        let mut chars = s.chars();
        let suit_ch = chars.next_back().ok_or(ParseCardError::TooShort)?;
        let rank_part = chars.as_str();
        if rank_part.is_empty() {
            return Err(ParseCardError::TooShort);
        }
        let suit = Suit::from_char(suit_ch).ok_or(ParseCardError::BadSuit(suit_ch))?;
        let rank = Rank::from_symbol(rank_part)
            .ok_or_else(|| ParseCardError::BadRank(rank_part.to_string()))?;
        Ok(Card::new(suit, rank))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_glyph_and_ascii_suits() {
        assert_eq!("A♠".parse(), Ok(Card::new(Suit::Spades, Rank::Ace)));
        assert_eq!("10h".parse(), Ok(Card::new(Suit::Hearts, Rank::Ten)));
        assert_eq!("10H".parse(), Ok(Card::new(Suit::Hearts, Rank::Ten)));
        assert_eq!("7♦".parse(), Ok(Card::new(Suit::Diamonds, Rank::Seven)));
        assert_eq!("Qc".parse(), Ok(Card::new(Suit::Clubs, Rank::Queen)));
    }

    #[test]
    fn rejects_whitespace_and_garbage() {
        assert!("AS ".parse::<Card>().is_err());
        assert!(" AS".parse::<Card>().is_err());
        assert!("100S".parse::<Card>().is_err());
        assert!("".parse::<Card>().is_err());
        assert!("♠".parse::<Card>().is_err());
        assert!("1S".parse::<Card>().is_err());
    }

    #[test]
    fn wildcard_is_uppercase_only() {
        assert_eq!("W".parse(), Ok(Card::Wildcard));
        assert!("w".parse::<Card>().is_err());
        assert_eq!(Card::Wildcard.to_string(), "W");
    }

    #[test]
    fn round_trips_every_card() {
        for suit in Suit::ALL {
            for rank in Rank::ALL {
                let card = Card::new(suit, rank);
                let parsed: Card = card.to_string().parse().unwrap();
                assert_eq!(parsed, card);
            }
        }
        let wild: Card = Card::Wildcard.to_string().parse().unwrap();
        assert_eq!(wild, Card::Wildcard);
    }

    #[test]
    fn canonical_strings_round_trip_back_to_themselves() {
        for s in ["A♠", "10♥", "2♣", "K♦", "W"] {
            let card: Card = s.parse().unwrap();
            assert_eq!(card.to_string(), s);
        }
    }

    #[test]
    fn rank_order_matches_values() {
        assert!(Rank::Ace > Rank::King);
        assert!(Rank::Three > Rank::Two);
        for pair in Rank::ALL.windows(2) {
            assert!(pair[0].value() < pair[1].value());
        }
    }
}
