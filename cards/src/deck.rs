//! The dealing deck: an ordered stack of cards with burn tracking.

use std::collections::VecDeque;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::card::{Card, Rank, Suit};

/// Number of cards in a standard deck.
pub const DECK_SIZE: usize = 52;

/// An ordered stack of cards. The head is the next card to deal; new cards
/// are pushed on the tail. Burned cards are kept aside (face down) so the
/// full-deck conservation invariant stays checkable during a hand.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    cards: VecDeque<Card>,
    burned: Vec<Card>,
}

impl Deck {
    /// An empty stack.
    pub fn empty() -> Deck {
        Deck::default()
    }

    /// The 52 unique cards in canonical order: suits ♠ ♥ ♦ ♣, ranks
    /// Two through Ace within each suit.
    pub fn new_standard() -> Deck {
        let mut cards = VecDeque::with_capacity(DECK_SIZE);
        for suit in Suit::ALL {
            for rank in Rank::ALL {
                cards.push_back(Card::new(suit, rank));
            }
        }
        Deck {
            cards,
            burned: Vec::new(),
        }
    }

    /// Fisher–Yates shuffle driven by the caller's random source.
    /// Deterministic for a seeded source.
    pub fn shuffle<R: Rng>(&mut self, rng: &mut R) {
        let mut cards: Vec<Card> = self.cards.iter().copied().collect();
        cards.shuffle(rng);
        self.cards = cards.into();
    }

    /// Push a card on the tail.
    pub fn push(&mut self, card: Card) {
        self.cards.push_back(card);
    }

    /// Remove and return the head card.
    pub fn deal(&mut self) -> Option<Card> {
        self.cards.pop_front()
    }

    /// Discard the head card without exposing it. Returns false when the
    /// deck is empty.
    pub fn burn(&mut self) -> bool {
        match self.cards.pop_front() {
            Some(card) => {
                self.burned.push(card);
                true
            }
            None => false,
        }
    }

    pub fn remaining(&self) -> usize {
        self.cards.len()
    }

    pub fn burned_count(&self) -> usize {
        self.burned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Card> {
        self.cards.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn standard_deck_has_52_unique_cards() {
        let deck = Deck::new_standard();
        assert_eq!(deck.remaining(), DECK_SIZE);
        let unique: HashSet<_> = deck.iter().copied().collect();
        assert_eq!(unique.len(), DECK_SIZE);
    }

    #[test]
    fn canonical_order_starts_with_spades() {
        let mut deck = Deck::new_standard();
        assert_eq!(deck.deal(), Some(Card::new(Suit::Spades, Rank::Two)));
        assert_eq!(deck.deal(), Some(Card::new(Suit::Spades, Rank::Three)));
    }

    #[test]
    fn seeded_shuffle_is_deterministic_permutation() {
        let mut a = Deck::new_standard();
        let mut b = Deck::new_standard();
        a.shuffle(&mut StdRng::seed_from_u64(7));
        b.shuffle(&mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);

        let mut c = Deck::new_standard();
        c.shuffle(&mut StdRng::seed_from_u64(8));
        assert_ne!(a, c);

        let shuffled: HashSet<_> = a.iter().copied().collect();
        let standard: HashSet<_> = Deck::new_standard().iter().copied().collect();
        assert_eq!(shuffled, standard);
    }

    #[test]
    fn burn_and_deal_conserve_the_deck() {
        let mut deck = Deck::new_standard();
        assert!(deck.burn());
        let mut dealt = Vec::new();
        for _ in 0..10 {
            dealt.push(deck.deal().unwrap());
        }
        assert_eq!(deck.remaining() + deck.burned_count() + dealt.len(), DECK_SIZE);
    }

    #[test]
    fn dealing_an_empty_deck_yields_none() {
        let mut deck = Deck::empty();
        assert_eq!(deck.deal(), None);
        assert!(!deck.burn());
    }
}
