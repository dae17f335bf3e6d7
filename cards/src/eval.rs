//! Five-card hand evaluation and showdown placing.
//!
//! Evaluations totally order as `(category, tiebreak)` where the tiebreak
//! is a lexicographically compared rank vector whose layout depends on the
//! category. The best five cards out of a larger set are found by
//! enumerating every 5-card combination.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::card::{Card, Rank, Suit};

/// Hand categories, weakest first.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum HandCategory {
    HighCard,
    OnePair,
    TwoPair,
    ThreeOfAKind,
    Straight,
    Flush,
    FullHouse,
    FourOfAKind,
    StraightFlush,
    RoyalFlush,
}

/// A fully comparable hand strength. Field order matters: the derived
/// ordering compares the category first, then the tiebreak vector.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HandEvaluation {
    pub category: HandCategory,
    pub tiebreak: Vec<Rank>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EvalError {
    #[error("need at least five cards, got {0}")]
    NotEnoughCards(usize),
    #[error("the wildcard has no rank or suit")]
    Wildcard,
}

/// Evaluate exactly five cards.
pub fn evaluate_five(cards: &[Card; 5]) -> Result<HandEvaluation, EvalError> {
    let mut ranks = [Rank::Two; 5];
    let mut suits = [Suit::Spades; 5];
    for (i, card) in cards.iter().enumerate() {
        let (suit, rank) = card.parts().ok_or(EvalError::Wildcard)?;
        suits[i] = suit;
        ranks[i] = rank;
    }
    ranks.sort_unstable_by(|a, b| b.cmp(a));

    let is_flush = suits.iter().all(|&s| s == suits[0]);
    let is_straight = ranks
        .windows(2)
        .all(|w| w[0].value() == w[1].value() + 1);
    // A-2-3-4-5 ranks as a five-high straight, never wrapping.
    let is_wheel = ranks == [Rank::Ace, Rank::Five, Rank::Four, Rank::Three, Rank::Two];

    // Group ranks by multiplicity; ranks is descending so groups come out
    // high-to-low.
    let mut groups: Vec<(Rank, u8)> = Vec::with_capacity(5);
    for &r in &ranks {
        match groups.iter_mut().find(|(gr, _)| *gr == r) {
            Some((_, n)) => *n += 1,
            None => groups.push((r, 1)),
        }
    }
    let quad = groups.iter().find(|&&(_, n)| n == 4).map(|&(r, _)| r);
    let trip = groups.iter().find(|&&(_, n)| n == 3).map(|&(r, _)| r);
    let pairs: Vec<Rank> = groups
        .iter()
        .filter(|&&(_, n)| n == 2)
        .map(|&(r, _)| r)
        .collect();
    let kickers = |excluded: &[Rank]| -> Vec<Rank> {
        ranks
            .iter()
            .copied()
            .filter(|r| !excluded.contains(r))
            .collect()
    };

    let eval = if is_flush && is_straight && ranks[0] == Rank::Ace {
        HandEvaluation {
            category: HandCategory::RoyalFlush,
            tiebreak: Vec::new(),
        }
    } else if is_flush && (is_straight || is_wheel) {
        HandEvaluation {
            category: HandCategory::StraightFlush,
            tiebreak: vec![if is_wheel { Rank::Five } else { ranks[0] }],
        }
    } else if let Some(q) = quad {
        let mut tiebreak = vec![q];
        tiebreak.extend(kickers(&[q]));
        HandEvaluation {
            category: HandCategory::FourOfAKind,
            tiebreak,
        }
    } else if let (Some(t), true) = (trip, !pairs.is_empty()) {
        HandEvaluation {
            category: HandCategory::FullHouse,
            tiebreak: vec![t, pairs[0]],
        }
    } else if is_flush {
        HandEvaluation {
            category: HandCategory::Flush,
            tiebreak: ranks.to_vec(),
        }
    } else if is_straight || is_wheel {
        HandEvaluation {
            category: HandCategory::Straight,
            tiebreak: vec![if is_wheel { Rank::Five } else { ranks[0] }],
        }
    } else if let Some(t) = trip {
        let mut tiebreak = vec![t];
        tiebreak.extend(kickers(&[t]));
        HandEvaluation {
            category: HandCategory::ThreeOfAKind,
            tiebreak,
        }
    } else if pairs.len() == 2 {
        let mut tiebreak = vec![pairs[0], pairs[1]];
        tiebreak.extend(kickers(&pairs));
        HandEvaluation {
            category: HandCategory::TwoPair,
            tiebreak,
        }
    } else if pairs.len() == 1 {
        let mut tiebreak = vec![pairs[0]];
        tiebreak.extend(kickers(&pairs));
        HandEvaluation {
            category: HandCategory::OnePair,
            tiebreak,
        }
    } else {
        HandEvaluation {
            category: HandCategory::HighCard,
            tiebreak: ranks.to_vec(),
        }
    };
    Ok(eval)
}

/// Best five-card hand out of `cards` (at least five), by enumerating
/// every 5-card combination and keeping the maximum.
pub fn best_hand(cards: &[Card]) -> Result<HandEvaluation, EvalError> {
    let n = cards.len();
    if n < 5 {
        return Err(EvalError::NotEnoughCards(n));
    }

    let mut best: Option<HandEvaluation> = None;
    let mut idx = [0usize, 1, 2, 3, 4];
    loop {
        let five = [
            cards[idx[0]],
            cards[idx[1]],
            cards[idx[2]],
            cards[idx[3]],
            cards[idx[4]],
        ];
        let eval = evaluate_five(&five)?;
        if best.as_ref().map_or(true, |b| eval > *b) {
            best = Some(eval);
        }

        // Next combination in lexicographic index order.
        let mut i = 5;
        loop {
            if i == 0 {
                return Ok(best.expect("at least one combination"));
            }
            i -= 1;
            if idx[i] != i + n - 5 {
                idx[i] += 1;
                for j in i + 1..5 {
                    idx[j] = idx[j - 1] + 1;
                }
                break;
            }
        }
    }
}

/// One entrant's placed showdown result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Placing<T> {
    pub entrant: T,
    pub evaluation: HandEvaluation,
    /// 0 is the best hand; entrants tying a hand share its place.
    pub place: usize,
    pub is_winner: bool,
}

/// Order entrants best-first and assign places. Every entrant tying the
/// strictly best hand has `is_winner` set.
pub fn rank_showdown<T>(mut entries: Vec<(T, HandEvaluation)>) -> Vec<Placing<T>> {
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    let mut out: Vec<Placing<T>> = Vec::with_capacity(entries.len());
    for (i, (entrant, evaluation)) in entries.into_iter().enumerate() {
        let place = match out.last() {
            Some(prev) if prev.evaluation == evaluation => prev.place,
            _ => i,
        };
        out.push(Placing {
            entrant,
            evaluation,
            is_winner: place == 0,
            place,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hand(cards: [&str; 5]) -> [Card; 5] {
        cards.map(|s| s.parse().unwrap())
    }

    fn eval(cards: [&str; 5]) -> HandEvaluation {
        evaluate_five(&hand(cards)).unwrap()
    }

    #[test]
    fn category_ladder() {
        let royal = eval(["A♠", "K♠", "Q♠", "J♠", "10♠"]);
        let sf = eval(["9♣", "8♣", "7♣", "6♣", "5♣"]);
        let quads = eval(["2♠", "2♥", "2♦", "2♣", "K♠"]);
        let fh = eval(["3♠", "3♥", "3♦", "K♠", "K♥"]);
        let flush = eval(["K♥", "8♥", "6♥", "4♥", "2♥"]);
        let straight = eval(["9♣", "8♦", "7♥", "6♠", "5♣"]);
        let trips = eval(["Q♠", "Q♥", "Q♦", "7♠", "2♥"]);
        let two_pair = eval(["J♠", "J♥", "4♦", "4♠", "9♥"]);
        let pair = eval(["A♠", "A♥", "9♦", "6♠", "3♥"]);
        let high = eval(["A♠", "K♦", "Q♥", "J♠", "9♣"]);

        let ladder = [
            &royal, &sf, &quads, &fh, &flush, &straight, &trips, &two_pair, &pair, &high,
        ];
        for w in ladder.windows(2) {
            assert!(w[0] > w[1], "{:?} should beat {:?}", w[0], w[1]);
        }
        assert_eq!(royal.category, HandCategory::RoyalFlush);
    }

    #[test]
    fn wheel_is_a_five_high_straight() {
        let wheel = eval(["A♠", "2♦", "3♥", "4♠", "5♣"]);
        assert_eq!(wheel.category, HandCategory::Straight);
        assert_eq!(wheel.tiebreak, vec![Rank::Five]);

        let six_high = eval(["2♦", "3♥", "4♠", "5♣", "6♦"]);
        assert!(six_high > wheel);
    }

    #[test]
    fn steel_wheel_is_a_straight_flush_not_royal() {
        let wheel_flush = eval(["A♣", "2♣", "3♣", "4♣", "5♣"]);
        assert_eq!(wheel_flush.category, HandCategory::StraightFlush);
        assert_eq!(wheel_flush.tiebreak, vec![Rank::Five]);
    }

    #[test]
    fn kickers_break_ties() {
        let pair_high_kicker = eval(["8♠", "8♥", "A♦", "6♠", "3♥"]);
        let pair_low_kicker = eval(["8♦", "8♣", "K♦", "6♥", "3♦"]);
        assert!(pair_high_kicker > pair_low_kicker);

        let quads_high = eval(["9♠", "9♥", "9♦", "9♣", "A♠"]);
        let quads_low = eval(["9♠", "9♥", "9♦", "9♣", "K♠"]);
        assert!(quads_high > quads_low);

        let two_pair_hi = eval(["J♠", "J♥", "4♦", "4♠", "9♥"]);
        let two_pair_lo = eval(["J♦", "J♣", "3♦", "3♠", "9♦"]);
        assert!(two_pair_hi > two_pair_lo);
    }

    #[test]
    fn identical_ranks_compare_equal() {
        let a = eval(["A♠", "K♠", "Q♦", "J♠", "9♣"]);
        let b = eval(["A♥", "K♥", "Q♣", "J♥", "9♦"]);
        assert_eq!(a, b);
    }

    #[test]
    fn best_hand_picks_the_strongest_combination() {
        // Seven cards holding a flush and a straight; the flush must win.
        let cards: Vec<Card> = ["2♥", "9♥", "J♥", "Q♥", "K♥", "10♠", "A♦"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        let best = best_hand(&cards).unwrap();
        assert_eq!(best.category, HandCategory::Flush);
    }

    #[test]
    fn best_hand_requires_five_cards() {
        let cards: Vec<Card> = ["2♥", "9♥"].iter().map(|s| s.parse().unwrap()).collect();
        assert_eq!(best_hand(&cards), Err(EvalError::NotEnoughCards(2)));
    }

    #[test]
    fn wildcard_is_rejected() {
        let cards = [
            Card::Wildcard,
            "9♥".parse().unwrap(),
            "J♥".parse().unwrap(),
            "Q♥".parse().unwrap(),
            "K♥".parse().unwrap(),
        ];
        assert_eq!(evaluate_five(&cards), Err(EvalError::Wildcard));
    }

    #[test]
    fn showdown_places_and_ties() {
        let strong = eval(["A♠", "A♥", "9♦", "6♠", "3♥"]);
        let also_strong = eval(["A♦", "A♣", "9♠", "6♥", "3♦"]);
        let weak = eval(["K♠", "Q♦", "9♥", "6♣", "3♠"]);

        let placed = rank_showdown(vec![
            ("p1", weak.clone()),
            ("p2", strong.clone()),
            ("p3", also_strong.clone()),
        ]);

        assert_eq!(placed[0].place, 0);
        assert!(placed[0].is_winner);
        assert_eq!(placed[1].place, 0);
        assert!(placed[1].is_winner);
        assert_eq!(placed[2].place, 2);
        assert!(!placed[2].is_winner);
        assert_eq!(placed[2].entrant, "p1");
    }
}
