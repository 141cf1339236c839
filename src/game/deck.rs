//! Shared Deck
//!
//! The ordered card sequence a round draws from. Built once per round by
//! sampling the catalog with replacement, shuffled, then consumed through
//! `draw`. The deck is exclusively owned by one round; peers agree on its
//! contents because they agree on the seed, not because it is transmitted.

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::core::rng::DeterministicRng;
use crate::game::card::{Card, CardCatalog};

/// Deck errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeckError {
    /// Draw request exceeds what is left.
    #[error("deck exhausted: requested {requested}, remaining {remaining}")]
    Exhausted {
        /// Cards asked for.
        requested: usize,
        /// Cards actually left.
        remaining: usize,
    },
}

/// The round's card supply.
///
/// Cards before `draw_index` have been revealed; cards at or after it are
/// still face down. `draw` is the only operation that advances the index,
/// and `shuffle` only ever permutes the face-down region.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Deck {
    cards: Vec<Card>,
    draw_index: usize,
}

impl Deck {
    /// Deal a fresh deck of `size` cards sampled uniformly, with
    /// replacement, from the catalog.
    ///
    /// Replacement mirrors the original game's dealing: a 26-card catalog
    /// spread across an 80-card deck, duplicates included.
    pub fn deal(catalog: &CardCatalog, size: usize, rng: &mut DeterministicRng) -> Self {
        let cards = (0..size)
            .map(|_| catalog.cards()[rng.next_index(catalog.len())])
            .collect();
        Self {
            cards,
            draw_index: 0,
        }
    }

    /// Shuffle the remaining (undrawn) cards with an unbiased
    /// Fisher-Yates pass. Already-drawn cards keep their order.
    pub fn shuffle(&mut self, rng: &mut DeterministicRng) {
        let len = self.cards.len();
        for i in self.draw_index..len {
            let j = i + rng.next_index(len - i);
            self.cards.swap(i, j);
        }
    }

    /// Draw the next `n` cards, advancing the draw index.
    ///
    /// Fails with [`DeckError::Exhausted`] instead of underflowing when
    /// fewer than `n` cards remain.
    pub fn draw(&mut self, n: usize) -> Result<&[Card], DeckError> {
        let remaining = self.remaining();
        if n > remaining {
            return Err(DeckError::Exhausted {
                requested: n,
                remaining,
            });
        }
        let start = self.draw_index;
        self.draw_index += n;
        Ok(&self.cards[start..self.draw_index])
    }

    /// Cards not yet drawn.
    pub fn remaining(&self) -> usize {
        self.cards.len() - self.draw_index
    }

    /// Cards already drawn, in draw order.
    pub fn drawn(&self) -> &[Card] {
        &self.cards[..self.draw_index]
    }

    /// Total deck size.
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// True for a zero-card deck.
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::card::CardId;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn test_deck(size: usize, seed: u64) -> Deck {
        let mut rng = DeterministicRng::new(seed);
        Deck::deal(CardCatalog::standard(), size, &mut rng)
    }

    fn id_counts(cards: &[Card]) -> BTreeMap<CardId, usize> {
        let mut counts = BTreeMap::new();
        for card in cards {
            *counts.entry(card.id).or_insert(0) += 1;
        }
        counts
    }

    #[test]
    fn test_deal_size_and_catalog_membership() {
        let deck = test_deck(80, 7);
        assert_eq!(deck.len(), 80);
        assert_eq!(deck.remaining(), 80);
        for card in &deck.cards {
            assert_eq!(CardCatalog::standard().get(card.id), Some(card));
        }
    }

    #[test]
    fn test_deal_is_deterministic() {
        let a = test_deck(80, 99);
        let b = test_deck(80, 99);
        assert_eq!(a.cards, b.cards);
    }

    #[test]
    fn test_draw_advances_and_exhausts() {
        let mut deck = test_deck(5, 1);
        assert_eq!(deck.draw(3).unwrap().len(), 3);
        assert_eq!(deck.remaining(), 2);
        assert_eq!(deck.drawn().len(), 3);

        let err = deck.draw(3).unwrap_err();
        assert_eq!(
            err,
            DeckError::Exhausted {
                requested: 3,
                remaining: 2
            }
        );
        // A failed draw must not move the index
        assert_eq!(deck.remaining(), 2);

        assert_eq!(deck.draw(2).unwrap().len(), 2);
        assert_eq!(deck.remaining(), 0);
    }

    #[test]
    fn test_draw_zero_is_fine() {
        let mut deck = test_deck(3, 1);
        assert_eq!(deck.draw(0).unwrap().len(), 0);
        assert_eq!(deck.remaining(), 3);
    }

    #[test]
    fn test_shuffle_preserves_drawn_prefix() {
        let mut deck = test_deck(20, 5);
        let drawn: Vec<Card> = deck.draw(6).unwrap().to_vec();

        let mut rng = DeterministicRng::new(123);
        deck.shuffle(&mut rng);

        assert_eq!(deck.drawn(), &drawn[..]);
    }

    proptest! {
        /// Shuffling is a bijection on the remaining region: same multiset,
        /// possibly different order.
        #[test]
        fn prop_shuffle_preserves_remaining_multiset(
            size in 1usize..120,
            drawn in 0usize..40,
            deal_seed in any::<u64>(),
            shuffle_seed in any::<u64>(),
        ) {
            let drawn = drawn.min(size);
            let mut deck = test_deck(size, deal_seed);
            deck.draw(drawn).unwrap();

            let before = id_counts(&deck.cards[deck.draw_index..]);
            let mut rng = DeterministicRng::new(shuffle_seed);
            deck.shuffle(&mut rng);
            let after = id_counts(&deck.cards[deck.draw_index..]);

            prop_assert_eq!(before, after);
        }

        /// draw(n) equals n sequential draw(1) calls.
        #[test]
        fn prop_draw_associative(
            size in 3usize..100,
            n in 0usize..20,
            seed in any::<u64>(),
        ) {
            let n = n.min(size);

            let mut bulk = test_deck(size, seed);
            let together: Vec<Card> = bulk.draw(n).unwrap().to_vec();

            let mut one_by_one = test_deck(size, seed);
            let mut singles = Vec::new();
            for _ in 0..n {
                singles.push(one_by_one.draw(1).unwrap()[0]);
            }

            prop_assert_eq!(together, singles);
            prop_assert_eq!(bulk.remaining(), one_by_one.remaining());
        }
    }
}
