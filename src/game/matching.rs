//! Set-Rule Engine
//!
//! Pure functions deciding whether three cards form a valid set and what
//! a matched triple scores. Total over any three cards, no state, no
//! failure modes - the claim arbiter calls in here at judgment time.

use crate::game::card::Card;

/// True when the three values are all equal or all pairwise distinct.
///
/// Exactly-two-equal is the only failing shape.
#[inline]
fn attribute_ok<T: PartialEq>(a: T, b: T, c: T) -> bool {
    (a == b && b == c) || (a != b && b != c && a != c)
}

/// Check whether three cards form a valid set.
///
/// Each of the four attributes (letter, color, size, texture) must be
/// all-same or all-different across the triple. The check is symmetric
/// under any permutation of its arguments.
pub fn is_set(a: &Card, b: &Card, c: &Card) -> bool {
    attribute_ok(a.letter, b.letter, c.letter)
        && attribute_ok(a.color, b.color, c.color)
        && attribute_ok(a.size, b.size, c.size)
        && attribute_ok(a.texture, b.texture, c.texture)
}

/// Combined score of a matched triple.
///
/// Only meaningful when [`is_set`] holds; callers check that first.
pub fn set_score(a: &Card, b: &Card, c: &Card) -> u32 {
    a.points + b.points + c.points
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::card::{CardCatalog, CardColor, CardId, CardSize, CardTexture, Letter};
    use proptest::prelude::*;

    fn card(
        letter: Letter,
        color: CardColor,
        size: CardSize,
        texture: CardTexture,
    ) -> Card {
        Card {
            id: CardId(0),
            letter,
            color,
            size,
            texture,
            points: 1,
        }
    }

    #[test]
    fn test_all_same_letter_all_distinct_rest() {
        // letters {A,A,A}, colors {R,G,B}, sizes {S,S,S}, textures {Solid,Striped,Empty}
        let a = card(Letter::A, CardColor::Red, CardSize::Small, CardTexture::Solid);
        let b = card(Letter::A, CardColor::Green, CardSize::Small, CardTexture::Striped);
        let c = card(Letter::A, CardColor::Blue, CardSize::Small, CardTexture::Empty);
        assert!(is_set(&a, &b, &c));
    }

    #[test]
    fn test_two_equal_one_different_fails() {
        // Same as above but colors become {R,R,B}
        let a = card(Letter::A, CardColor::Red, CardSize::Small, CardTexture::Solid);
        let b = card(Letter::A, CardColor::Red, CardSize::Small, CardTexture::Striped);
        let c = card(Letter::A, CardColor::Blue, CardSize::Small, CardTexture::Empty);
        assert!(!is_set(&a, &b, &c));
    }

    #[test]
    fn test_identical_cards_are_a_set() {
        // Sampling with replacement means duplicate triples can land on
        // the board; all four attributes are all-equal, so they match.
        let a = card(Letter::B, CardColor::Green, CardSize::Large, CardTexture::Striped);
        assert!(is_set(&a, &a, &a));
    }

    #[test]
    fn test_all_attributes_distinct() {
        let a = card(Letter::A, CardColor::Red, CardSize::Small, CardTexture::Solid);
        let b = card(Letter::B, CardColor::Green, CardSize::Medium, CardTexture::Striped);
        let c = card(Letter::C, CardColor::Blue, CardSize::Large, CardTexture::Empty);
        assert!(is_set(&a, &b, &c));
    }

    #[test]
    fn test_score_sums_points() {
        let catalog = CardCatalog::standard();
        let a = catalog.get(CardId(0)).unwrap();
        let b = catalog.get(CardId(1)).unwrap();
        let c = catalog.get(CardId(2)).unwrap();
        assert_eq!(set_score(a, b, c), a.points + b.points + c.points);
    }

    fn any_card() -> impl Strategy<Value = Card> {
        (0u8..26).prop_map(|i| *CardCatalog::standard().get(CardId(i)).unwrap())
    }

    proptest! {
        #[test]
        fn prop_is_set_permutation_symmetric(a in any_card(), b in any_card(), c in any_card()) {
            let expected = is_set(&a, &b, &c);
            prop_assert_eq!(is_set(&a, &c, &b), expected);
            prop_assert_eq!(is_set(&b, &a, &c), expected);
            prop_assert_eq!(is_set(&b, &c, &a), expected);
            prop_assert_eq!(is_set(&c, &a, &b), expected);
            prop_assert_eq!(is_set(&c, &b, &a), expected);
        }

        #[test]
        fn prop_is_set_matches_attribute_rule(a in any_card(), b in any_card(), c in any_card()) {
            let expected = attribute_ok(a.letter, b.letter, c.letter)
                && attribute_ok(a.color, b.color, c.color)
                && attribute_ok(a.size, b.size, c.size)
                && attribute_ok(a.texture, b.texture, c.texture);
            prop_assert_eq!(is_set(&a, &b, &c), expected);
        }

        #[test]
        fn prop_score_symmetric(a in any_card(), b in any_card(), c in any_card()) {
            prop_assert_eq!(set_score(&a, &b, &c), set_score(&c, &b, &a));
        }
    }
}
