//! Card Definitions
//!
//! The immutable card catalog every deck draws from. A card is a value:
//! four attributes plus a point value. The catalog is built once and
//! shared read-only; decks reference catalog entries, never mutate them.

use serde::{Serialize, Deserialize};
use std::sync::OnceLock;

/// Catalog index of a card (0..26 in the standard catalog).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CardId(pub u8);

impl std::fmt::Display for CardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Letter printed on the card.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Letter {
    A,
    B,
    C,
    D,
}

/// Card color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardColor {
    Red,
    Green,
    Blue,
}

/// Letter size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardSize {
    Small,
    Medium,
    Large,
}

/// Fill texture of the letter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardTexture {
    Solid,
    Striped,
    Empty,
}

impl CardTexture {
    /// Base point value by texture rarity.
    fn base_points(self) -> u32 {
        match self {
            CardTexture::Solid => 1,
            CardTexture::Striped => 2,
            CardTexture::Empty => 3,
        }
    }
}

/// An immutable card value.
///
/// Cards are owned by the catalog; decks and in-flight triples hold
/// copies of the value, which is never mutated after creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    /// Catalog index.
    pub id: CardId,

    /// Letter attribute.
    pub letter: Letter,

    /// Color attribute.
    pub color: CardColor,

    /// Size attribute.
    pub size: CardSize,

    /// Texture attribute.
    pub texture: CardTexture,

    /// Points awarded when this card is part of a matched triple.
    pub points: u32,
}

/// Attribute table of the standard catalog.
///
/// 26 distinct combinations; letter D cards are the rare ones.
const STANDARD_ATTRIBUTES: [(Letter, CardColor, CardSize, CardTexture); 26] = [
    (Letter::A, CardColor::Red, CardSize::Small, CardTexture::Solid),
    (Letter::A, CardColor::Red, CardSize::Medium, CardTexture::Striped),
    (Letter::A, CardColor::Red, CardSize::Large, CardTexture::Striped),
    (Letter::A, CardColor::Green, CardSize::Small, CardTexture::Striped),
    (Letter::A, CardColor::Green, CardSize::Large, CardTexture::Empty),
    (Letter::A, CardColor::Blue, CardSize::Medium, CardTexture::Solid),
    (Letter::A, CardColor::Blue, CardSize::Large, CardTexture::Empty),
    (Letter::B, CardColor::Red, CardSize::Small, CardTexture::Empty),
    (Letter::B, CardColor::Red, CardSize::Large, CardTexture::Solid),
    (Letter::B, CardColor::Green, CardSize::Medium, CardTexture::Solid),
    (Letter::B, CardColor::Green, CardSize::Large, CardTexture::Striped),
    (Letter::B, CardColor::Blue, CardSize::Small, CardTexture::Solid),
    (Letter::B, CardColor::Blue, CardSize::Medium, CardTexture::Empty),
    (Letter::B, CardColor::Blue, CardSize::Large, CardTexture::Striped),
    (Letter::C, CardColor::Red, CardSize::Small, CardTexture::Striped),
    (Letter::C, CardColor::Red, CardSize::Medium, CardTexture::Empty),
    (Letter::C, CardColor::Green, CardSize::Small, CardTexture::Solid),
    (Letter::C, CardColor::Green, CardSize::Medium, CardTexture::Striped),
    (Letter::C, CardColor::Green, CardSize::Large, CardTexture::Empty),
    (Letter::C, CardColor::Blue, CardSize::Small, CardTexture::Empty),
    (Letter::C, CardColor::Blue, CardSize::Large, CardTexture::Solid),
    (Letter::D, CardColor::Red, CardSize::Small, CardTexture::Solid),
    (Letter::D, CardColor::Red, CardSize::Medium, CardTexture::Empty),
    (Letter::D, CardColor::Green, CardSize::Medium, CardTexture::Striped),
    (Letter::D, CardColor::Blue, CardSize::Small, CardTexture::Striped),
    (Letter::D, CardColor::Blue, CardSize::Large, CardTexture::Empty),
];

/// The immutable set of all distinct card definitions.
///
/// Constructed eagerly and fully before any deck exists, so consumers
/// never have to poll for "is the card data loaded yet".
#[derive(Debug)]
pub struct CardCatalog {
    cards: Vec<Card>,
}

impl CardCatalog {
    /// The standard 26-card catalog.
    pub fn standard() -> &'static CardCatalog {
        static CATALOG: OnceLock<CardCatalog> = OnceLock::new();
        CATALOG.get_or_init(|| {
            let cards = STANDARD_ATTRIBUTES
                .iter()
                .enumerate()
                .map(|(i, &(letter, color, size, texture))| Card {
                    id: CardId(i as u8),
                    letter,
                    color,
                    size,
                    texture,
                    // D is the rare letter and pays a premium
                    points: texture.base_points()
                        + if letter == Letter::D { 1 } else { 0 },
                })
                .collect();
            CardCatalog { cards }
        })
    }

    /// Number of distinct cards.
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// True if the catalog has no entries (never the case for the standard one).
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Look up a card by catalog id.
    pub fn get(&self, id: CardId) -> Option<&Card> {
        self.cards.get(id.0 as usize)
    }

    /// All cards, in id order.
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }
}

// =============================================================================
// TESTS
// =============================================================================
