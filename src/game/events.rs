//! Round Events
//!
//! Events generated while a round runs, consumed by the network layer to
//! drive broadcasts and by the UI collaborator to drive visuals.

use serde::{Serialize, Deserialize};
use std::time::Duration;

use crate::game::card::CardId;
use crate::game::round::PlayerId;

/// Priority for event processing order.
///
/// Lower value = processed first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventPriority {
    /// Claim resolutions (match/reject/expiry) land first
    ClaimResolved = 0,
    /// Then new claims
    ClaimOpened = 1,
    /// Then deck advisories
    DeckAdvisory = 2,
    /// Round end last
    RoundLifecycle = 3,
    /// Anything unordered
    Other = 255,
}

/// Round event data.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum GameEventData {
    /// A player won the race to the ZET button
    ClaimOpened {
        /// Claim holder
        player_id: PlayerId,
        /// Submit window end, relative to round start
        deadline: Duration,
    },

    /// A claim lapsed with no submission
    ClaimExpired {
        /// Player who let it lapse
        player_id: PlayerId,
    },

    /// A submitted triple was a valid set
    TripleMatched {
        /// Scoring player
        player_id: PlayerId,
        /// The three matched cards (now out of play)
        cards: [CardId; 3],
        /// Points earned by this triple
        points: u32,
        /// Player's score after the match
        new_score: u32,
    },

    /// A submitted triple was not a set
    TripleRejected {
        /// Player whose claim just burned
        player_id: PlayerId,
        /// The three rejected cards (returned to the board)
        cards: [CardId; 3],
    },

    /// The deck dropped under the low-stock threshold (advisory)
    DeckLow {
        /// Cards left in the deck
        remaining: usize,
    },

    /// The round timer ran out
    RoundEnded {
        /// Final scores in actor-id order
        scores: Vec<(PlayerId, u32)>,
        /// Highest scorer, if anyone scored
        winner: Option<PlayerId>,
    },
}

/// A round event with timing and priority.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameEvent {
    /// Round time when the event occurred
    pub at: Duration,

    /// Processing priority within the same instant
    pub priority: EventPriority,

    /// Player the event concerns, when there is one; breaks ordering ties
    pub player_id: Option<PlayerId>,

    /// What happened
    pub data: GameEventData,
}

impl GameEvent {
    /// Build an event, extracting the tie-breaking player id from the data.
    pub fn new(at: Duration, priority: EventPriority, data: GameEventData) -> Self {
        let player_id = match &data {
            GameEventData::ClaimOpened { player_id, .. } => Some(*player_id),
            GameEventData::ClaimExpired { player_id } => Some(*player_id),
            GameEventData::TripleMatched { player_id, .. } => Some(*player_id),
            GameEventData::TripleRejected { player_id, .. } => Some(*player_id),
            GameEventData::RoundEnded { winner, .. } => *winner,
            GameEventData::DeckLow { .. } => None,
        };

        Self {
            at,
            priority,
            player_id,
            data,
        }
    }

    /// Create a claim-opened event.
    pub fn claim_opened(at: Duration, player_id: PlayerId, deadline: Duration) -> Self {
        Self::new(
            at,
            EventPriority::ClaimOpened,
            GameEventData::ClaimOpened { player_id, deadline },
        )
    }

    /// Create a claim-expired event.
    pub fn claim_expired(at: Duration, player_id: PlayerId) -> Self {
        Self::new(
            at,
            EventPriority::ClaimResolved,
            GameEventData::ClaimExpired { player_id },
        )
    }

    /// Create a triple-matched event.
    pub fn triple_matched(
        at: Duration,
        player_id: PlayerId,
        cards: [CardId; 3],
        points: u32,
        new_score: u32,
    ) -> Self {
        Self::new(
            at,
            EventPriority::ClaimResolved,
            GameEventData::TripleMatched {
                player_id,
                cards,
                points,
                new_score,
            },
        )
    }

    /// Create a triple-rejected event.
    pub fn triple_rejected(at: Duration, player_id: PlayerId, cards: [CardId; 3]) -> Self {
        Self::new(
            at,
            EventPriority::ClaimResolved,
            GameEventData::TripleRejected { player_id, cards },
        )
    }

    /// Create a deck-low advisory.
    pub fn deck_low(at: Duration, remaining: usize) -> Self {
        Self::new(
            at,
            EventPriority::DeckAdvisory,
            GameEventData::DeckLow { remaining },
        )
    }

    /// Create a round-ended event.
    pub fn round_ended(
        at: Duration,
        scores: Vec<(PlayerId, u32)>,
        winner: Option<PlayerId>,
    ) -> Self {
        Self::new(
            at,
            EventPriority::RoundLifecycle,
            GameEventData::RoundEnded { scores, winner },
        )
    }
}

impl PartialEq for GameEvent {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at
            && self.priority == other.priority
            && self.player_id == other.player_id
    }
}

impl Eq for GameEvent {}

impl PartialOrd for GameEvent {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GameEvent {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Sort by: time, then priority, then player_id
        self.at
            .cmp(&other.at)
            .then(self.priority.cmp(&other.priority))
            .then(self.player_id.cmp(&other.player_id))
    }
}
