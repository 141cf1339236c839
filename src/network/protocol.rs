//! Protocol Messages
//!
//! The message vocabulary exchanged with room members through the relay.
//! All messages are serialized as JSON for debugging ease; the relay's
//! own framing is opaque to this crate.

use serde::{Serialize, Deserialize};

use crate::game::card::CardId;
use crate::game::round::PlayerId;

// =============================================================================
// CLIENT -> ROOM MESSAGES
// =============================================================================

/// Messages sent from a room member to the authoritative peer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Flip the sender's ready flag.
    ToggleReady,

    /// Host-only: start the round.
    StartGame,

    /// Press the ZET button.
    CallZet,

    /// Submit a triple for judging (claimant only).
    SubmitTriple {
        /// Catalog ids of the submitted cards; must be exactly three.
        cards: Vec<CardId>,
    },

    /// Reveal the next cards from the shared deck.
    DrawCards {
        /// How many cards to reveal.
        count: usize,
    },

    /// Leave the room.
    Leave,

    /// Ping for latency measurement.
    Ping {
        /// Sender timestamp, echoed back.
        timestamp: u64,
    },
}

// =============================================================================
// ROOM -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from the authoritative peer to room members.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Lobby roster / ready-state changed.
    LobbyUpdate(LobbySnapshot),

    /// Human-readable feedback for the requesting player only.
    Feedback {
        /// Display text.
        message: String,
    },

    /// The round is starting for everyone.
    RoundStarted(RoundStartInfo),

    /// Someone won the race to the ZET button.
    ZetCalled {
        /// Claim holder.
        actor_id: PlayerId,
        /// Submit window length in milliseconds.
        window_ms: u64,
    },

    /// A claim lapsed with no submission.
    ClaimExpired {
        /// Player who let it lapse.
        actor_id: PlayerId,
    },

    /// A submitted triple was a valid set.
    Matched(MatchInfo),

    /// A submitted triple was not a set; cards return to the board.
    Rejected {
        /// Player whose claim burned.
        actor_id: PlayerId,
        /// The rejected cards.
        cards: [CardId; 3],
    },

    /// Cards revealed from the shared deck.
    CardsDrawn {
        /// Revealed cards in draw order.
        cards: Vec<CardId>,
    },

    /// Round countdown update.
    TimerUpdate {
        /// Whole seconds left on the clock.
        remaining_secs: u64,
    },

    /// Deck is running low; hide the deck visual.
    DeckLow {
        /// Cards left.
        remaining: usize,
    },

    /// The round is over.
    RoundEnded(RoundEndInfo),

    /// The room is being torn down (host left, or master changed).
    RoomClosed {
        /// Why the room closed.
        reason: String,
    },

    /// A request was rejected.
    Error(ServerError),

    /// Pong response.
    Pong {
        /// Echoed sender timestamp.
        timestamp: u64,
    },
}

/// Lobby roster snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LobbySnapshot {
    /// User-facing room code.
    pub room_code: String,
    /// Seats in the room.
    pub max_players: usize,
    /// Members in actor-id order.
    pub players: Vec<PlayerSummary>,
}

/// One row of the roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSummary {
    /// Relay actor id.
    pub actor_id: PlayerId,
    /// Display name.
    pub username: String,
    /// Ready flag (lobby only).
    pub ready: bool,
    /// Whether this member is the host.
    pub is_host: bool,
    /// Current score (0 until a round runs).
    pub score: u32,
}

/// Broadcast when the host starts the round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundStartInfo {
    /// Shared deck seed; every peer deals the same deck from it.
    pub seed: u64,
    /// Round length in seconds.
    pub duration_secs: u64,
    /// Players in the round, actor-id order.
    pub roster: Vec<PlayerSummary>,
}

/// Broadcast when a triple matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchInfo {
    /// Scoring player.
    pub actor_id: PlayerId,
    /// The matched cards, now out of play.
    pub cards: [CardId; 3],
    /// Points this triple earned.
    pub points: u32,
    /// The player's score after the match.
    pub new_score: u32,
}

/// Broadcast when the round timer runs out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundEndInfo {
    /// Final scores in actor-id order.
    pub scores: Vec<PlayerSummary>,
    /// Highest scorer, if anyone scored.
    pub winner: Option<PlayerId>,
}

/// Error codes surfaced to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Only the host can do that.
    NotHost,
    /// Not everyone is ready yet.
    PlayersNotReady,
    /// The room has no free seat.
    RoomFull,
    /// Someone already holds the claim.
    AlreadyClaimed,
    /// Sender does not hold the claim.
    NotClaimant,
    /// The submit window has closed.
    ClaimExpired,
    /// A triple needs exactly three cards.
    WrongCount,
    /// Card id not in the catalog.
    UnknownCard,
    /// The deck has fewer cards than requested.
    DeckExhausted,
    /// No round is running.
    NoActiveRound,
    /// Something unexpected; check server logs.
    Internal,
}

/// A rejected request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerError {
    /// Machine-readable code.
    pub code: ErrorCode,
    /// Human-readable detail.
    pub message: String,
}

impl ServerError {
    /// Build an error message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_tagging() {
        let json = serde_json::to_string(&ClientMessage::ToggleReady).unwrap();
        assert_eq!(json, r#"{"type":"toggle_ready"}"#);

        let json = serde_json::to_string(&ClientMessage::SubmitTriple {
            cards: vec![CardId(1), CardId(2), CardId(3)],
        })
        .unwrap();
        assert!(json.contains(r#""type":"submit_triple""#));
    }

    #[test]
    fn test_server_message_roundtrip() {
        let msg = ServerMessage::Matched(MatchInfo {
            actor_id: PlayerId(3),
            cards: [CardId(0), CardId(5), CardId(9)],
            points: 6,
            new_score: 12,
        });
        let json = serde_json::to_string(&msg).unwrap();
        let back: ServerMessage = serde_json::from_str(&json).unwrap();
        match back {
            ServerMessage::Matched(info) => {
                assert_eq!(info.actor_id, PlayerId(3));
                assert_eq!(info.new_score, 12);
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn test_error_code_encoding() {
        let err = ServerError::new(ErrorCode::PlayersNotReady, "waiting for players");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains(r#""code":"players_not_ready""#));
    }
}
