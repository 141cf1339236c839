//! Round Session
//!
//! One timed round for one room: owns the deck, the claim arbiter and the
//! score table, and drives the countdown to the end-of-round transition.
//! The session is advanced purely by events and `tick` calls delivered on
//! the room's single logical thread; there is no internal clock and no
//! shared state with any other room.

use serde::{Serialize, Deserialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};

use crate::core::rng::DeterministicRng;
use crate::game::card::{Card, CardCatalog};
use crate::game::claim::{ClaimArbiter, ClaimConfig, ClaimError, ClaimState, SubmitOutcome};
use crate::game::deck::{Deck, DeckError};
use crate::game::events::GameEvent;

/// Relay actor number identifying a player within a room.
///
/// Implements Ord for deterministic BTreeMap ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[derive(Default)]
pub struct PlayerId(pub u32);

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "actor{}", self.0)
    }
}

/// Score row for one player in the round.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoundPlayer {
    /// Relay actor id.
    pub id: PlayerId,
    /// Display name.
    pub username: String,
    /// Accumulated score; reset to 0 at round start, mutated only
    /// through [`RoundSession::apply_match`].
    pub score: u32,
}

/// Current phase of the round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundPhase {
    /// Timer running, claims allowed.
    Playing,
    /// Timer ran out; terminal.
    Ended,
}

/// Round configuration.
///
/// The source's constants, promoted to configuration.
#[derive(Debug, Clone, Copy)]
pub struct RoundConfig {
    /// Cards dealt into the deck at round start.
    pub deck_size: usize,
    /// `DeckLow` fires when the remaining count first drops below this.
    pub low_stock_threshold: usize,
    /// Wall-clock length of a round.
    pub round_duration: Duration,
    /// Claim window / cooldown timing.
    pub claim: ClaimConfig,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            deck_size: 80,
            low_stock_threshold: 10,
            round_duration: Duration::from_secs(120),
            claim: ClaimConfig::default(),
        }
    }
}

/// One room's active round.
pub struct RoundSession {
    config: RoundConfig,
    phase: RoundPhase,
    /// Time since round start, advanced only by `tick`.
    elapsed: Duration,
    remaining: Duration,
    deck: Deck,
    arbiter: ClaimArbiter,
    players: BTreeMap<PlayerId, RoundPlayer>,
    /// Events generated since the last `take_events` call.
    pending_events: Vec<GameEvent>,
    deck_low_emitted: bool,
}

impl RoundSession {
    /// Start a round for the given roster.
    ///
    /// Deals and shuffles a fresh deck from the seed, zeroes every score
    /// and opens the claim button. The roster is fixed for the duration;
    /// callers only dispatch actions for players in it.
    pub fn start<I>(roster: I, config: RoundConfig, seed: u64) -> Self
    where
        I: IntoIterator<Item = (PlayerId, String)>,
    {
        let mut rng = DeterministicRng::new(seed);
        let mut deck = Deck::deal(CardCatalog::standard(), config.deck_size, &mut rng);
        deck.shuffle(&mut rng);

        let players: BTreeMap<PlayerId, RoundPlayer> = roster
            .into_iter()
            .map(|(id, username)| {
                (
                    id,
                    RoundPlayer {
                        id,
                        username,
                        score: 0,
                    },
                )
            })
            .collect();

        info!(
            players = players.len(),
            deck = deck.len(),
            duration_secs = config.round_duration.as_secs(),
            "round started"
        );

        Self {
            config,
            phase: RoundPhase::Playing,
            elapsed: Duration::ZERO,
            remaining: config.round_duration,
            deck,
            arbiter: ClaimArbiter::new(config.claim),
            players,
            pending_events: Vec::new(),
            deck_low_emitted: false,
        }
    }

    /// Advance the round clock.
    ///
    /// Drives claim expiry/cooldown and the round countdown. Once the
    /// countdown crosses zero the round ends exactly once; every tick
    /// after that is a no-op.
    pub fn tick(&mut self, delta: Duration) {
        if self.phase == RoundPhase::Ended {
            return;
        }

        self.elapsed += delta;

        let claim = self.arbiter.tick(self.elapsed);
        if let Some(player) = claim.expired {
            debug!(%player, "claim expired unsubmitted");
            self.pending_events
                .push(GameEvent::claim_expired(self.elapsed, player));
        }

        self.remaining = self.remaining.saturating_sub(delta);
        if self.remaining.is_zero() {
            self.end_round();
        }
    }

    /// Press the ZET button on behalf of `player`.
    ///
    /// Returns the submit deadline on success. After the round has ended
    /// the claim can no longer be won.
    pub fn call_zet(&mut self, player: PlayerId) -> Result<Duration, ClaimError> {
        if self.phase == RoundPhase::Ended {
            return Err(ClaimError::Expired);
        }
        let deadline = self.arbiter.call(player, self.elapsed)?;
        self.pending_events
            .push(GameEvent::claim_opened(self.elapsed, player, deadline));
        Ok(deadline)
    }

    /// Judge a submitted triple.
    ///
    /// On a match the score moves through [`Self::apply_match`] - the only
    /// score mutation path - and the cards leave play. On a mismatch the
    /// cards return to wherever the UI had them; nothing moves here. A
    /// submission arriving after the round ended is dropped without
    /// touching any score.
    pub fn submit_triple(
        &mut self,
        player: PlayerId,
        cards: &[Card],
    ) -> Result<SubmitOutcome, ClaimError> {
        if self.phase == RoundPhase::Ended {
            return Err(ClaimError::Expired);
        }

        let outcome = match self.arbiter.submit(player, cards, self.elapsed) {
            Ok(outcome) => outcome,
            Err(ClaimError::Expired) => {
                // Late submit observed the lapse; surface it like tick would
                self.pending_events
                    .push(GameEvent::claim_expired(self.elapsed, player));
                return Err(ClaimError::Expired);
            }
            Err(e) => return Err(e),
        };

        let ids = [cards[0].id, cards[1].id, cards[2].id];
        match outcome {
            SubmitOutcome::Matched { score } => {
                let new_score = self.apply_match(player, score);
                info!(%player, points = score, new_score, "triple matched");
                self.pending_events.push(GameEvent::triple_matched(
                    self.elapsed,
                    player,
                    ids,
                    score,
                    new_score,
                ));
            }
            SubmitOutcome::Rejected => {
                debug!(%player, "triple rejected");
                self.pending_events
                    .push(GameEvent::triple_rejected(self.elapsed, player, ids));
            }
        }

        Ok(outcome)
    }

    /// Draw the next `n` cards for the board.
    ///
    /// Emits a one-shot `DeckLow` advisory when the remaining count first
    /// falls under the configured threshold.
    pub fn draw(&mut self, n: usize) -> Result<Vec<Card>, DeckError> {
        let cards = self.deck.draw(n)?.to_vec();

        let remaining = self.deck.remaining();
        if !self.deck_low_emitted && remaining < self.config.low_stock_threshold {
            self.deck_low_emitted = true;
            self.pending_events
                .push(GameEvent::deck_low(self.elapsed, remaining));
        }

        Ok(cards)
    }

    /// Credit a matched triple to a player. The sole score mutation path.
    fn apply_match(&mut self, player: PlayerId, points: u32) -> u32 {
        match self.players.get_mut(&player) {
            Some(row) => {
                row.score = row.score.saturating_add(points);
                row.score
            }
            None => {
                // Roster is fixed at start; an unknown actor scores nothing
                debug!(%player, "match credit for unknown player dropped");
                0
            }
        }
    }

    fn end_round(&mut self) {
        self.phase = RoundPhase::Ended;

        let scores: Vec<(PlayerId, u32)> = self
            .players
            .values()
            .map(|p| (p.id, p.score))
            .collect();

        // Highest score wins; max_by_key keeps the last maximum, so a
        // tie goes to the highest actor id
        let winner = self
            .players
            .values()
            .filter(|p| p.score > 0)
            .max_by_key(|p| p.score)
            .map(|p| p.id);

        info!(?winner, "round ended");
        self.pending_events
            .push(GameEvent::round_ended(self.elapsed, scores, winner));
    }

    /// Take pending events (consumes them).
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Current phase.
    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    /// True once the timer has run out.
    pub fn is_ended(&self) -> bool {
        self.phase == RoundPhase::Ended
    }

    /// Time left on the round clock.
    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    /// Time since round start.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Cards left in the deck.
    pub fn deck_remaining(&self) -> usize {
        self.deck.remaining()
    }

    /// Current claim state.
    pub fn claim_state(&self) -> ClaimState {
        self.arbiter.state()
    }

    /// Score row for one player.
    pub fn player(&self, id: &PlayerId) -> Option<&RoundPlayer> {
        self.players.get(id)
    }

    /// All score rows in actor-id order.
    pub fn players(&self) -> impl Iterator<Item = &RoundPlayer> {
        self.players.values()
    }

    /// Final scores in actor-id order.
    pub fn scores(&self) -> Vec<(PlayerId, u32)> {
        self.players.values().map(|p| (p.id, p.score)).collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
