//! ZET Claim Arbiter
//!
//! The exclusive "call" mechanic: the first player to press ZET wins a
//! time-boxed window to submit a triple for judging; everyone else is
//! rejected until the button cools down. One arbiter per room, owned by
//! that room's round - never process-wide.
//!
//! All times are durations since round start, passed in explicitly; the
//! arbiter never reads a clock.

use serde::{Serialize, Deserialize};
use std::time::Duration;
use thiserror::Error;

use crate::game::card::Card;
use crate::game::matching::{is_set, set_score};
use crate::game::round::PlayerId;

/// Claim misuse errors. All recoverable; the caller just hears "no".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ClaimError {
    /// Someone already holds the claim, or the button is cooling down.
    #[error("ZET already claimed")]
    AlreadyClaimed,

    /// Submitter is not the player holding the claim.
    #[error("not the claimant")]
    NotClaimant,

    /// The submit window has closed.
    #[error("claim window expired")]
    Expired,

    /// A triple must be exactly three cards.
    #[error("expected 3 cards, got {0}")]
    WrongCount(usize),
}

/// Arbiter state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClaimState {
    /// Button available; the next `call` wins.
    Idle,
    /// One player holds the claim until the deadline.
    Claimed {
        /// Who pressed ZET first.
        claimant: PlayerId,
        /// Submit window end, relative to round start.
        deadline: Duration,
    },
    /// Button unavailable until the cooldown elapses.
    Cooldown {
        /// Cooldown end, relative to round start.
        until: Duration,
    },
}

/// Result of judging a submitted triple.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The triple is a valid set; the claimant earns `score`.
    Matched {
        /// Combined points of the three cards.
        score: u32,
    },
    /// Not a valid set; the cards go back where they were.
    Rejected,
}

/// Time-driven transitions applied by a `tick` call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClaimTick {
    /// A claim expired with no submission; this player held it.
    pub expired: Option<PlayerId>,
    /// The cooldown finished and the button is available again.
    pub reopened: bool,
}

/// Claim timing configuration.
#[derive(Debug, Clone, Copy)]
pub struct ClaimConfig {
    /// How long the claimant has to submit a triple.
    pub claim_window: Duration,
    /// How long the button stays unavailable after a claim resolves.
    pub cooldown: Duration,
}

impl Default for ClaimConfig {
    fn default() -> Self {
        Self {
            claim_window: Duration::from_secs(4),
            cooldown: Duration::from_secs(7),
        }
    }
}

/// Single-claimant call coordinator.
#[derive(Clone, Debug)]
pub struct ClaimArbiter {
    config: ClaimConfig,
    state: ClaimState,
}

impl ClaimArbiter {
    /// Create an idle arbiter.
    pub fn new(config: ClaimConfig) -> Self {
        Self {
            config,
            state: ClaimState::Idle,
        }
    }

    /// Current state.
    pub fn state(&self) -> ClaimState {
        self.state
    }

    /// Press the ZET button.
    ///
    /// Only succeeds from `Idle`; the first caller in a race wins and
    /// every later caller gets [`ClaimError::AlreadyClaimed`] - rejected,
    /// not queued. Returns the submit deadline on success.
    pub fn call(&mut self, player: PlayerId, now: Duration) -> Result<Duration, ClaimError> {
        match self.state {
            ClaimState::Idle => {
                let deadline = now + self.config.claim_window;
                self.state = ClaimState::Claimed {
                    claimant: player,
                    deadline,
                };
                Ok(deadline)
            }
            ClaimState::Claimed { .. } | ClaimState::Cooldown { .. } => {
                Err(ClaimError::AlreadyClaimed)
            }
        }
    }

    /// Submit a triple for judging.
    ///
    /// Valid only while `player` holds an unexpired claim and exactly
    /// three cards are supplied. Either outcome closes the claim and
    /// starts the cooldown.
    pub fn submit(
        &mut self,
        player: PlayerId,
        cards: &[Card],
        now: Duration,
    ) -> Result<SubmitOutcome, ClaimError> {
        let (claimant, deadline) = match self.state {
            ClaimState::Claimed { claimant, deadline } => (claimant, deadline),
            _ => return Err(ClaimError::NotClaimant),
        };

        if claimant != player {
            return Err(ClaimError::NotClaimant);
        }

        if now >= deadline {
            // Late submit observes the expiry; cooldown runs from the
            // deadline, as if tick had caught it.
            self.state = ClaimState::Cooldown {
                until: deadline + self.config.cooldown,
            };
            return Err(ClaimError::Expired);
        }

        if cards.len() != 3 {
            return Err(ClaimError::WrongCount(cards.len()));
        }

        let outcome = if is_set(&cards[0], &cards[1], &cards[2]) {
            SubmitOutcome::Matched {
                score: set_score(&cards[0], &cards[1], &cards[2]),
            }
        } else {
            SubmitOutcome::Rejected
        };

        self.state = ClaimState::Cooldown {
            until: now + self.config.cooldown,
        };

        Ok(outcome)
    }

    /// Apply time-driven transitions.
    ///
    /// An expired claim releases to cooldown (reported exactly once, with
    /// the claimant who let it lapse), and an elapsed cooldown reopens
    /// the button. A single call handles both when `now` jumped past
    /// claim deadline and cooldown end together.
    pub fn tick(&mut self, now: Duration) -> ClaimTick {
        let mut result = ClaimTick::default();

        if let ClaimState::Claimed { claimant, deadline } = self.state {
            if now >= deadline {
                self.state = ClaimState::Cooldown {
                    until: deadline + self.config.cooldown,
                };
                result.expired = Some(claimant);
            }
        }

        if let ClaimState::Cooldown { until } = self.state {
            if now >= until {
                self.state = ClaimState::Idle;
                result.reopened = true;
            }
        }

        result
    }

    /// Force the arbiter back to idle (round restart).
    pub fn reset(&mut self) {
        self.state = ClaimState::Idle;
    }
}

// =============================================================================
// TESTS
// =============================================================================
