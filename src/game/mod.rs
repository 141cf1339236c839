//! Deterministic game logic.
//!
//! Everything in this module is pure state-machine code: no I/O, no
//! system time, no global state. Time enters as explicit `Duration`
//! arguments and randomness as a seeded [`crate::core::rng::DeterministicRng`],
//! so two peers fed the same events stay in lockstep.

pub mod card;
pub mod matching;
pub mod deck;
pub mod claim;
pub mod round;
pub mod events;

// Re-export the types the network layer works with constantly
pub use card::{Card, CardCatalog, CardId};
pub use claim::{ClaimArbiter, ClaimState, SubmitOutcome};
pub use round::{PlayerId, RoundSession, RoundPhase};
