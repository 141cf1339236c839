//! Core deterministic primitives.
//!
//! Everything the shared-deck protocol relies on for cross-peer agreement
//! lives here: a seeded PRNG and the seed-derivation scheme.

pub mod rng;

// Re-export core types
pub use rng::{DeterministicRng, derive_round_seed};
