//! # RGBZET Server
//!
//! Authoritative room/round core for RGBZET, a multiplayer Set-variant
//! card game. Rendering, input handling and the relay transport live in
//! the client; this crate owns the rules, the shared deck, the ZET claim
//! arbitration and the room lifecycle.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      RGBZET SERVER                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  └── rng.rs      - Xorshift128+ PRNG + seed derivation       │
//! │                                                              │
//! │  game/           - Game logic (deterministic)                │
//! │  ├── card.rs     - Card catalog (26 definitions)             │
//! │  ├── matching.rs - Set rule: all-same or all-different       │
//! │  ├── deck.rs     - 80-card shared deck, shuffle + draw       │
//! │  ├── claim.rs    - ZET button: single claimant + cooldown    │
//! │  ├── round.rs    - Round timer, scores, event queue          │
//! │  └── events.rs   - Ordered round events                      │
//! │                                                              │
//! │  network/        - Room coordination (relay-facing)          │
//! │  ├── protocol.rs - Message types                             │
//! │  ├── lobby.rs    - Ready-up and host start gating            │
//! │  └── room.rs     - Room sessions + registry                  │
//! │                                                              │
//! │  store/          - Best-effort document mirrors              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Authority Model
//!
//! The relay designates one member of each room as master; only that
//! peer runs the arbiter and broadcasts its decisions. The `game/`
//! modules are deterministic (no clocks, no global state, seeded
//! randomness), so every peer dealing from the broadcast seed holds the
//! same deck without card lists ever crossing the wire. The document
//! store is a best-effort mirror for discovery and never authoritative
//! for gameplay.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;
pub mod store;

// Re-export commonly used types
pub use crate::core::rng::{DeterministicRng, derive_round_seed};
pub use game::card::{Card, CardCatalog, CardId};
pub use game::claim::{ClaimArbiter, ClaimState, SubmitOutcome};
pub use game::matching::{is_set, set_score};
pub use game::round::{PlayerId, RoundConfig, RoundSession};
pub use network::lobby::RoomLobby;
pub use network::room::{RoomManager, RoomSession};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Distinct card definitions in the standard catalog
pub const CATALOG_SIZE: usize = 26;

/// Cards dealt into a round's deck by default
pub const DEFAULT_DECK_SIZE: usize = 80;
