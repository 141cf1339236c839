//! Room coordination over the external relay.
//!
//! The relay transport itself (sockets, RPC encoding, room membership
//! bookkeeping) lives outside this crate; it is assumed to deliver
//! ordered, reliable messages and membership callbacks. This module owns
//! what happens with those deliveries: the lobby state machine, the
//! per-room orchestrator and the message vocabulary.

pub mod protocol;
pub mod lobby;
pub mod room;

pub use lobby::{RoomLobby, LobbyError, LobbyState};
pub use room::{RoomSession, RoomManager, RoomOutcome};
