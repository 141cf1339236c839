//! Room Lobby
//!
//! The pre-round state machine: who is in the room, who is ready, and
//! whether the host may start. Pure state - broadcasting the resulting
//! roster changes is the room orchestrator's job.
//!
//! The host is fixed for the life of the room. If the host leaves, the
//! lobby closes and every member goes back to the menu; there is no host
//! reassignment, by product rule.

use std::collections::BTreeMap;
use thiserror::Error;

use crate::game::round::PlayerId;

/// Lobby gating errors. Recoverable; surfaced as feedback text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LobbyError {
    /// Only the host can start the game.
    #[error("only the host can start the game")]
    NotHost,

    /// Waiting on seats or ready flags.
    #[error("not all players are ready")]
    PlayersNotReady,

    /// No free seat.
    #[error("room is full")]
    RoomFull,

    /// Actor id already seated.
    #[error("already in the room")]
    AlreadyInRoom,

    /// The lobby no longer accepts anything.
    #[error("room is closed")]
    RoomClosed,

    /// The round is starting; the roster is frozen.
    #[error("game is starting")]
    GameStarting,

    /// Actor id not seated in this lobby.
    #[error("unknown player")]
    UnknownPlayer,
}

/// Lobby lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LobbyState {
    /// Accepting joins and ready toggles.
    Open,
    /// Start accepted; handing off to the round.
    Starting,
    /// Torn down; terminal.
    Closed,
}

/// What a departure means for the room.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LobbyExit {
    /// A regular member left; the lobby stays up.
    Left,
    /// The host left; the lobby is now closed and the room must be
    /// torn down.
    HostLeft,
}

/// One seated member.
#[derive(Clone, Debug)]
pub struct LobbyPlayer {
    /// Relay actor id.
    pub id: PlayerId,
    /// Display name.
    pub username: String,
    /// Ready flag; meaningless for the host.
    pub ready: bool,
}

/// Lobby configuration.
#[derive(Debug, Clone, Copy)]
pub struct LobbyConfig {
    /// Seats in the room. 1 makes a single-player room that is always
    /// ready to start.
    pub max_players: usize,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self { max_players: 4 }
    }
}

/// Pre-round membership and start gating for one room.
#[derive(Debug)]
pub struct RoomLobby {
    config: LobbyConfig,
    state: LobbyState,
    host: PlayerId,
    players: BTreeMap<PlayerId, LobbyPlayer>,
}

impl RoomLobby {
    /// Open a lobby with the host already seated.
    pub fn new(host: PlayerId, host_name: impl Into<String>, config: LobbyConfig) -> Self {
        let mut players = BTreeMap::new();
        players.insert(
            host,
            LobbyPlayer {
                id: host,
                username: host_name.into(),
                ready: false,
            },
        );
        Self {
            config,
            state: LobbyState::Open,
            host,
            players,
        }
    }

    /// Seat a new member.
    pub fn join(&mut self, id: PlayerId, username: impl Into<String>) -> Result<(), LobbyError> {
        match self.state {
            LobbyState::Open => {}
            LobbyState::Starting => return Err(LobbyError::GameStarting),
            LobbyState::Closed => return Err(LobbyError::RoomClosed),
        }

        if self.players.len() >= self.config.max_players {
            return Err(LobbyError::RoomFull);
        }

        if self.players.contains_key(&id) {
            return Err(LobbyError::AlreadyInRoom);
        }

        self.players.insert(
            id,
            LobbyPlayer {
                id,
                username: username.into(),
                ready: false,
            },
        );
        Ok(())
    }

    /// Remove a member. A host departure closes the lobby.
    pub fn leave(&mut self, id: PlayerId) -> Result<LobbyExit, LobbyError> {
        if self.players.remove(&id).is_none() {
            return Err(LobbyError::UnknownPlayer);
        }

        if id == self.host {
            self.state = LobbyState::Closed;
            Ok(LobbyExit::HostLeft)
        } else {
            Ok(LobbyExit::Left)
        }
    }

    /// Flip a member's ready flag; returns the new value.
    ///
    /// Callers must broadcast the resulting roster to everyone - start
    /// gating depends on all members seeing the same flags.
    pub fn toggle_ready(&mut self, id: PlayerId) -> Result<bool, LobbyError> {
        match self.state {
            LobbyState::Open => {}
            LobbyState::Starting => return Err(LobbyError::GameStarting),
            LobbyState::Closed => return Err(LobbyError::RoomClosed),
        }
        let player = self
            .players
            .get_mut(&id)
            .ok_or(LobbyError::UnknownPlayer)?;
        player.ready = !player.ready;
        Ok(player.ready)
    }

    /// True when the room is full and every non-host member is ready.
    ///
    /// A single-player room is trivially ready.
    pub fn all_ready(&self) -> bool {
        self.players.len() == self.config.max_players
            && self
                .players
                .values()
                .filter(|p| p.id != self.host)
                .all(|p| p.ready)
    }

    /// Host-only start request; moves the lobby to `Starting` so the
    /// orchestrator can hand the roster to a round.
    pub fn request_start(&mut self, by: PlayerId) -> Result<(), LobbyError> {
        if self.state != LobbyState::Open {
            return Err(LobbyError::RoomClosed);
        }
        if by != self.host {
            return Err(LobbyError::NotHost);
        }
        if !self.all_ready() {
            return Err(LobbyError::PlayersNotReady);
        }
        self.state = LobbyState::Starting;
        Ok(())
    }

    /// Close the lobby (room teardown).
    pub fn close(&mut self) {
        self.state = LobbyState::Closed;
    }

    /// Current state.
    pub fn state(&self) -> LobbyState {
        self.state
    }

    /// The fixed host.
    pub fn host(&self) -> PlayerId {
        self.host
    }

    /// Seated member count.
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Seats in the room.
    pub fn max_players(&self) -> usize {
        self.config.max_players
    }

    /// Member lookup.
    pub fn player(&self, id: &PlayerId) -> Option<&LobbyPlayer> {
        self.players.get(id)
    }

    /// True if the actor is seated.
    pub fn contains(&self, id: &PlayerId) -> bool {
        self.players.contains_key(id)
    }

    /// Members in actor-id order.
    pub fn players(&self) -> impl Iterator<Item = &LobbyPlayer> {
        self.players.values()
    }

    /// Roster handed to a starting round.
    pub fn roster(&self) -> Vec<(PlayerId, String)> {
        self.players
            .values()
            .map(|p| (p.id, p.username.clone()))
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
