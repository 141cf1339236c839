//! Room Session Management
//!
//! One `RoomSession` per room: it owns the lobby, the active round, and
//! the outbound channel to every member, and it is the single place where
//! relay deliveries (messages and membership callbacks) turn into state
//! transitions and broadcasts. Rooms are independent; the `RoomManager`
//! registry is the only thing they share.
//!
//! The arbiter inside the round is authoritative on exactly one peer (the
//! relay's master). Only that peer runs this code for a room; everyone
//! else converges to its broadcasts.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::rng::derive_round_seed;
use crate::game::card::{Card, CardCatalog, CardId};
use crate::game::claim::ClaimError;
use crate::game::events::GameEventData;
use crate::game::round::{PlayerId, RoundConfig, RoundSession};
use crate::network::lobby::{LobbyConfig, LobbyError, LobbyExit, LobbyState, RoomLobby};
use crate::network::protocol::{
    ClientMessage, ErrorCode, LobbySnapshot, MatchInfo, PlayerSummary, RoundEndInfo,
    RoundStartInfo, ServerError, ServerMessage,
};
use crate::store::{self, DocumentStore};

/// User-facing room code.
pub type RoomCode = String;

/// Room-level errors. Everything gameplay-recoverable is answered with a
/// `ServerMessage` instead; these are structural.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// No room with that code.
    #[error("room not found")]
    RoomNotFound,

    /// A room with that code already exists.
    #[error("room code already in use")]
    RoomExists,

    /// Sender is not seated in the room.
    #[error("not a member of this room")]
    NotAMember,

    /// Lobby rejected a membership change.
    #[error(transparent)]
    Lobby(#[from] LobbyError),
}

/// Room configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoomConfig {
    /// Lobby seating.
    pub lobby: LobbyConfig,
    /// Round timing and deck sizing.
    pub round: RoundConfig,
}

/// Coarse room phase, as clients see it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoomPhase {
    /// Waiting in the lobby.
    Lobby,
    /// A round is running.
    Playing,
    /// The round finished; scores are final.
    Ended,
}

/// Whether the room survives the handled event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[derive(Default)]
pub enum RoomOutcome {
    /// Room stays up.
    #[default]
    Continue,
    /// Room is closed; the manager must drop it and its document.
    Teardown,
}

/// A score that changed and should be mirrored to the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScoreChange {
    /// Scoring player.
    pub actor: PlayerId,
    /// Display name at mirror time.
    pub username: String,
    /// New score.
    pub score: u32,
}

/// Result of handling one delivery.
#[derive(Debug, Default)]
pub struct RoomUpdate {
    /// Whether the room survives.
    pub outcome: RoomOutcome,
    /// Scores to mirror (best-effort, done by the manager).
    pub score_changes: Vec<ScoreChange>,
}

// =============================================================================
// ROOM SESSION
// =============================================================================

/// One room's authoritative state.
pub struct RoomSession {
    code: RoomCode,
    /// Internal id of this room instance; feeds seed derivation.
    session_id: Uuid,
    config: RoomConfig,
    lobby: RoomLobby,
    round: Option<RoundSession>,
    /// Outbound channel per member; the relay glue drains these.
    senders: BTreeMap<PlayerId, mpsc::Sender<ServerMessage>>,
}

impl RoomSession {
    /// Open a room with the host seated.
    pub fn new(
        code: impl Into<RoomCode>,
        host: PlayerId,
        host_name: impl Into<String>,
        host_tx: mpsc::Sender<ServerMessage>,
        config: RoomConfig,
    ) -> Self {
        let code = code.into();
        let session_id = Uuid::new_v4();
        info!(code = %code, %session_id, %host, "room opened");

        let lobby = RoomLobby::new(host, host_name, config.lobby);
        let mut senders = BTreeMap::new();
        senders.insert(host, host_tx);

        Self {
            code,
            session_id,
            config,
            lobby,
            round: None,
            senders,
        }
    }

    /// Room code.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// The fixed host.
    pub fn host(&self) -> PlayerId {
        self.lobby.host()
    }

    /// Coarse phase.
    pub fn phase(&self) -> RoomPhase {
        match &self.round {
            Some(round) if round.is_ended() => RoomPhase::Ended,
            Some(_) => RoomPhase::Playing,
            None => RoomPhase::Lobby,
        }
    }

    /// Lobby view (membership, ready flags).
    pub fn lobby(&self) -> &RoomLobby {
        &self.lobby
    }

    /// Active round, if one is running or just finished.
    pub fn round(&self) -> Option<&RoundSession> {
        self.round.as_ref()
    }

    /// True once the lobby has been torn down.
    pub fn is_closed(&self) -> bool {
        self.lobby.state() == LobbyState::Closed
    }

    // -------------------------------------------------------------------------
    // Relay membership callbacks
    // -------------------------------------------------------------------------

    /// A player joined the relay room.
    pub async fn on_player_joined(
        &mut self,
        id: PlayerId,
        username: impl Into<String>,
        tx: mpsc::Sender<ServerMessage>,
    ) -> Result<(), LobbyError> {
        self.lobby.join(id, username)?;
        self.senders.insert(id, tx);
        info!(code = %self.code, %id, "player joined");
        self.broadcast_lobby().await;
        Ok(())
    }

    /// A player left the relay room. A host departure tears the room
    /// down; everyone else just frees a seat.
    pub async fn on_player_left(&mut self, id: PlayerId) -> RoomOutcome {
        let exit = match self.lobby.leave(id) {
            Ok(exit) => exit,
            Err(_) => return RoomOutcome::Continue,
        };
        self.senders.remove(&id);

        match exit {
            LobbyExit::HostLeft => {
                info!(code = %self.code, %id, "host left; tearing room down");
                self.teardown("The host has left the room.").await;
                RoomOutcome::Teardown
            }
            LobbyExit::Left => {
                info!(code = %self.code, %id, "player left");
                // A round keeps the leaver's score row; their pending
                // claim, if any, expires through the arbiter as usual.
                self.broadcast_lobby().await;
                RoomOutcome::Continue
            }
        }
    }

    /// Relay-level player properties changed (nickname, custom fields).
    /// Gameplay state never lives in relay properties, so this is just a
    /// roster refresh for everyone.
    pub async fn on_properties_changed(&mut self, _id: PlayerId) {
        self.broadcast_lobby().await;
    }

    /// The relay elected a new master. The room does not survive a host
    /// change; this is a teardown, not a migration.
    pub async fn on_master_changed(&mut self, new_master: PlayerId) -> RoomOutcome {
        if new_master == self.lobby.host() {
            return RoomOutcome::Continue;
        }
        warn!(code = %self.code, %new_master, "master changed; tearing room down");
        self.teardown("The room host changed; returning to menu.").await;
        RoomOutcome::Teardown
    }

    // -------------------------------------------------------------------------
    // Message dispatch
    // -------------------------------------------------------------------------

    /// Handle one relay delivery from a seated member.
    pub async fn handle_message(
        &mut self,
        from: PlayerId,
        msg: ClientMessage,
    ) -> Result<RoomUpdate, RoomError> {
        if !self.lobby.contains(&from) {
            return Err(RoomError::NotAMember);
        }

        let mut update = RoomUpdate::default();
        match msg {
            ClientMessage::Ping { timestamp } => {
                self.send_to(from, ServerMessage::Pong { timestamp }).await;
            }

            ClientMessage::ToggleReady => match self.lobby.toggle_ready(from) {
                Ok(ready) => {
                    debug!(code = %self.code, %from, ready, "ready toggled");
                    // Start gating is global consensus; everyone hears it
                    self.broadcast_lobby().await;
                }
                Err(e) => self.send_feedback(from, &e).await,
            },

            ClientMessage::StartGame => match self.lobby.request_start(from) {
                Ok(()) => {
                    update.score_changes = self.start_round().await;
                }
                Err(e) => self.send_feedback(from, &e).await,
            },

            ClientMessage::CallZet => match self.round.as_mut() {
                Some(round) => {
                    let result = round.call_zet(from);
                    update.score_changes = self.pump_round_events().await;
                    if let Err(e) = result {
                        self.send_claim_error(from, e).await;
                    }
                }
                None => self.send_no_round(from).await,
            },

            ClientMessage::SubmitTriple { cards } => {
                update.score_changes = self.handle_submit(from, &cards).await;
            }

            ClientMessage::DrawCards { count } => match self.round.as_mut() {
                Some(round) => match round.draw(count) {
                    Ok(cards) => {
                        let ids: Vec<CardId> = cards.iter().map(|c| c.id).collect();
                        self.broadcast(ServerMessage::CardsDrawn { cards: ids }).await;
                        update.score_changes = self.pump_round_events().await;
                    }
                    Err(e) => {
                        self.send_error(from, ErrorCode::DeckExhausted, e.to_string())
                            .await;
                    }
                },
                None => self.send_no_round(from).await,
            },

            ClientMessage::Leave => {
                update.outcome = self.on_player_left(from).await;
            }
        }

        Ok(update)
    }

    async fn handle_submit(&mut self, from: PlayerId, ids: &[CardId]) -> Vec<ScoreChange> {
        let catalog = CardCatalog::standard();
        let mut cards: Vec<Card> = Vec::with_capacity(ids.len());
        for id in ids {
            match catalog.get(*id) {
                Some(card) => cards.push(*card),
                None => {
                    self.send_error(from, ErrorCode::UnknownCard, format!("unknown card {id}"))
                        .await;
                    return Vec::new();
                }
            }
        }

        let Some(round) = self.round.as_mut() else {
            self.send_no_round(from).await;
            return Vec::new();
        };

        let result = round.submit_triple(from, &cards);
        // Outcome events (matched/rejected/expired) broadcast either way
        let changes = self.pump_round_events().await;
        if let Err(e) = result {
            self.send_claim_error(from, e).await;
        }
        changes
    }

    // -------------------------------------------------------------------------
    // Time
    // -------------------------------------------------------------------------

    /// Advance the room clock. Call at a steady cadence while a round is
    /// running; idles cheaply otherwise.
    pub async fn tick(&mut self, delta: Duration) -> RoomUpdate {
        let mut update = RoomUpdate::default();

        let Some(round) = self.round.as_mut() else {
            return update;
        };
        if round.is_ended() {
            return update;
        }

        round.tick(delta);
        let remaining_secs = round.remaining().as_secs();
        update.score_changes = self.pump_round_events().await;

        // Clients render mm:ss from this
        self.broadcast(ServerMessage::TimerUpdate { remaining_secs }).await;

        update
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    /// Build the round and tell everyone. Scores come back zeroed for
    /// the initial mirror pass.
    async fn start_round(&mut self) -> Vec<ScoreChange> {
        // BTreeMap iteration gives the sorted actor list the seed needs
        let actor_ids: Vec<u32> = self.lobby.players().map(|p| p.id.0).collect();
        let seed = derive_round_seed(&self.code, self.session_id.as_bytes(), &actor_ids);

        let round = RoundSession::start(self.lobby.roster(), self.config.round, seed);
        info!(code = %self.code, seed, "round starting");

        let roster = self.player_summaries();
        let info = RoundStartInfo {
            seed,
            duration_secs: self.config.round.round_duration.as_secs(),
            roster: roster.clone(),
        };
        self.round = Some(round);
        self.broadcast(ServerMessage::RoundStarted(info)).await;

        roster
            .into_iter()
            .map(|p| ScoreChange {
                actor: p.actor_id,
                username: p.username,
                score: 0,
            })
            .collect()
    }

    /// Drain round events into broadcasts; collect score changes for the
    /// manager to mirror.
    async fn pump_round_events(&mut self) -> Vec<ScoreChange> {
        let Some(round) = self.round.as_mut() else {
            return Vec::new();
        };

        let mut events = round.take_events();
        events.sort();

        let mut changes = Vec::new();
        let mut messages = Vec::with_capacity(events.len());

        for event in events {
            match event.data {
                GameEventData::ClaimOpened { player_id, .. } => {
                    messages.push(ServerMessage::ZetCalled {
                        actor_id: player_id,
                        window_ms: self.config.round.claim.claim_window.as_millis() as u64,
                    });
                }
                GameEventData::ClaimExpired { player_id } => {
                    messages.push(ServerMessage::ClaimExpired { actor_id: player_id });
                }
                GameEventData::TripleMatched {
                    player_id,
                    cards,
                    points,
                    new_score,
                } => {
                    let username = self
                        .round
                        .as_ref()
                        .and_then(|r| r.player(&player_id))
                        .map(|p| p.username.clone())
                        .unwrap_or_default();
                    changes.push(ScoreChange {
                        actor: player_id,
                        username,
                        score: new_score,
                    });
                    messages.push(ServerMessage::Matched(MatchInfo {
                        actor_id: player_id,
                        cards,
                        points,
                        new_score,
                    }));
                }
                GameEventData::TripleRejected { player_id, cards } => {
                    messages.push(ServerMessage::Rejected {
                        actor_id: player_id,
                        cards,
                    });
                }
                GameEventData::DeckLow { remaining } => {
                    messages.push(ServerMessage::DeckLow { remaining });
                }
                GameEventData::RoundEnded { winner, .. } => {
                    messages.push(ServerMessage::RoundEnded(RoundEndInfo {
                        scores: self.player_summaries(),
                        winner,
                    }));
                }
            }
        }

        for msg in messages {
            self.broadcast(msg).await;
        }

        changes
    }

    async fn teardown(&mut self, reason: &str) {
        self.broadcast(ServerMessage::RoomClosed {
            reason: reason.to_string(),
        })
        .await;
        self.lobby.close();
        self.round = None;
        self.senders.clear();
    }

    fn player_summaries(&self) -> Vec<PlayerSummary> {
        self.lobby
            .players()
            .map(|p| PlayerSummary {
                actor_id: p.id,
                username: p.username.clone(),
                ready: p.ready,
                is_host: p.id == self.lobby.host(),
                score: self
                    .round
                    .as_ref()
                    .and_then(|r| r.player(&p.id))
                    .map(|row| row.score)
                    .unwrap_or(0),
            })
            .collect()
    }

    fn lobby_snapshot(&self) -> LobbySnapshot {
        LobbySnapshot {
            room_code: self.code.clone(),
            max_players: self.lobby.max_players(),
            players: self.player_summaries(),
        }
    }

    async fn broadcast_lobby(&self) {
        self.broadcast(ServerMessage::LobbyUpdate(self.lobby_snapshot()))
            .await;
    }

    /// Send to every seated member. A full or dropped channel is the
    /// relay glue's problem, not the room's.
    async fn broadcast(&self, message: ServerMessage) {
        for sender in self.senders.values() {
            let _ = sender.send(message.clone()).await;
        }
    }

    async fn send_to(&self, id: PlayerId, message: ServerMessage) {
        if let Some(sender) = self.senders.get(&id) {
            let _ = sender.send(message).await;
        }
    }

    /// Recoverable lobby gating: feedback text for the requester only.
    async fn send_feedback(&self, id: PlayerId, error: &LobbyError) {
        let message = match error {
            LobbyError::NotHost => "Only the host can start the game.".to_string(),
            LobbyError::PlayersNotReady => {
                if self.lobby.player_count() < self.lobby.max_players() {
                    "Not all players have joined yet.".to_string()
                } else {
                    "Waiting for all players to be ready...".to_string()
                }
            }
            other => other.to_string(),
        };
        self.send_to(id, ServerMessage::Feedback { message }).await;
    }

    async fn send_claim_error(&self, id: PlayerId, error: ClaimError) {
        let code = match error {
            ClaimError::AlreadyClaimed => ErrorCode::AlreadyClaimed,
            ClaimError::NotClaimant => ErrorCode::NotClaimant,
            ClaimError::Expired => ErrorCode::ClaimExpired,
            ClaimError::WrongCount(_) => ErrorCode::WrongCount,
        };
        self.send_error(id, code, error.to_string()).await;
    }

    async fn send_no_round(&self, id: PlayerId) {
        self.send_error(id, ErrorCode::NoActiveRound, "no round is running")
            .await;
    }

    async fn send_error(&self, id: PlayerId, code: ErrorCode, message: impl Into<String>) {
        self.send_to(id, ServerMessage::Error(ServerError::new(code, message)))
            .await;
    }
}

// =============================================================================
// ROOM MANAGER
// =============================================================================

/// Registry of live rooms plus the store they mirror into.
///
/// Rooms are `Arc<RwLock<_>>` so the relay glue can hold one while the
/// manager keeps serving other rooms.
pub struct RoomManager<S> {
    store: Arc<S>,
    rooms: RwLock<BTreeMap<RoomCode, Arc<RwLock<RoomSession>>>>,
}

impl<S: DocumentStore> RoomManager<S> {
    /// Create a manager over the given store.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            rooms: RwLock::new(BTreeMap::new()),
        }
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Open a new room and write its discovery record.
    pub async fn create_room(
        &self,
        code: &str,
        host: PlayerId,
        host_name: &str,
        host_tx: mpsc::Sender<ServerMessage>,
        config: RoomConfig,
    ) -> Result<Arc<RwLock<RoomSession>>, RoomError> {
        let mut rooms = self.rooms.write().await;
        if rooms.contains_key(code) {
            return Err(RoomError::RoomExists);
        }

        let session = RoomSession::new(code, host, host_name, host_tx, config);
        let room = Arc::new(RwLock::new(session));
        rooms.insert(code.to_string(), room.clone());
        drop(rooms);

        // Best-effort discovery metadata; the in-memory room is the truth
        store::mirror_room(self.store.as_ref(), code, config.lobby.max_players).await;
        store::mirror_player(self.store.as_ref(), code, host, host_name, 0).await;

        Ok(room)
    }

    /// Seat a player in an existing room.
    ///
    /// The display name comes from the user's profile document when one
    /// exists, falling back to the relay nickname. Store trouble never
    /// blocks the join.
    pub async fn join_room(
        &self,
        code: &str,
        actor: PlayerId,
        user_id: Option<&str>,
        nickname: &str,
        tx: mpsc::Sender<ServerMessage>,
    ) -> Result<(), RoomError> {
        let room = self.get_room(code).await.ok_or(RoomError::RoomNotFound)?;

        if let Some(kind) = store::find_room_kind(self.store.as_ref(), code).await {
            debug!(code, ?kind, "room code resolved");
        }

        let username = match user_id {
            Some(uid) => store::resolve_username(self.store.as_ref(), uid)
                .await
                .unwrap_or_else(|| nickname.to_string()),
            None => nickname.to_string(),
        };

        room.write()
            .await
            .on_player_joined(actor, username.clone(), tx)
            .await?;

        store::mirror_player(self.store.as_ref(), code, actor, &username, 0).await;
        Ok(())
    }

    /// A player left the relay room.
    pub async fn leave_room(&self, code: &str, actor: PlayerId) -> Result<RoomOutcome, RoomError> {
        let room = self.get_room(code).await.ok_or(RoomError::RoomNotFound)?;
        let outcome = room.write().await.on_player_left(actor).await;
        if outcome == RoomOutcome::Teardown {
            self.finish_teardown(code).await;
        }
        Ok(outcome)
    }

    /// The relay elected a new master for the room.
    pub async fn master_changed(
        &self,
        code: &str,
        new_master: PlayerId,
    ) -> Result<RoomOutcome, RoomError> {
        let room = self.get_room(code).await.ok_or(RoomError::RoomNotFound)?;
        let outcome = room.write().await.on_master_changed(new_master).await;
        if outcome == RoomOutcome::Teardown {
            self.finish_teardown(code).await;
        }
        Ok(outcome)
    }

    /// Route a client message into its room and mirror any score changes.
    pub async fn handle_message(
        &self,
        code: &str,
        from: PlayerId,
        msg: ClientMessage,
    ) -> Result<RoomOutcome, RoomError> {
        let room = self.get_room(code).await.ok_or(RoomError::RoomNotFound)?;
        let update = room.write().await.handle_message(from, msg).await?;

        self.mirror_changes(code, &update.score_changes).await;
        if update.outcome == RoomOutcome::Teardown {
            self.finish_teardown(code).await;
        }
        Ok(update.outcome)
    }

    /// Advance one room's clock.
    pub async fn tick_room(&self, code: &str, delta: Duration) -> Result<(), RoomError> {
        let room = self.get_room(code).await.ok_or(RoomError::RoomNotFound)?;
        let update = room.write().await.tick(delta).await;
        self.mirror_changes(code, &update.score_changes).await;
        Ok(())
    }

    /// Look up a room.
    pub async fn get_room(&self, code: &str) -> Option<Arc<RwLock<RoomSession>>> {
        self.rooms.read().await.get(code).cloned()
    }

    /// Live room count.
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Drop rooms whose lobby has closed.
    pub async fn cleanup(&self) {
        let mut rooms = self.rooms.write().await;
        let mut closed = Vec::new();
        for (code, room) in rooms.iter() {
            if room.read().await.is_closed() {
                closed.push(code.clone());
            }
        }
        for code in closed {
            rooms.remove(&code);
        }
    }

    async fn mirror_changes(&self, code: &str, changes: &[ScoreChange]) {
        for change in changes {
            store::mirror_player(
                self.store.as_ref(),
                code,
                change.actor,
                &change.username,
                change.score,
            )
            .await;
        }
    }

    /// Registry and document cleanup after a teardown broadcast.
    async fn finish_teardown(&self, code: &str) {
        self.rooms.write().await.remove(code);
        store::remove_room(self.store.as_ref(), code).await;
        info!(code, "room removed");
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreError};
    use serde_json::Value;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    fn two_player_config() -> RoomConfig {
        RoomConfig {
            lobby: LobbyConfig { max_players: 2 },
            round: RoundConfig::default(),
        }
    }

    struct TestRoom {
        manager: RoomManager<MemoryStore>,
        host_rx: mpsc::Receiver<ServerMessage>,
        guest_rx: mpsc::Receiver<ServerMessage>,
    }

    const HOST: PlayerId = PlayerId(1);
    const GUEST: PlayerId = PlayerId(2);

    /// Room "AB12" with host and guest seated.
    async fn seated_room() -> TestRoom {
        let manager = RoomManager::new(Arc::new(MemoryStore::new()));
        let (host_tx, host_rx) = mpsc::channel(256);
        let (guest_tx, guest_rx) = mpsc::channel(256);

        manager
            .create_room("AB12", HOST, "alice", host_tx, two_player_config())
            .await
            .unwrap();
        manager
            .join_room("AB12", GUEST, None, "bob", guest_tx)
            .await
            .unwrap();

        TestRoom {
            manager,
            host_rx,
            guest_rx,
        }
    }

    /// Ready up and start; returns with the round running.
    async fn started_room() -> TestRoom {
        let room = seated_room().await;
        room.manager
            .handle_message("AB12", GUEST, ClientMessage::ToggleReady)
            .await
            .unwrap();
        room.manager
            .handle_message("AB12", HOST, ClientMessage::StartGame)
            .await
            .unwrap();
        room
    }

    fn drain(rx: &mut mpsc::Receiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            messages.push(msg);
        }
        messages
    }

    #[tokio::test]
    async fn test_end_to_end_ready_start() {
        let mut room = started_room().await;

        let host_msgs = drain(&mut room.host_rx);
        let started = host_msgs.iter().find_map(|m| match m {
            ServerMessage::RoundStarted(info) => Some(info.clone()),
            _ => None,
        });
        let started = started.expect("host must hear RoundStarted");
        assert_eq!(started.duration_secs, 120);
        assert_eq!(started.roster.len(), 2);
        assert!(started.roster.iter().all(|p| p.score == 0));

        // Both peers hear the same start
        let guest_msgs = drain(&mut room.guest_rx);
        assert!(guest_msgs
            .iter()
            .any(|m| matches!(m, ServerMessage::RoundStarted(_))));

        // Fresh 80-card deck behind the scenes
        let handle = room.manager.get_room("AB12").await.unwrap();
        let session = handle.read().await;
        assert_eq!(session.phase(), RoomPhase::Playing);
        assert_eq!(session.round().unwrap().deck_remaining(), 80);
    }

    #[tokio::test]
    async fn test_start_gating_feedback() {
        let mut room = seated_room().await;

        // Guest cannot start
        room.manager
            .handle_message("AB12", GUEST, ClientMessage::StartGame)
            .await
            .unwrap();
        let guest_msgs = drain(&mut room.guest_rx);
        assert!(guest_msgs.iter().any(|m| matches!(
            m,
            ServerMessage::Feedback { message } if message.contains("host")
        )));

        // Host cannot start while the guest is not ready
        room.manager
            .handle_message("AB12", HOST, ClientMessage::StartGame)
            .await
            .unwrap();
        let host_msgs = drain(&mut room.host_rx);
        assert!(host_msgs.iter().any(|m| matches!(
            m,
            ServerMessage::Feedback { message } if message.contains("ready")
        )));

        // And no round appeared
        let handle = room.manager.get_room("AB12").await.unwrap();
        assert_eq!(handle.read().await.phase(), RoomPhase::Lobby);
    }

    #[tokio::test]
    async fn test_ready_toggle_broadcasts_to_everyone() {
        let mut room = seated_room().await;
        drain(&mut room.host_rx);
        drain(&mut room.guest_rx);

        room.manager
            .handle_message("AB12", GUEST, ClientMessage::ToggleReady)
            .await
            .unwrap();

        for rx in [&mut room.host_rx, &mut room.guest_rx] {
            let msgs = drain(rx);
            let snapshot = msgs.iter().find_map(|m| match m {
                ServerMessage::LobbyUpdate(s) => Some(s),
                _ => None,
            });
            let snapshot = snapshot.expect("both peers hear the toggle");
            let guest = snapshot
                .players
                .iter()
                .find(|p| p.actor_id == GUEST)
                .unwrap();
            assert!(guest.ready);
        }
    }

    #[tokio::test]
    async fn test_zet_race_single_winner() {
        let mut room = started_room().await;
        drain(&mut room.host_rx);
        drain(&mut room.guest_rx);

        room.manager
            .handle_message("AB12", GUEST, ClientMessage::CallZet)
            .await
            .unwrap();
        room.manager
            .handle_message("AB12", HOST, ClientMessage::CallZet)
            .await
            .unwrap();

        // Everyone heard exactly one claim, for the guest
        let guest_msgs = drain(&mut room.guest_rx);
        let claims: Vec<_> = guest_msgs
            .iter()
            .filter_map(|m| match m {
                ServerMessage::ZetCalled { actor_id, .. } => Some(*actor_id),
                _ => None,
            })
            .collect();
        assert_eq!(claims, vec![GUEST]);

        // The loser got a private rejection
        let host_msgs = drain(&mut room.host_rx);
        assert!(host_msgs.iter().any(|m| matches!(
            m,
            ServerMessage::Error(e) if e.code == ErrorCode::AlreadyClaimed
        )));
    }

    #[tokio::test]
    async fn test_matched_triple_broadcast_and_mirror() {
        let mut room = started_room().await;

        room.manager
            .handle_message("AB12", GUEST, ClientMessage::CallZet)
            .await
            .unwrap();
        // Three identical cards always match
        room.manager
            .handle_message(
                "AB12",
                GUEST,
                ClientMessage::SubmitTriple {
                    cards: vec![CardId(4), CardId(4), CardId(4)],
                },
            )
            .await
            .unwrap();

        let host_msgs = drain(&mut room.host_rx);
        let info = host_msgs
            .iter()
            .find_map(|m| match m {
                ServerMessage::Matched(info) => Some(info.clone()),
                _ => None,
            })
            .expect("match broadcast");
        assert_eq!(info.actor_id, GUEST);
        assert!(info.new_score > 0);

        // Score mirrored under the room document
        let doc = room
            .manager
            .store()
            .get("withfriends/AB12/players/player_2")
            .await
            .unwrap()
            .expect("mirror written");
        assert_eq!(doc["score"], Value::from(info.new_score));
    }

    #[tokio::test]
    async fn test_submit_unknown_card_rejected_privately() {
        let mut room = started_room().await;
        drain(&mut room.guest_rx);

        room.manager
            .handle_message("AB12", GUEST, ClientMessage::CallZet)
            .await
            .unwrap();
        room.manager
            .handle_message(
                "AB12",
                GUEST,
                ClientMessage::SubmitTriple {
                    cards: vec![CardId(200), CardId(0), CardId(1)],
                },
            )
            .await
            .unwrap();

        let guest_msgs = drain(&mut room.guest_rx);
        assert!(guest_msgs.iter().any(|m| matches!(
            m,
            ServerMessage::Error(e) if e.code == ErrorCode::UnknownCard
        )));
    }

    #[tokio::test]
    async fn test_claim_before_round_rejected() {
        let mut room = seated_room().await;
        room.manager
            .handle_message("AB12", GUEST, ClientMessage::CallZet)
            .await
            .unwrap();
        let guest_msgs = drain(&mut room.guest_rx);
        assert!(guest_msgs.iter().any(|m| matches!(
            m,
            ServerMessage::Error(e) if e.code == ErrorCode::NoActiveRound
        )));
    }

    #[tokio::test]
    async fn test_host_leave_tears_room_down() {
        let mut room = started_room().await;
        drain(&mut room.guest_rx);

        let outcome = room.manager.leave_room("AB12", HOST).await.unwrap();
        assert_eq!(outcome, RoomOutcome::Teardown);

        // The guest is sent back to the menu
        let guest_msgs = drain(&mut room.guest_rx);
        assert!(guest_msgs
            .iter()
            .any(|m| matches!(m, ServerMessage::RoomClosed { .. })));

        // Registry and document both gone
        assert_eq!(room.manager.room_count().await, 0);
        assert!(room
            .manager
            .store()
            .get("withfriends/AB12")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_guest_leave_keeps_room() {
        let room = seated_room().await;
        let outcome = room.manager.leave_room("AB12", GUEST).await.unwrap();
        assert_eq!(outcome, RoomOutcome::Continue);
        assert_eq!(room.manager.room_count().await, 1);
    }

    #[tokio::test]
    async fn test_master_change_tears_room_down() {
        let room = seated_room().await;
        let outcome = room.manager.master_changed("AB12", GUEST).await.unwrap();
        assert_eq!(outcome, RoomOutcome::Teardown);
        assert_eq!(room.manager.room_count().await, 0);
    }

    #[tokio::test]
    async fn test_round_timeout_broadcasts_end_once() {
        let mut room = started_room().await;
        drain(&mut room.host_rx);

        for _ in 0..130 {
            room.manager.tick_room("AB12", secs(1)).await.unwrap();
        }

        let host_msgs = drain(&mut room.host_rx);
        let ended = host_msgs
            .iter()
            .filter(|m| matches!(m, ServerMessage::RoundEnded(_)))
            .count();
        assert_eq!(ended, 1);

        // Timer updates flowed while the round ran
        assert!(host_msgs
            .iter()
            .any(|m| matches!(m, ServerMessage::TimerUpdate { .. })));

        let handle = room.manager.get_room("AB12").await.unwrap();
        assert_eq!(handle.read().await.phase(), RoomPhase::Ended);
    }

    #[tokio::test]
    async fn test_username_resolved_from_store() {
        let store = Arc::new(MemoryStore::new());
        store
            .set("users/uid-9", serde_json::json!({"username": "carol"}))
            .await
            .unwrap();
        let manager = RoomManager::new(store);

        let (host_tx, _host_rx) = mpsc::channel(8);
        let (tx, _rx) = mpsc::channel(8);
        manager
            .create_room("XY99", HOST, "alice", host_tx, two_player_config())
            .await
            .unwrap();
        manager
            .join_room("XY99", GUEST, Some("uid-9"), "fallback", tx)
            .await
            .unwrap();

        let handle = manager.get_room("XY99").await.unwrap();
        let session = handle.read().await;
        assert_eq!(session.lobby().player(&GUEST).unwrap().username, "carol");
    }

    #[tokio::test]
    async fn test_duplicate_room_code_rejected() {
        let manager = RoomManager::new(Arc::new(MemoryStore::new()));
        let (tx1, _rx1) = mpsc::channel(8);
        let (tx2, _rx2) = mpsc::channel(8);

        manager
            .create_room("AB12", HOST, "alice", tx1, two_player_config())
            .await
            .unwrap();
        let err = manager
            .create_room("AB12", GUEST, "bob", tx2, two_player_config())
            .await
            .err();
        assert_eq!(err, Some(RoomError::RoomExists));
    }

    /// Store that refuses every operation; gameplay must not care.
    struct BrokenStore;

    impl DocumentStore for BrokenStore {
        async fn get(&self, _path: &str) -> Result<Option<Value>, StoreError> {
            Err(StoreError::Unavailable("offline".into()))
        }

        async fn set(&self, _path: &str, _value: Value) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("offline".into()))
        }

        async fn remove(&self, _path: &str) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("offline".into()))
        }
    }

    #[tokio::test]
    async fn test_store_failure_does_not_stop_play() {
        let manager = RoomManager::new(Arc::new(BrokenStore));
        let (host_tx, mut host_rx) = mpsc::channel(64);
        let (guest_tx, _guest_rx) = mpsc::channel(64);

        manager
            .create_room("AB12", HOST, "alice", host_tx, two_player_config())
            .await
            .unwrap();
        manager
            .join_room("AB12", GUEST, Some("uid"), "bob", guest_tx)
            .await
            .unwrap();
        manager
            .handle_message("AB12", GUEST, ClientMessage::ToggleReady)
            .await
            .unwrap();
        manager
            .handle_message("AB12", HOST, ClientMessage::StartGame)
            .await
            .unwrap();

        // The round started despite every store write failing
        let msgs = drain(&mut host_rx);
        assert!(msgs
            .iter()
            .any(|m| matches!(m, ServerMessage::RoundStarted(_))));
    }
}
