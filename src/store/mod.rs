//! Document Store
//!
//! Best-effort persistence behind the rooms: discovery metadata, player
//! name/score mirrors, user profiles. The in-memory room state is always
//! authoritative for gameplay; everything here is a cache for discovery
//! and reconnect, so write failures are logged and play continues.
//!
//! The backing service is abstracted as an async key-value document
//! store. Tests and the demo binary use [`MemoryStore`].

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::warn;

use crate::game::round::PlayerId;

/// Store failures. Never fatal to gameplay.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing service rejected or dropped the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A document did not (de)serialize.
    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Async key-value document store.
///
/// Paths are `/`-separated strings; documents are JSON values. `set`
/// overwrites whole documents - callers write small, self-contained
/// records.
pub trait DocumentStore: Send + Sync {
    /// Fetch a document, `None` when absent.
    fn get(&self, path: &str) -> impl Future<Output = Result<Option<Value>, StoreError>> + Send;

    /// Write a document, creating intermediate paths implicitly.
    fn set(&self, path: &str, value: Value) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Remove a document and everything beneath its path.
    fn remove(&self, path: &str) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// What kind of room a code refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomKind {
    /// Private room created from the friends flow.
    WithFriends,
    /// Bracketed tournament room.
    Tournament,
}

/// Discovery record for a friends room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomRecord {
    /// User-facing code.
    pub room_code: String,
    /// Seats.
    pub max_players: usize,
    /// Creation stamp.
    pub created_at: DateTime<Utc>,
}

/// Name/score mirror for one player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerRecord {
    /// Display name.
    pub name: String,
    /// Last mirrored score.
    pub score: u32,
    /// Write stamp.
    pub updated_at: DateTime<Utc>,
}

/// User profile document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// Display name chosen at signup.
    pub username: String,
}

/// One tournament entry under the `tournaments` document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentRecord {
    /// The code players type in.
    pub tournament_id: String,
    /// Tournament display name.
    pub name: String,
}

/// Document path layout.
pub mod paths {
    use crate::game::round::PlayerId;

    /// Friends-room discovery record.
    pub fn room(code: &str) -> String {
        format!("withfriends/{code}")
    }

    /// Per-player mirror under a friends room.
    pub fn room_player(code: &str, actor: PlayerId) -> String {
        format!("withfriends/{code}/players/player_{}", actor.0)
    }

    /// The tournaments index document.
    pub fn tournaments() -> String {
        "tournaments".to_string()
    }

    /// A user profile.
    pub fn user(user_id: &str) -> String {
        format!("users/{user_id}")
    }
}

// =============================================================================
// IN-MEMORY STORE
// =============================================================================

/// In-memory [`DocumentStore`] for tests and the demo binary.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: RwLock<BTreeMap<String, Value>>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents held (test helper).
    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    /// True when nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.docs.read().await.is_empty()
    }
}

impl DocumentStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.docs.read().await.get(path).cloned())
    }

    async fn set(&self, path: &str, value: Value) -> Result<(), StoreError> {
        self.docs.write().await.insert(path.to_string(), value);
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<(), StoreError> {
        let prefix = format!("{path}/");
        let mut docs = self.docs.write().await;
        docs.remove(path);
        docs.retain(|k, _| !k.starts_with(&prefix));
        Ok(())
    }
}

// =============================================================================
// MIRROR HELPERS (log-and-continue)
// =============================================================================

/// Write the discovery record for a freshly created room.
pub async fn mirror_room<S: DocumentStore>(store: &S, code: &str, max_players: usize) {
    let record = RoomRecord {
        room_code: code.to_string(),
        max_players,
        created_at: Utc::now(),
    };
    let result = match serde_json::to_value(&record) {
        Ok(value) => store.set(&paths::room(code), value).await,
        Err(e) => Err(StoreError::from(e)),
    };
    if let Err(e) = result {
        warn!(code, error = %e, "room record write failed; continuing");
    }
}

/// Mirror one player's name and score under the room document.
pub async fn mirror_player<S: DocumentStore>(
    store: &S,
    code: &str,
    actor: PlayerId,
    name: &str,
    score: u32,
) {
    let record = PlayerRecord {
        name: name.to_string(),
        score,
        updated_at: Utc::now(),
    };
    let result = match serde_json::to_value(&record) {
        Ok(value) => store.set(&paths::room_player(code, actor), value).await,
        Err(e) => Err(StoreError::from(e)),
    };
    if let Err(e) = result {
        warn!(code, %actor, error = %e, "player mirror write failed; continuing");
    }
}

/// Delete a room's backing document on teardown.
pub async fn remove_room<S: DocumentStore>(store: &S, code: &str) {
    if let Err(e) = store.remove(&paths::room(code)).await {
        warn!(code, error = %e, "room record removal failed");
    }
}

/// Resolve a user's display name from their profile document.
///
/// Absent profiles and store failures both yield `None`; the caller
/// falls back to the relay-provided nickname.
pub async fn resolve_username<S: DocumentStore>(store: &S, user_id: &str) -> Option<String> {
    match store.get(&paths::user(user_id)).await {
        Ok(Some(doc)) => match serde_json::from_value::<UserRecord>(doc) {
            Ok(record) => Some(record.username),
            Err(e) => {
                warn!(user_id, error = %e, "malformed user record");
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            warn!(user_id, error = %e, "user lookup failed");
            None
        }
    }
}

/// Figure out what kind of room a code refers to.
///
/// Tournaments are checked first (scanning the index for a matching
/// `tournamentId`), then friends rooms by direct lookup - the same
/// resolution order players see in the join flow.
pub async fn find_room_kind<S: DocumentStore>(store: &S, code: &str) -> Option<RoomKind> {
    match store.get(&paths::tournaments()).await {
        Ok(Some(Value::Object(entries))) => {
            for entry in entries.values() {
                let id = entry.get("tournamentId").and_then(|v| v.as_str());
                if id == Some(code) {
                    return Some(RoomKind::Tournament);
                }
            }
        }
        Ok(_) => {}
        Err(e) => warn!(code, error = %e, "tournament index lookup failed"),
    }

    match store.get(&paths::room(code)).await {
        Ok(Some(_)) => Some(RoomKind::WithFriends),
        Ok(None) => None,
        Err(e) => {
            warn!(code, error = %e, "room lookup failed");
            None
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// A store whose every operation fails.
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
    async fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.get("withfriends/AB12").await.unwrap().is_none());

        store
            .set("withfriends/AB12", json!({"room_code": "AB12"}))
            .await
            .unwrap();
        let doc = store.get("withfriends/AB12").await.unwrap().unwrap();
        assert_eq!(doc["room_code"], "AB12");

        store.remove("withfriends/AB12").await.unwrap();
        assert!(store.get("withfriends/AB12").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remove_clears_subtree() {
        let store = MemoryStore::new();
        mirror_room(&store, "AB12", 4).await;
        mirror_player(&store, "AB12", PlayerId(1), "alice", 3).await;

        remove_room(&store, "AB12").await;
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_mirror_player_layout() {
        let store = MemoryStore::new();
        mirror_player(&store, "AB12", PlayerId(2), "bob", 9).await;

        let doc = store
            .get("withfriends/AB12/players/player_2")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc["name"], "bob");
        assert_eq!(doc["score"], 9);
    }

    #[tokio::test]
    async fn test_resolve_username() {
        let store = MemoryStore::new();
        store
            .set("users/uid-7", json!({"username": "carol"}))
            .await
            .unwrap();

        assert_eq!(
            resolve_username(&store, "uid-7").await,
            Some("carol".to_string())
        );
        assert_eq!(resolve_username(&store, "uid-8").await, None);
    }

    #[tokio::test]
    async fn test_find_room_kind_checks_tournaments_first() {
        let store = MemoryStore::new();
        store
            .set(
                "tournaments",
                json!({
                    "t1": {"tournamentId": "CUP42", "name": "Spring Cup"},
                }),
            )
            .await
            .unwrap();
        mirror_room(&store, "AB12", 4).await;

        assert_eq!(
            find_room_kind(&store, "CUP42").await,
            Some(RoomKind::Tournament)
        );
        assert_eq!(
            find_room_kind(&store, "AB12").await,
            Some(RoomKind::WithFriends)
        );
        assert_eq!(find_room_kind(&store, "NOPE").await, None);
    }

    #[tokio::test]
    async fn test_broken_store_never_panics() {
        let store = BrokenStore;
        // All of these log and carry on
        mirror_room(&store, "AB12", 4).await;
        mirror_player(&store, "AB12", PlayerId(1), "alice", 0).await;
        remove_room(&store, "AB12").await;
        assert_eq!(resolve_username(&store, "uid").await, None);
        assert_eq!(find_room_kind(&store, "AB12").await, None);
    }
}
