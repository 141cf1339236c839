//! RGBZET Server
//!
//! Demo binary: runs a scripted two-player room end to end against the
//! in-memory store, logging the whole lifecycle.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use rgbzet::{
    CATALOG_SIZE, DEFAULT_DECK_SIZE, VERSION,
    game::card::CardId,
    game::round::PlayerId,
    network::protocol::{ClientMessage, ServerMessage},
    network::room::{RoomConfig, RoomManager},
    network::lobby::LobbyConfig,
    store::MemoryStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    info!("RGBZET Server v{}", VERSION);
    info!("Catalog: {} cards, deck: {} cards", CATALOG_SIZE, DEFAULT_DECK_SIZE);

    demo_room().await
}

/// Run a scripted room to exercise the whole pipeline.
async fn demo_room() -> anyhow::Result<()> {
    info!("=== Opening Demo Room ===");

    let manager = RoomManager::new(Arc::new(MemoryStore::new()));
    let config = RoomConfig {
        lobby: LobbyConfig { max_players: 2 },
        ..Default::default()
    };

    let host = PlayerId(1);
    let guest = PlayerId(2);
    let (host_tx, mut host_rx) = mpsc::channel(256);
    let (guest_tx, mut guest_rx) = mpsc::channel(256);

    manager
        .create_room("AB12", host, "alice", host_tx, config)
        .await?;
    manager
        .join_room("AB12", guest, None, "bob", guest_tx)
        .await?;

    // Ready up and start
    manager
        .handle_message("AB12", guest, ClientMessage::ToggleReady)
        .await?;
    manager
        .handle_message("AB12", host, ClientMessage::StartGame)
        .await?;

    // Reveal an opening board
    manager
        .handle_message("AB12", host, ClientMessage::DrawCards { count: 12 })
        .await?;

    // Guest races to the ZET button and submits a triple of duplicates
    manager
        .handle_message("AB12", guest, ClientMessage::CallZet)
        .await?;
    manager
        .handle_message(
            "AB12",
            guest,
            ClientMessage::SubmitTriple {
                cards: vec![CardId(4), CardId(4), CardId(4)],
            },
        )
        .await?;

    // Host tries to call during the cooldown and is rejected
    manager
        .handle_message("AB12", host, ClientMessage::CallZet)
        .await?;

    // Let the round clock run out
    for _ in 0..125 {
        manager.tick_room("AB12", Duration::from_secs(1)).await?;
    }

    // Narrate what each peer heard
    report("alice", &mut host_rx);
    report("bob", &mut guest_rx);

    // Host leaves; the room and its document go away
    manager.leave_room("AB12", host).await?;
    info!("rooms remaining: {}", manager.room_count().await);

    Ok(())
}

/// Log the interesting messages a peer received.
fn report(who: &str, rx: &mut mpsc::Receiver<ServerMessage>) {
    let mut timer_updates = 0usize;
    while let Ok(msg) = rx.try_recv() {
        match msg {
            ServerMessage::RoundStarted(info) => {
                info!("{who}: round started, seed {}", info.seed);
            }
            ServerMessage::ZetCalled { actor_id, .. } => {
                info!("{who}: ZET claimed by {actor_id}");
            }
            ServerMessage::Matched(m) => {
                info!(
                    "{who}: {} matched for {} points (score {})",
                    m.actor_id, m.points, m.new_score
                );
            }
            ServerMessage::Error(e) => {
                info!("{who}: rejected ({:?}: {})", e.code, e.message);
            }
            ServerMessage::RoundEnded(end) => {
                let winner = end
                    .winner
                    .map(|w| w.to_string())
                    .unwrap_or_else(|| "nobody".to_string());
                info!("{who}: round over, winner {winner}");
                for p in &end.scores {
                    info!("{who}:   {} - {} points", p.username, p.score);
                }
            }
            ServerMessage::TimerUpdate { .. } => timer_updates += 1,
            _ => {}
        }
    }
    info!("{who}: {timer_updates} timer updates");
}
