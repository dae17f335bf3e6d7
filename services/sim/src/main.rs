//! Table simulator: a lobby full of scripted players.
//!
//! Spins up the engine with an in-memory store, seats a few bots and lets
//! them play a configurable number of hands. The bots act purely on the
//! observer stream — the same interface a real transport would use — so a
//! run of this binary exercises the whole engine end to end.
//!
//! Configuration (environment variables, all optional):
//! - `SIM_PLAYERS`: number of seated bots (default 3)
//! - `SIM_HANDS`:   hands to play before exiting (default 2)
//! - `SIM_ANTE`:    ante size in chips (default 10)
//! - `SIM_BUY_IN`:  chips each bot brings to the table (default 500)

use std::sync::Arc;

use poker_cards::Card;
use poker_engine::{
    Event, EventKind, Lobby, MemoryEventStore, Phase, PlayerAction, PlayerId, SystemClock,
    TableId,
};

fn env_or(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let players = env_or("SIM_PLAYERS", 3) as usize;
    let hands = env_or("SIM_HANDS", 2);
    let ante = env_or("SIM_ANTE", 10);
    let buy_in = env_or("SIM_BUY_IN", 500);

    let lobby = Arc::new(Lobby::new(
        Arc::new(MemoryEventStore::new()),
        Arc::new(SystemClock),
    ));
    let table_id = lobby.create_table("sim", ante).await;
    tracing::info!(%table_id, players, hands, ante, "simulation starting");

    let mut bots = Vec::new();
    for i in 0..players {
        let player = lobby.enter_lobby(&format!("bot-{i}"), buy_in * 2).await;
        lobby
            .seat(table_id, player.id)
            .await
            .expect("seat bot");
        lobby
            .buy_in(table_id, player.id, buy_in)
            .await
            .expect("fund bot");
        let rx = lobby
            .subscribe_table(table_id)
            .await
            .expect("subscribe bot");
        bots.push(tokio::spawn(run_bot(
            lobby.clone(),
            table_id,
            player.id,
            ante,
            rx,
        )));
    }

    // The logger doubles as the hand counter that ends the run.
    let mut rx = lobby.subscribe_table(table_id).await.expect("subscribe");
    lobby.allow_playing(table_id).await.expect("allow playing");
    lobby.start_hand(table_id).await.expect("start first hand");

    let mut completed = 0u64;
    while completed < hands {
        match rx.recv().await {
            Ok(event) => {
                log_event(&event);
                if matches!(event.kind, EventKind::HandEnded { .. }) {
                    completed += 1;
                }
            }
            Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "logger lagged behind the event stream");
            }
            Err(_) => break,
        }
    }

    let snapshot = lobby.snapshot(table_id).await.expect("snapshot");
    let chips: u64 = snapshot.buy_ins.values().sum();
    tracing::info!(hands = completed, chips_on_table = chips, "simulation finished");

    lobby.shutdown().await;
    futures::future::join_all(bots).await;
}

fn log_event(event: &Event) {
    match serde_json::to_string(&event.kind) {
        Ok(json) => tracing::info!(seq = event.sequence, event = %json, "event"),
        Err(e) => tracing::warn!(error = %e, "unserializable event"),
    }
}

/// A scripted player: antes and bets on its turns, picks the first three
/// community cards when the selection window opens.
async fn run_bot(
    lobby: Arc<Lobby>,
    table_id: TableId,
    me: PlayerId,
    ante: u64,
    mut rx: tokio::sync::broadcast::Receiver<Event>,
) {
    let mut phase = Phase::Start;
    let mut community: Vec<Card> = Vec::new();
    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
            Err(_) => return,
        };
        match event.kind {
            EventKind::HandStarted { .. } => community.clear(),
            EventKind::PhaseChanged { to, .. } => phase = to,
            EventKind::CommunityCardDealt { card, .. } => community.push(card),
            EventKind::PlayerTurnStarted { player, .. } if player == me => {
                let action = match phase {
                    Phase::Antes => PlayerAction::PlaceAnte { amount: ante },
                    Phase::Continuation => PlayerAction::PlaceContinuationBet { amount: ante * 3 },
                    _ => continue,
                };
                if let Err(e) = lobby.submit_action(table_id, me, action).await {
                    tracing::warn!(player = %me, error = %e, "action rejected");
                }
            }
            EventKind::CommunitySelectionStarted { .. } => {
                let picks: Vec<Card> = community.iter().take(3).copied().collect();
                for card in picks {
                    if let Err(e) = lobby
                        .submit_action(table_id, me, PlayerAction::SelectCommunityCard { card })
                        .await
                    {
                        tracing::warn!(player = %me, error = %e, "selection rejected");
                    }
                }
            }
            _ => {}
        }
    }
}
