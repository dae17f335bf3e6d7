//! End-to-end tests over the table tasks and the lobby.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::timeout;

use poker_cards::Card;
use poker_engine::{
    EngineError, Event, EventKind, EventStore, Lobby, MemoryEventStore, Phase, PlayerAction,
    PlayerId, SystemClock, TableId, TableRules,
};

async fn recv_event(rx: &mut broadcast::Receiver<Event>) -> Event {
    timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("event channel closed")
}

struct Seated {
    lobby: Arc<Lobby>,
    table_id: TableId,
    players: Vec<PlayerId>,
    rx: broadcast::Receiver<Event>,
}

/// Create a table on `lobby` with `n` seated, funded players and a
/// subscription that sees everything from the first hand onward.
async fn seated_on(lobby: &Arc<Lobby>, n: usize, rules: TableRules) -> Seated {
    let table_id = lobby.create_table_with_rules("itest", rules).await;
    let mut players = Vec::new();
    for i in 0..n {
        let player = lobby.enter_lobby(&format!("bot-{i}"), 1_000).await;
        lobby.seat(table_id, player.id).await.unwrap();
        lobby.buy_in(table_id, player.id, 500).await.unwrap();
        players.push(player.id);
    }
    let rx = lobby.subscribe_table(table_id).await.unwrap();
    lobby.allow_playing(table_id).await.unwrap();
    Seated {
        lobby: lobby.clone(),
        table_id,
        players,
        rx,
    }
}

async fn seated_table(n: usize, rules: TableRules) -> Seated {
    let lobby = Arc::new(Lobby::new(
        Arc::new(MemoryEventStore::new()),
        Arc::new(SystemClock),
    ));
    seated_on(&lobby, n, rules).await
}

/// React to the event stream the way a transport client would, until the
/// current hand ends. Returns the `HandEnded` payload.
async fn drive_hand(seated: &mut Seated) -> (u64, Vec<PlayerId>) {
    let ante = 10;
    let bet = 30;
    let mut phase = Phase::Start;
    let mut community: Vec<Card> = Vec::new();
    loop {
        let event = recv_event(&mut seated.rx).await;
        match event.kind {
            EventKind::PhaseChanged { to, .. } => phase = to,
            EventKind::CommunityCardDealt { card, .. } => community.push(card),
            EventKind::PlayerTurnStarted { player, .. } => {
                let action = match phase {
                    Phase::Antes => PlayerAction::PlaceAnte { amount: ante },
                    Phase::Continuation => PlayerAction::PlaceContinuationBet { amount: bet },
                    _ => continue,
                };
                seated
                    .lobby
                    .submit_action(seated.table_id, player, action)
                    .await
                    .unwrap();
            }
            EventKind::CommunitySelectionStarted { .. } => {
                let picks: Vec<Card> = community.iter().take(3).copied().collect();
                for &player in &seated.players {
                    for &card in &picks {
                        seated
                            .lobby
                            .submit_action(
                                seated.table_id,
                                player,
                                PlayerAction::SelectCommunityCard { card },
                            )
                            .await
                            .unwrap();
                    }
                }
            }
            EventKind::HandEnded {
                final_pot, winners, ..
            } => return (final_pot, winners),
            _ => {}
        }
    }
}

#[tokio::test]
async fn full_hand_through_the_mailbox() {
    let mut seated = seated_table(2, TableRules::default()).await;
    seated.lobby.start_hand(seated.table_id).await.unwrap();

    let (final_pot, winners) = drive_hand(&mut seated).await;
    assert_eq!(final_pot, 0);
    assert!(!winners.is_empty());

    let snapshot = seated.lobby.snapshot(seated.table_id).await.unwrap();
    let total: u64 = snapshot.buy_ins.values().sum();
    assert_eq!(total, 1_000);

    // Cashing out moves the table chips back to the global balance.
    let leaver = seated.players[0];
    let table_chips = snapshot.buy_ins[&leaver];
    seated
        .lobby
        .leave_table(seated.table_id, leaver)
        .await
        .unwrap();
    assert_eq!(
        seated.lobby.player(leaver).await.unwrap().balance,
        500 + table_chips
    );

    seated.lobby.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn ante_timeout_over_the_runtime() {
    let mut seated = seated_table(2, TableRules::default()).await;
    seated.lobby.start_hand(seated.table_id).await.unwrap();

    // Nobody acts; the paused clock runs straight to the ante deadline.
    let mut timed_out = Vec::new();
    loop {
        let event = recv_event(&mut seated.rx).await;
        match event.kind {
            EventKind::PlayerTimedOut {
                player,
                default_action,
            } => {
                assert_eq!(default_action, "fold");
                timed_out.push(player);
            }
            EventKind::HandEnded { winners, .. } => {
                assert!(winners.is_empty());
                break;
            }
            _ => {}
        }
    }
    assert_eq!(timed_out.len(), 2);

    seated.lobby.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn selection_window_fills_in_over_the_runtime() {
    let mut seated = seated_table(2, TableRules::default()).await;
    seated.lobby.start_hand(seated.table_id).await.unwrap();

    // Play the betting rounds but never select; the window end fills in.
    let mut phase = Phase::Start;
    let mut selected: HashMap<PlayerId, usize> = HashMap::new();
    loop {
        let event = recv_event(&mut seated.rx).await;
        match event.kind {
            EventKind::PhaseChanged { to, .. } => phase = to,
            EventKind::PlayerTurnStarted { player, .. } => {
                let action = match phase {
                    Phase::Antes => PlayerAction::PlaceAnte { amount: 10 },
                    Phase::Continuation => PlayerAction::PlaceContinuationBet { amount: 30 },
                    _ => continue,
                };
                seated
                    .lobby
                    .submit_action(seated.table_id, player, action)
                    .await
                    .unwrap();
            }
            EventKind::CommunityCardSelected { player, .. } => {
                *selected.entry(player).or_default() += 1;
            }
            EventKind::HandEnded { winners, .. } => {
                assert!(!winners.is_empty());
                break;
            }
            _ => {}
        }
    }
    // Every player ended up with a full set of picks without submitting.
    assert_eq!(selected.len(), 2);
    assert!(selected.values().all(|&n| n == 3));

    seated.lobby.shutdown().await;
}

#[tokio::test]
async fn lobby_rejects_bad_requests() {
    let lobby = Lobby::new(Arc::new(MemoryEventStore::new()), Arc::new(SystemClock));
    let ghost_table = TableId::new();
    let player = lobby.enter_lobby("ana", 100).await;

    assert_eq!(
        lobby.seat(ghost_table, player.id).await,
        Err(EngineError::NotFound)
    );
    assert_eq!(
        lobby
            .submit_action(ghost_table, player.id, PlayerAction::Fold)
            .await,
        Err(EngineError::NotFound)
    );

    let table_id = lobby.create_table("small", 10).await;
    lobby.seat(table_id, player.id).await.unwrap();
    assert_eq!(
        lobby.seat(table_id, player.id).await,
        Err(EngineError::AlreadySeated)
    );

    // More than the player owns; the global balance must stay put.
    assert_eq!(
        lobby.buy_in(table_id, player.id, 500).await,
        Err(EngineError::InsufficientChips)
    );
    assert_eq!(lobby.player(player.id).await.unwrap().balance, 100);

    lobby.leave_lobby(player.id).await.unwrap();
    assert_eq!(
        lobby.leave_lobby(player.id).await,
        Err(EngineError::NotFound)
    );

    lobby.shutdown().await;
}

#[tokio::test]
async fn replayed_log_matches_the_runtime_snapshot() {
    let rules = TableRules::default();
    let mut seated = seated_table(3, rules.clone()).await;
    seated.lobby.start_hand(seated.table_id).await.unwrap();
    drive_hand(&mut seated).await;

    // The runtime deals the next hand on its own and then waits on the
    // first ante turn, so both the snapshot and the log are stable here.
    let snapshot = seated.lobby.snapshot(seated.table_id).await.unwrap();
    let events = seated.lobby.store().load(seated.table_id);
    let rebuilt = poker_engine::rebuild(seated.table_id, "itest", rules, &events);
    assert_eq!(rebuilt.snapshot(), snapshot);

    seated.lobby.shutdown().await;
}

#[tokio::test]
async fn tables_play_in_parallel_with_isolated_logs() {
    let lobby = Arc::new(Lobby::new(
        Arc::new(MemoryEventStore::new()),
        Arc::new(SystemClock),
    ));
    let mut a = seated_on(&lobby, 2, TableRules::default()).await;
    let mut b = seated_on(&lobby, 3, TableRules::default()).await;
    lobby.start_hand(a.table_id).await.unwrap();
    lobby.start_hand(b.table_id).await.unwrap();

    let ((pot_a, winners_a), (pot_b, winners_b)) =
        tokio::join!(drive_hand(&mut a), drive_hand(&mut b));
    assert_eq!((pot_a, pot_b), (0, 0));
    assert!(!winners_a.is_empty() && !winners_b.is_empty());

    // The shared store keeps one strictly ordered log per table.
    let store = lobby.store();
    for table_id in [a.table_id, b.table_id] {
        let log = store.load(table_id);
        assert!(!log.is_empty());
        assert!(log.iter().all(|e| e.table_id == Some(table_id)));
        assert!(log.windows(2).all(|w| w[0].sequence < w[1].sequence));
    }

    lobby.shutdown().await;
}

#[tokio::test]
async fn next_hand_starts_automatically() {
    let mut seated = seated_table(2, TableRules::default()).await;
    seated.lobby.start_hand(seated.table_id).await.unwrap();
    drive_hand(&mut seated).await;

    // Without any further request, a new hand begins with the button
    // rotated one seat clockwise.
    loop {
        let event = recv_event(&mut seated.rx).await;
        if let EventKind::HandStarted { button_index, .. } = event.kind {
            assert_eq!(button_index, 1);
            break;
        }
    }

    seated.lobby.shutdown().await;
}
