//! End-to-end tests through the public engine API.

use std::collections::HashSet;
use std::time::Duration;

use futures_util::StreamExt;
use gridchase::{
    Cell, Engine, EngineConfig, ErrorKind, Frame, Reply, RoomCode, RoomSettings, SharedSecret,
    Snapshot, TerminationMode,
};

// =========================================================================
// Helpers
// =========================================================================

fn config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.registry.seed = Some(2024);
    config
}

/// A room with no walls and the goal at `goal`.
async fn open_room(engine: &Engine, grid_size: u32, goal: Cell) -> RoomCode {
    let settings = RoomSettings::with_grid_size(grid_size);
    let result = engine.create_room_with_layout(settings, [], goal).await;
    result.unwrap()
}

/// Registers `name` and returns their token.
async fn join(engine: &Engine, code: &RoomCode, name: &str, color: &str) -> String {
    let reply = engine.register(code.as_str(), name, color).await.unwrap();
    reply.payload.token.as_str().to_string()
}

async fn send(engine: &Engine, code: &RoomCode, token: &str, dir: &str) -> Reply<()> {
    let result = engine.submit_move(code.as_str(), token, dir).await;
    result.unwrap()
}

async fn view(engine: &Engine, code: &RoomCode) -> Snapshot {
    engine.snapshot(code.as_str()).await.unwrap()
}

fn decode(frame: Frame) -> Snapshot {
    serde_json::from_str(frame.as_str()).unwrap()
}

/// One step from `(x, y)` toward `goal`.
fn toward(x: u32, y: u32, goal: Cell) -> &'static str {
    if x < goal.x {
        "right"
    } else if x > goal.x {
        "left"
    } else if y < goal.y {
        "down"
    } else {
        "up"
    }
}

/// Walks `name` toward the goal until they score or `max_ticks` pass.
async fn chase(
    engine: &Engine,
    code: &RoomCode,
    name: &str,
    token: &str,
    max_ticks: usize,
) -> Snapshot {
    for _ in 0..max_ticks {
        let snap = view(engine, code).await;
        if snap.scores[name] > 0 {
            return snap;
        }
        let me = &snap.players[name];
        send(engine, code, token, toward(me.x, me.y, snap.goal)).await;
        engine.tick_now().await;
    }
    view(engine, code).await
}

// =========================================================================
// Commands
// =========================================================================

#[tokio::test]
async fn test_full_round_trip() {
    let engine = Engine::new(config());
    let code = open_room(&engine, 6, Cell::new(5, 0)).await;

    let joined = engine.register(code.as_str(), "alice", "red").await.unwrap();
    assert_eq!(joined.payload.color, "red");
    assert!(joined.notice.is_none());
    let token = joined.payload.token.as_str();

    let snap = chase(&engine, &code, "alice", token, 20).await;
    assert_eq!(snap.scores["alice"], 1000);
    assert_ne!(snap.goal, Cell::new(5, 0));
    assert!(snap.winner.is_none());
    // Tokens never leak into what viewers see.
    let json = serde_json::to_string(&snap).unwrap();
    assert!(!json.contains(token));
}

#[tokio::test]
async fn test_moves_wait_for_the_tick() {
    let engine = Engine::new(config());
    let code = open_room(&engine, 9, Cell::new(8, 8)).await;
    let token = join(&engine, &code, "alice", "red").await;

    let before = view(&engine, &code).await.players["alice"].clone();
    let dir = if before.x > 0 { "left" } else { "right" };
    send(&engine, &code, &token, dir).await;
    assert_eq!(view(&engine, &code).await.players["alice"], before);

    engine.tick_now().await;
    let after = view(&engine, &code).await.players["alice"].clone();
    assert_ne!((after.x, after.y), (before.x, before.y));
    assert_eq!(after.y, before.y);
}

#[tokio::test]
async fn test_last_queued_move_wins() {
    let engine = Engine::new(config());
    let code = open_room(&engine, 9, Cell::new(8, 8)).await;
    let token = join(&engine, &code, "alice", "red").await;
    let start = view(&engine, &code).await.players["alice"].clone();

    // Pick a vertical direction that isn't blocked by the edge, then
    // overwrite a horizontal one with it.
    let (vertical, dy): (&str, i64) = if start.y > 0 { ("up", -1) } else { ("down", 1) };
    send(&engine, &code, &token, "left").await;
    send(&engine, &code, &token, vertical).await;
    engine.tick_now().await;

    let end = view(&engine, &code).await.players["alice"].clone();
    assert_eq!(end.x, start.x);
    assert_eq!(i64::from(end.y), i64::from(start.y) + dy);
}

#[tokio::test]
async fn test_scenario_two_players_request_red() {
    let engine = Engine::new(config());
    let code = engine.create_default_room().await.unwrap();

    let first = engine.register(code.as_str(), "alice", "red").await.unwrap();
    let second = engine.register(code.as_str(), "bob", "red").await.unwrap();

    assert_eq!(first.payload.color, "red");
    assert_ne!(second.payload.color, "red");
    assert!(second.notice.is_some());
    assert!(gridchase::PALETTE.contains(&second.payload.color.as_str()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_same_color_registrations() {
    let engine = Engine::new(config());
    let code = engine.create_default_room().await.unwrap();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let engine = engine.clone();
            let code = code.clone();
            tokio::spawn(async move {
                let name = format!("player{i}");
                let reply = engine.register(code.as_str(), &name, "red").await;
                reply.unwrap().payload.color
            })
        })
        .collect();

    let mut colors = Vec::new();
    for handle in handles {
        colors.push(handle.await.unwrap());
    }
    assert_eq!(colors.iter().filter(|c| *c == "red").count(), 1);
    assert_eq!(colors.iter().collect::<HashSet<_>>().len(), 8);
}

#[tokio::test]
async fn test_error_kinds() {
    let engine = Engine::new(config());
    let code = engine.create_default_room().await.unwrap();
    let room = code.as_str();
    let token = join(&engine, &code, "alice", "red").await;

    let dup = engine.register(room, "alice", "blue").await.unwrap_err();
    assert_eq!(dup.kind(), ErrorKind::Conflict);
    assert_eq!(view(&engine, &code).await.players.len(), 1);

    let empty = engine.register(room, "", "blue").await.unwrap_err();
    assert_eq!(empty.kind(), ErrorKind::InvalidInput);

    let bad_dir = engine.submit_move(room, &token, "north").await.unwrap_err();
    assert_eq!(bad_dir.kind(), ErrorKind::InvalidInput);

    let bad_token = engine.submit_move(room, "nobody", "up").await.unwrap_err();
    assert_eq!(bad_token.kind(), ErrorKind::NotFound);

    let bad_room = engine.snapshot("0000").await.unwrap_err();
    assert_eq!(bad_room.kind(), ErrorKind::NotFound);

    let too_big = RoomSettings::with_grid_size(10_000);
    let err = engine.create_room(too_big).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[tokio::test]
async fn test_admin_gate() {
    let engine = Engine::new(config());
    let gate = SharedSecret::new("s3cret");

    let err = engine
        .create_room_as_admin(&gate, "guess", RoomSettings::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert!(engine.room_codes().await.is_empty());

    let code = engine
        .create_room_as_admin(&gate, "s3cret", RoomSettings::default())
        .await
        .unwrap();
    assert_eq!(engine.room_codes().await, vec![code]);
}

// =========================================================================
// Scoring
// =========================================================================

#[tokio::test]
async fn test_first_to_goal_room_stops_and_says_so() {
    let engine = Engine::new(config());
    let settings = RoomSettings {
        termination: TerminationMode::FirstToGoal,
        ..RoomSettings::with_grid_size(5)
    };
    let code = engine
        .create_room_with_layout(settings, [], Cell::new(2, 2))
        .await
        .unwrap();
    let token = join(&engine, &code, "alice", "red").await;

    let snap = chase(&engine, &code, "alice", &token, 20).await;
    assert!(snap.finished);
    assert_eq!(snap.winner.as_deref(), Some("alice"));
    assert_eq!(snap.goal, Cell::new(2, 2));

    let reply = send(&engine, &code, &token, "up").await;
    assert!(reply.notice.is_some());
    engine.tick_now().await;
    let after = view(&engine, &code).await;
    assert_eq!(after.players["alice"], snap.players["alice"]);
    assert_eq!(after.scores["alice"], 1000);
}

#[tokio::test]
async fn test_leaderboard_orders_by_score() {
    let engine = Engine::new(config());
    let code = open_room(&engine, 4, Cell::new(3, 3)).await;
    let alice = join(&engine, &code, "alice", "red").await;
    join(&engine, &code, "bob", "blue").await;

    chase(&engine, &code, "alice", &alice, 20).await;

    let boards = engine.leaderboard().await;
    let board = &boards[&code];
    assert_eq!(board[0].name, "alice");
    assert!(board[0].score >= 1000);
    assert_eq!(board[1].name, "bob");
}

// =========================================================================
// Streaming
// =========================================================================

#[tokio::test]
async fn test_saturated_subscriber_still_sees_latest_via_snapshot() {
    let mut cfg = config();
    cfg.registry.subscriber_capacity = 2;
    let engine = Engine::new(cfg);
    let code = open_room(&engine, 20, Cell::new(19, 19)).await;
    let mut slow = engine.subscribe(code.as_str()).await.unwrap();
    let token = join(&engine, &code, "alice", "red").await;

    // Bounce left and right so every tick is a visible change.
    let start = view(&engine, &code).await.players["alice"].clone();
    let (away, back) = if start.x > 0 { ("left", "right") } else { ("right", "left") };
    let mut dropped = 0;
    for i in 0..6 {
        let dir = if i % 2 == 0 { away } else { back };
        send(&engine, &code, &token, dir).await;
        dropped += engine.tick_now().await.dropped_frames;
    }
    assert!(dropped > 0);

    // Only the first two frames made it into the buffer.
    let mut buffered = Vec::new();
    while let Some(frame) = slow.try_recv() {
        buffered.push(decode(frame).tick);
    }
    assert_eq!(buffered, vec![1, 2]);

    let now = view(&engine, &code).await;
    assert_eq!(now.tick, 6);
    assert_eq!(now.players["alice"].x, start.x);
}

#[tokio::test(start_paused = true)]
async fn test_ticker_streams_changes() {
    let engine = Engine::new(config());
    let code = open_room(&engine, 10, Cell::new(9, 9)).await;
    let mut viewer = engine.subscribe(code.as_str()).await.unwrap();
    let token = join(&engine, &code, "alice", "red").await;

    let ticker = engine.spawn_ticker();

    let first = decode(viewer.next().await.unwrap());
    assert_eq!(first.tick, 1);
    let me = first.players["alice"].clone();

    let dir = if me.x > 0 { "left" } else { "right" };
    send(&engine, &code, &token, dir).await;
    let second = decode(viewer.next().await.unwrap());
    assert_eq!(second.tick, 2);
    assert_ne!(second.players["alice"].x, me.x);

    // Quiet ticks send nothing until the heartbeat at tick 10.
    let third = decode(viewer.next().await.unwrap());
    assert_eq!(third.tick, 10);

    ticker.abort();
    assert!(engine.ticks() >= 10);
}

#[tokio::test(start_paused = true)]
async fn test_event_stream_framing() {
    let engine = Engine::new(config());
    let code = engine.create_default_room().await.unwrap();
    let mut viewer = engine.subscribe(code.as_str()).await.unwrap();
    join(&engine, &code, "alice", "red").await;
    let _ticker = engine.spawn_ticker();

    let frame = tokio::time::timeout(Duration::from_secs(1), viewer.recv())
        .await
        .unwrap()
        .unwrap();
    let event = frame.to_event_stream();
    assert!(event.starts_with("data: {"));
    assert!(event.ends_with("}\n\n"));
}

#[tokio::test]
async fn test_dropping_subscription_unsubscribes() {
    let engine = Engine::new(config());
    let code = engine.create_default_room().await.unwrap();
    let viewer = engine.subscribe(code.as_str()).await.unwrap();
    join(&engine, &code, "alice", "red").await;
    viewer.close();

    // No one is listening, so nothing is encoded or sent.
    let report = engine.tick_now().await;
    assert_eq!(report.changed, 1);
    assert_eq!(report.broadcasts, 0);
}
