//! The engine: one registry behind one lock, a tick task, and the command
//! API callers use.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use gridchase_protocol::{Cell, Codec, JsonCodec, LeaderboardEntry, PlayerToken, RoomCode, Snapshot};
use gridchase_room::{Registry, RoomSettings, Subscription, TickReport};
use gridchase_tick::TickScheduler;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::{AdminGate, EngineConfig, EngineError, Joined, Reply};

struct Inner<C> {
    /// Every command and every tick takes this lock once, for its whole
    /// duration, and never awaits while holding it.
    registry: Mutex<Registry>,
    codec: C,
    config: EngineConfig,
    ticks: AtomicU64,
}

/// Handle to a running game engine.
///
/// Cheap to clone; all clones share the same rooms.
///
/// ```rust
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), gridchase::EngineError> {
/// use gridchase::{Engine, EngineConfig, RoomSettings};
///
/// let engine = Engine::new(EngineConfig::default());
/// let code = engine.create_room(RoomSettings::with_grid_size(10)).await?;
///
/// let joined = engine.register(code.as_str(), "alice", "red").await?;
/// engine
///     .submit_move(code.as_str(), joined.payload.token.as_str(), "up")
///     .await?;
///
/// engine.tick_now().await;
/// let snap = engine.snapshot(code.as_str()).await?;
/// assert_eq!(snap.tick, 1);
/// # Ok(())
/// # }
/// ```
pub struct Engine<C: Codec = JsonCodec> {
    inner: Arc<Inner<C>>,
}

impl<C: Codec> Clone for Engine<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Engine<JsonCodec> {
    /// Creates an engine that streams JSON snapshots.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_codec(config, JsonCodec)
    }
}

impl<C: Codec> Engine<C> {
    /// Creates an engine that streams frames encoded by `codec`.
    ///
    /// `config` is validated first; out-of-range values are clamped and
    /// logged rather than rejected.
    pub fn with_codec(config: EngineConfig, codec: C) -> Self {
        let config = config.validated();
        Self {
            inner: Arc::new(Inner {
                registry: Mutex::new(Registry::new(config.registry.clone())),
                codec,
                config,
                ticks: AtomicU64::new(0),
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Ticks resolved so far, by the ticker or by [`tick_now`](Self::tick_now).
    pub fn ticks(&self) -> u64 {
        self.inner.ticks.load(Ordering::Relaxed)
    }

    // -- ticking ------------------------------------------------------------

    /// Starts the background tick task.
    ///
    /// The task runs until the returned handle is aborted or the runtime
    /// shuts down. Start at most one per engine; a second ticker doubles
    /// the game speed.
    pub fn spawn_ticker(&self) -> JoinHandle<()> {
        let engine = self.clone();
        let mut scheduler = TickScheduler::new(self.inner.config.tick.clone());
        tracing::info!(
            period_ms = scheduler.period().as_millis() as u64,
            heartbeat_ticks = self.inner.config.heartbeat_ticks,
            "ticker started"
        );

        tokio::spawn(async move {
            loop {
                let info = scheduler.wait_for_tick().await;
                let report = engine.tick_now().await;
                scheduler.record_tick_end();

                if report.goals > 0 {
                    tracing::debug!(tick = info.tick, goals = report.goals, "goals this tick");
                }
            }
        })
    }

    /// Resolves one tick in every room right now and pushes frames to
    /// subscribers of rooms that changed (or every room, on a heartbeat).
    ///
    /// The ticker calls this; tests call it directly to step the game.
    pub async fn tick_now(&self) -> TickReport {
        let n = self.inner.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        let every = u64::from(self.inner.config.heartbeat_ticks);
        let heartbeat = every > 0 && n % every == 0;

        let report = {
            let mut registry = self.inner.registry.lock().await;
            registry.resolve_tick(&self.inner.codec, heartbeat)
        };

        if report.dropped_frames > 0 {
            tracing::debug!(
                tick = n,
                dropped = report.dropped_frames,
                "subscriber buffers full, frames dropped"
            );
        }
        tracing::trace!(
            tick = n,
            rooms = report.rooms,
            changed = report.changed,
            broadcasts = report.broadcasts,
            heartbeat,
            "tick resolved"
        );
        report
    }

    // -- rooms --------------------------------------------------------------

    /// Creates a room with a random map.
    pub async fn create_room(&self, settings: RoomSettings) -> Result<RoomCode, EngineError> {
        let mut registry = self.inner.registry.lock().await;
        Ok(registry.create_room(settings)?)
    }

    /// Creates a room using [`EngineConfig::default_room`].
    pub async fn create_default_room(&self) -> Result<RoomCode, EngineError> {
        let settings = self.inner.config.default_room.clone();
        self.create_room(settings).await
    }

    /// Creates a room with a hand-designed map.
    pub async fn create_room_with_layout(
        &self,
        settings: RoomSettings,
        obstacles: impl IntoIterator<Item = Cell>,
        goal: Cell,
    ) -> Result<RoomCode, EngineError> {
        let mut registry = self.inner.registry.lock().await;
        Ok(registry.create_room_with_layout(settings, obstacles, goal)?)
    }

    /// Creates a room after checking `secret` against `gate`.
    ///
    /// The gate is consulted before the registry lock is taken.
    pub async fn create_room_as_admin<G: AdminGate>(
        &self,
        gate: &G,
        secret: &str,
        settings: RoomSettings,
    ) -> Result<RoomCode, EngineError> {
        if !gate.verify(secret).await {
            tracing::warn!("room creation refused: bad admin secret");
            return Err(EngineError::Unauthorized);
        }
        self.create_room(settings).await
    }

    /// Codes of every room, sorted.
    pub async fn room_codes(&self) -> Vec<RoomCode> {
        let registry = self.inner.registry.lock().await;
        let mut codes: Vec<RoomCode> = registry.list().map(|(code, _)| code.clone()).collect();
        codes.sort();
        codes
    }

    /// Per-room standings, highest score first.
    pub async fn leaderboard(&self) -> BTreeMap<RoomCode, Vec<LeaderboardEntry>> {
        self.inner.registry.lock().await.leaderboard()
    }

    // -- commands -----------------------------------------------------------

    /// Joins a room. The reply carries a notice when the requested colour
    /// was replaced.
    pub async fn register(
        &self,
        code: &str,
        name: &str,
        color: &str,
    ) -> Result<Reply<Joined>, EngineError> {
        let code = RoomCode::from(code);
        let reg = {
            let mut registry = self.inner.registry.lock().await;
            registry.register(&code, name, color)?
        };
        Ok(Reply::with_notice(
            Joined {
                token: reg.token,
                color: reg.color,
            },
            reg.notice,
        ))
    }

    /// Queues a move for the next tick, replacing any queued one.
    ///
    /// Nothing moves until the tick runs. Walking into a wall or moving in
    /// a finished room still succeeds, with a notice.
    pub async fn submit_move(
        &self,
        code: &str,
        token: &str,
        direction: &str,
    ) -> Result<Reply<()>, EngineError> {
        let code = RoomCode::from(code);
        let token = PlayerToken::from(token);
        let notice = {
            let mut registry = self.inner.registry.lock().await;
            registry.submit_move(&code, &token, direction)?
        };
        tracing::debug!(room = %code, direction, advisory = notice.is_some(), "move queued");
        Ok(Reply::with_notice((), notice))
    }

    /// The room's current state, including the goal and every player's
    /// position. Tokens never appear in it.
    pub async fn snapshot(&self, code: &str) -> Result<Snapshot, EngineError> {
        let registry = self.inner.registry.lock().await;
        Ok(registry.snapshot(&RoomCode::from(code))?)
    }

    /// Subscribes to a room's state frames.
    ///
    /// The subscription yields one frame per tick in which the room changed,
    /// plus heartbeats. A subscriber that falls behind loses frames rather
    /// than slowing the game; [`snapshot`](Self::snapshot) always returns the
    /// current state.
    pub async fn subscribe(&self, code: &str) -> Result<Subscription, EngineError> {
        let registry = self.inner.registry.lock().await;
        Ok(registry.subscribe(&RoomCode::from(code))?)
    }
}

impl<C: Codec> std::fmt::Debug for Engine<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("ticks", &self.ticks())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use gridchase_protocol::ErrorKind;

    use super::*;

    fn engine() -> Engine {
        let mut config = EngineConfig::default();
        config.registry.seed = Some(7);
        Engine::new(config)
    }

    #[tokio::test]
    async fn test_clones_share_rooms() {
        let a = engine();
        let b = a.clone();
        let settings = RoomSettings::with_grid_size(5);
        let code = a.create_room(settings).await.unwrap();
        assert_eq!(b.room_codes().await, vec![code]);
    }

    #[tokio::test]
    async fn test_unknown_room_everywhere() {
        let engine = engine();
        let errors = [
            engine.register("4242", "alice", "red").await.unwrap_err(),
            engine.submit_move("4242", "t", "up").await.unwrap_err(),
            engine.snapshot("4242").await.unwrap_err(),
            engine.subscribe("4242").await.unwrap_err(),
        ];
        for err in errors {
            assert_eq!(err.kind(), ErrorKind::NotFound);
        }
    }

    #[tokio::test]
    async fn test_heartbeat_period() {
        let mut config = EngineConfig::default();
        config.heartbeat_ticks = 3;
        let engine = Engine::new(config);
        let settings = RoomSettings::with_grid_size(5);
        let code = engine.create_room(settings).await.unwrap();
        let _sub = engine.subscribe(code.as_str()).await.unwrap();

        let broadcasts: Vec<usize> = {
            let mut out = Vec::new();
            for _ in 0..6 {
                out.push(engine.tick_now().await.broadcasts);
            }
            out
        };
        assert_eq!(broadcasts, vec![0, 0, 1, 0, 0, 1]);
        assert_eq!(engine.ticks(), 6);
    }

    #[tokio::test]
    async fn test_default_room_uses_config() {
        let mut config = EngineConfig::default();
        config.default_room = RoomSettings::with_grid_size(7);
        let engine = Engine::new(config);
        let code = engine.create_default_room().await.unwrap();
        assert_eq!(engine.snapshot(code.as_str()).await.unwrap().grid_size, 7);
    }
}
