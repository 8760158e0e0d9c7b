//! Room registry: owns every room and its fan-out.
//!
//! The registry is synchronous and takes no locks of its own. Its owner
//! holds exclusive access (`&mut self`) for the duration of each call; the
//! engine keeps it behind a single async mutex.

use std::collections::{BTreeMap, HashMap};

use gridchase_protocol::{Cell, Codec, Direction, LeaderboardEntry, PlayerToken, RoomCode, Snapshot};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::ids::{self, ROOM_CODE_SPACE};
use crate::resolver::{self, TickOutcome};
use crate::{Fanout, Registration, RegistryConfig, Room, RoomError, RoomSettings, Subscription};

struct Entry {
    room: Room,
    fanout: Fanout,
}

/// Summary of one [`Registry::resolve_tick`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub rooms: usize,
    /// Rooms whose state changed this tick.
    pub changed: usize,
    /// Rooms a frame was built and offered for.
    pub broadcasts: usize,
    /// Frames dropped because a subscriber buffer was full.
    pub dropped_frames: usize,
    pub goals: usize,
}

/// Owns all rooms, keyed by code.
pub struct Registry {
    rooms: HashMap<RoomCode, Entry>,
    config: RegistryConfig,
    rng: StdRng,
}

impl Registry {
    /// Creates an empty registry. A configured seed makes room codes, maps,
    /// spawn cells and colours reproducible.
    pub fn new(config: RegistryConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        Self {
            rooms: HashMap::new(),
            config,
            rng,
        }
    }

    // -- lifecycle ----------------------------------------------------------

    /// Creates a room with a random map and returns its code.
    ///
    /// The room is visible to lookups immediately and is resolved from the
    /// next tick on.
    pub fn create_room(&mut self, settings: RoomSettings) -> Result<RoomCode, RoomError> {
        settings.validate(self.config.max_grid_size)?;
        let code = self.allocate_code()?;
        let room = Room::generate(code, &settings, &mut self.rng)?;
        Ok(self.insert(room, "room created"))
    }

    /// Creates a room with a fixed map.
    pub fn create_room_with_layout(
        &mut self,
        settings: RoomSettings,
        obstacles: impl IntoIterator<Item = Cell>,
        goal: Cell,
    ) -> Result<RoomCode, RoomError> {
        settings.validate(self.config.max_grid_size)?;
        let code = self.allocate_code()?;
        let RoomSettings {
            grid_size,
            termination,
            ..
        } = settings;
        let room = Room::with_layout(code, grid_size, termination, obstacles, goal)?;
        Ok(self.insert(room, "room created from layout"))
    }

    fn allocate_code(&mut self) -> Result<RoomCode, RoomError> {
        if self.rooms.len() >= ROOM_CODE_SPACE {
            return Err(RoomError::CodesExhausted);
        }
        let rooms = &self.rooms;
        Ok(ids::new_room_code(&mut self.rng, |c| rooms.contains_key(c)))
    }

    fn insert(&mut self, room: Room, what: &'static str) -> RoomCode {
        let code = room.code().clone();
        tracing::info!(
            room = %code,
            grid_size = room.grid_size(),
            obstacles = room.obstacles().count(),
            mode = ?room.termination(),
            "{what}"
        );
        let fanout = Fanout::new(code.clone(), self.config.subscriber_capacity);
        self.rooms.insert(code.clone(), Entry { room, fanout });
        code
    }

    // -- lookups ------------------------------------------------------------

    /// Looks a room up by code.
    pub fn get(&self, code: &RoomCode) -> Result<&Room, RoomError> {
        self.rooms
            .get(code)
            .map(|e| &e.room)
            .ok_or_else(|| RoomError::NotFound(code.clone()))
    }

    fn entry_mut(&mut self, code: &RoomCode) -> Result<&mut Entry, RoomError> {
        self.rooms
            .get_mut(code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))
    }

    /// Every room, in no particular order.
    pub fn list(&self) -> impl Iterator<Item = (&RoomCode, &Room)> + '_ {
        self.rooms.iter().map(|(code, e)| (code, &e.room))
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Per-room leaderboards keyed by code.
    pub fn leaderboard(&self) -> BTreeMap<RoomCode, Vec<LeaderboardEntry>> {
        self.list()
            .map(|(code, room)| (code.clone(), room.leaderboard()))
            .collect()
    }

    // -- commands -----------------------------------------------------------

    /// Adds a player to a room. See [`Room::register`].
    pub fn register(
        &mut self,
        code: &RoomCode,
        name: &str,
        color: &str,
    ) -> Result<Registration, RoomError> {
        let entry = self
            .rooms
            .get_mut(code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;
        entry.room.register(name, color, &mut self.rng)
    }

    /// Queues a move. Lookups run before the direction is parsed, so an
    /// unknown room or token wins over a bad direction.
    pub fn submit_move(
        &mut self,
        code: &RoomCode,
        token: &PlayerToken,
        direction: &str,
    ) -> Result<Option<String>, RoomError> {
        let room = &mut self.entry_mut(code)?.room;
        if room.player(token).is_none() {
            return Err(RoomError::PlayerNotFound(code.clone()));
        }
        let dir: Direction = direction.parse()?;
        room.set_intent(token, dir)
    }

    /// The room's current state, as viewers see it.
    pub fn snapshot(&self, code: &RoomCode) -> Result<Snapshot, RoomError> {
        self.get(code).map(Room::snapshot)
    }

    /// Opens a feed of the room's frames. Frames start with the next tick
    /// that broadcasts; call [`snapshot`](Self::snapshot) for the state now.
    pub fn subscribe(&self, code: &RoomCode) -> Result<Subscription, RoomError> {
        self.rooms
            .get(code)
            .map(|e| e.fanout.subscribe())
            .ok_or_else(|| RoomError::NotFound(code.clone()))
    }

    // -- ticking ------------------------------------------------------------

    /// Resolves one tick in every room and offers a frame to each room's
    /// subscribers when the room changed, or unconditionally when
    /// `heartbeat` is set.
    ///
    /// Frames are only encoded for rooms that have subscribers. Never
    /// waits on a subscriber.
    pub fn resolve_tick<C: Codec>(&mut self, codec: &C, heartbeat: bool) -> TickReport {
        let mut report = TickReport {
            rooms: self.rooms.len(),
            ..TickReport::default()
        };

        for (code, entry) in &mut self.rooms {
            let outcome: TickOutcome = resolver::resolve(&mut entry.room, &mut self.rng);
            let changed = outcome.changed() | entry.room.take_dirty();
            report.goals += outcome.goals.len();
            if changed {
                report.changed += 1;
            }
            if !(changed || heartbeat) || entry.fanout.subscriber_count() == 0 {
                continue;
            }

            match codec.encode_frame(&entry.room.snapshot()) {
                Ok(frame) => {
                    let sent = entry.fanout.broadcast(&frame);
                    report.broadcasts += 1;
                    report.dropped_frames += sent.dropped;
                }
                Err(e) => {
                    tracing::error!(room = %code, error = %e, "failed to encode snapshot");
                }
            }
        }

        report
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("rooms", &self.rooms.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
