//! One playable grid: obstacles, goal, players, scores.
//!
//! A `Room` is plain data plus the checks that keep it consistent. It does
//! no locking and no I/O. The [`Registry`](crate::Registry) owns every room
//! and is responsible for exclusive access; the
//! [`resolver`](crate::resolver) is the only code that moves players.

use std::collections::{BTreeMap, HashMap, HashSet};

use gridchase_protocol::{
    Cell, Direction, LeaderboardEntry, PlayerToken, PlayerView, RoomCode, Snapshot,
    TerminationMode,
};
use rand::Rng;
use rand::seq::IndexedRandom;

use crate::config::{PALETTE, RESERVED_COLORS};
use crate::{RoomError, RoomSettings, ids};

/// Rejection-sampling attempts before falling back to enumerating free
/// cells. Only crowded grids ever get past this.
const FREE_CELL_ATTEMPTS: usize = 64;

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// A registered player.
///
/// Players are owned by their [`Room`] and only read from outside it; the
/// room mutates them through registration, queued moves, and ticks.
#[derive(Debug, Clone)]
pub struct Player {
    pub(crate) token: PlayerToken,
    pub(crate) name: String,
    pub(crate) color: String,
    pub(crate) position: Cell,
    pub(crate) pending_intent: Option<Direction>,
}

impl Player {
    /// The secret handle the player submits moves with.
    pub fn token(&self) -> &PlayerToken {
        &self.token
    }

    /// Display name, unique within the room.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    /// Where the player stands after the last resolved tick.
    pub fn position(&self) -> Cell {
        self.position
    }

    /// The move queued for the next tick, if any.
    pub fn pending_intent(&self) -> Option<Direction> {
        self.pending_intent
    }

    /// The public, token-free view of this player.
    pub fn view(&self) -> PlayerView {
        PlayerView {
            name: self.name.clone(),
            color: self.color.clone(),
            x: self.position.x,
            y: self.position.y,
        }
    }
}

/// What a successful registration hands back to the player.
#[derive(Debug, Clone)]
pub struct Registration {
    pub token: PlayerToken,
    /// The colour actually assigned; differs from the request when the
    /// requested one was taken.
    pub color: String,
    /// Set when the colour was substituted.
    pub notice: Option<String>,
}

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// One game: a square grid of obstacles, a goal, and the players chasing it.
///
/// A room is plain data with no locking or I/O. Commands mutate it
/// directly and [`resolver::resolve`](crate::resolver::resolve) advances it
/// one tick at a time; the [`Registry`](crate::Registry) owns every room and
/// serializes access to it.
#[derive(Debug)]
pub struct Room {
    pub(crate) code: RoomCode,
    pub(crate) grid_size: u32,
    pub(crate) termination: TerminationMode,
    pub(crate) obstacles: HashSet<Cell>,
    pub(crate) goal: Cell,
    pub(crate) players: HashMap<PlayerToken, Player>,
    pub(crate) scores: HashMap<PlayerToken, u64>,
    pub(crate) winner: Option<String>,
    /// Ticks this room has been through.
    pub(crate) tick: u64,
    /// Set when something visible changed outside of move resolution
    /// (a registration); cleared when the next tick broadcasts.
    pub(crate) dirty: bool,
}

impl Room {
    /// Generates a room with a random map.
    ///
    /// Samples `settings.obstacle_samples()` cells with replacement
    /// (duplicates collapse into the set), then picks a goal outside the
    /// obstacle set. `settings` must already be validated.
    pub fn generate<R: Rng>(
        code: RoomCode,
        settings: &RoomSettings,
        rng: &mut R,
    ) -> Result<Self, RoomError> {
        let n = settings.grid_size;
        let obstacles: HashSet<Cell> = (0..settings.obstacle_samples())
            .map(|_| random_cell(n, rng))
            .collect();

        let mut room = Self::empty(code, n, settings.termination, obstacles, Cell::new(0, 0));
        room.goal = room
            .pick_free_cell(None, rng)
            .ok_or_else(|| {
                RoomError::InvalidInput("no free cell for the goal".into())
            })?;
        Ok(room)
    }

    /// Builds a room with a hand-made map.
    pub fn with_layout(
        code: RoomCode,
        grid_size: u32,
        termination: TerminationMode,
        obstacles: impl IntoIterator<Item = Cell>,
        goal: Cell,
    ) -> Result<Self, RoomError> {
        if grid_size == 0 {
            let msg = "grid size must be at least 1";
            return Err(RoomError::InvalidInput(msg.into()));
        }
        let obstacles: HashSet<Cell> = obstacles.into_iter().collect();
        if let Some(bad) = obstacles.iter().find(|c| !c.in_bounds(grid_size)) {
            return Err(RoomError::InvalidInput(format!(
                "obstacle {bad} is outside a {grid_size}x{grid_size} grid"
            )));
        }
        if !goal.in_bounds(grid_size) {
            return Err(RoomError::InvalidInput(format!(
                "goal {goal} is outside a {grid_size}x{grid_size} grid"
            )));
        }
        if obstacles.contains(&goal) {
            let msg = format!("goal {goal} is on an obstacle");
            return Err(RoomError::InvalidInput(msg));
        }
        Ok(Self::empty(code, grid_size, termination, obstacles, goal))
    }

    fn empty(
        code: RoomCode,
        grid_size: u32,
        termination: TerminationMode,
        obstacles: HashSet<Cell>,
        goal: Cell,
    ) -> Self {
        Self {
            code,
            grid_size,
            termination,
            obstacles,
            goal,
            players: HashMap::new(),
            scores: HashMap::new(),
            winner: None,
            tick: 0,
            dirty: false,
        }
    }

    // -- accessors ----------------------------------------------------------

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Side length of the grid. Valid coordinates are `0..grid_size` on
    /// both axes.
    pub fn grid_size(&self) -> u32 {
        self.grid_size
    }

    pub fn termination(&self) -> TerminationMode {
        self.termination
    }

    /// The current goal cell. Never an obstacle. In endless rooms it moves
    /// after every tick in which someone reaches it.
    pub fn goal(&self) -> Cell {
        self.goal
    }

    pub fn is_obstacle(&self, cell: Cell) -> bool {
        self.obstacles.contains(&cell)
    }

    /// Every obstacle cell, in no particular order.
    pub fn obstacles(&self) -> impl Iterator<Item = Cell> + '_ {
        self.obstacles.iter().copied()
    }

    /// Name of the first player to reach the goal in a single-winner room.
    pub fn winner(&self) -> Option<&str> {
        self.winner.as_deref()
    }

    /// A room is finished once a single-winner game has its winner.
    /// Endless rooms never finish.
    pub fn is_finished(&self) -> bool {
        self.winner.is_some()
    }

    /// Ticks resolved since the room was created, finished ticks included.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Looks a player up by token.
    pub fn player(&self, token: &PlayerToken) -> Option<&Player> {
        self.players.get(token)
    }

    /// Every player, in no particular order.
    pub fn players(&self) -> impl Iterator<Item = &Player> + '_ {
        self.players.values()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// The player's score, or `None` for an unknown token. Registered
    /// players start at zero.
    pub fn score(&self, token: &PlayerToken) -> Option<u64> {
        self.scores.get(token).copied()
    }

    // -- commands -----------------------------------------------------------

    /// Registers a player at a uniformly random cell.
    ///
    /// The spawn cell may be an obstacle or the goal. Players spawned on a
    /// wall can still walk off it.
    pub fn register<R: Rng>(
        &mut self,
        name: &str,
        color: &str,
        rng: &mut R,
    ) -> Result<Registration, RoomError> {
        let spawn = random_cell(self.grid_size, rng);
        self.register_at(name, color, spawn, rng)
    }

    /// Registers a player at a chosen cell.
    ///
    /// Checks run in order: empty fields, spawn bounds, name clash, colour.
    /// Nothing is written until all of them pass.
    pub fn register_at<R: Rng>(
        &mut self,
        name: &str,
        color: &str,
        spawn: Cell,
        rng: &mut R,
    ) -> Result<Registration, RoomError> {
        let name = name.trim();
        let requested = color.trim();
        if name.is_empty() || requested.is_empty() {
            let msg = "name and color are required";
            return Err(RoomError::InvalidInput(msg.into()));
        }
        if !spawn.in_bounds(self.grid_size) {
            return Err(RoomError::InvalidInput(format!(
                "spawn {spawn} is outside a {0}x{0} grid",
                self.grid_size
            )));
        }
        if self.players.values().any(|p| p.name == name) {
            return Err(RoomError::NameTaken {
                code: self.code.clone(),
                name: name.to_string(),
            });
        }

        let (color, notice) = self.resolve_color(requested, rng)?;
        let token = ids::new_player_token(rng);

        self.players.insert(
            token.clone(),
            Player {
                token: token.clone(),
                name: name.to_string(),
                color: color.clone(),
                position: spawn,
                pending_intent: None,
            },
        );
        self.scores.insert(token.clone(), 0);
        self.dirty = true;

        tracing::info!(
            room = %self.code,
            player = name,
            %color,
            %spawn,
            substituted = notice.is_some(),
            "player registered"
        );

        Ok(Registration {
            token,
            color,
            notice,
        })
    }

    /// Picks the colour a new player gets.
    ///
    /// The request is honoured unless another player has it or it is
    /// reserved. Otherwise a random unused palette colour is drawn.
    fn resolve_color<R: Rng>(
        &self,
        requested: &str,
        rng: &mut R,
    ) -> Result<(String, Option<String>), RoomError> {
        let used: HashSet<&str> = self.players.values().map(|p| p.color.as_str()).collect();
        if !used.contains(requested) && !RESERVED_COLORS.contains(&requested) {
            return Ok((requested.to_string(), None));
        }

        let available: Vec<&str> = PALETTE
            .iter()
            .copied()
            .filter(|c| !used.contains(c))
            .collect();
        let Some(&chosen) = available.choose(rng) else {
            return Err(RoomError::ColorsExhausted(self.code.clone()));
        };

        let notice =
            format!("color {requested:?} was not available; you have been given {chosen:?}");
        Ok((chosen.to_string(), Some(notice)))
    }

    /// Queues `dir` as the player's move for the next tick, replacing any
    /// move queued earlier.
    ///
    /// The move is not checked against walls here; the tick does that.
    /// The returned notice only warns the player in advance when the move,
    /// taken from where they stand now, would hit a wall, or when the game
    /// is already over.
    pub fn set_intent(
        &mut self,
        token: &PlayerToken,
        dir: Direction,
    ) -> Result<Option<String>, RoomError> {
        let finished = self.is_finished();
        let player = self
            .players
            .get_mut(token)
            .ok_or_else(|| RoomError::PlayerNotFound(self.code.clone()))?;
        player.pending_intent = Some(dir);

        let notice = if finished {
            Some("the game is over; moves are no longer resolved".to_string())
        } else {
            let target = player.position.step(dir, self.grid_size);
            let from = player.position;
            self.obstacles.contains(&target).then(|| {
                format!("moving {dir} from {from} runs into a wall; the move will be ignored")
            })
        };

        tracing::debug!(room = %self.code, player = %player.name, %dir, "move queued");
        Ok(notice)
    }

    // -- projections --------------------------------------------------------

    /// The token-free view handed to viewers.
    pub fn snapshot(&self) -> Snapshot {
        let mut obstacles: Vec<Cell> = self.obstacles.iter().copied().collect();
        obstacles.sort();

        let mut players = BTreeMap::new();
        let mut scores = BTreeMap::new();
        for (token, player) in &self.players {
            players.insert(player.name.clone(), player.view());
            let score = self.scores.get(token).copied().unwrap_or(0);
            scores.insert(player.name.clone(), score);
        }

        Snapshot {
            code: self.code.clone(),
            tick: self.tick,
            grid_size: self.grid_size,
            mode: self.termination,
            obstacles,
            goal: self.goal,
            winner: self.winner.clone(),
            finished: self.is_finished(),
            scores,
            players,
        }
    }

    /// Players and scores, best first; ties ordered by name.
    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        let mut board: Vec<LeaderboardEntry> = self
            .players
            .iter()
            .map(|(token, p)| LeaderboardEntry {
                name: p.name.clone(),
                score: self.scores.get(token).copied().unwrap_or(0),
            })
            .collect();
        board.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.name.cmp(&b.name))
        });
        board
    }

    // -- internals ----------------------------------------------------------

    /// A uniformly random non-obstacle cell other than `exclude`, or `None`
    /// if there is no such cell.
    pub(crate) fn pick_free_cell<R: Rng>(
        &self,
        exclude: Option<Cell>,
        rng: &mut R,
    ) -> Option<Cell> {
        let is_free = |c: &Cell| !self.obstacles.contains(c) && Some(*c) != exclude;

        for _ in 0..FREE_CELL_ATTEMPTS {
            let cell = random_cell(self.grid_size, rng);
            if is_free(&cell) {
                return Some(cell);
            }
        }

        let n = self.grid_size;
        let free: Vec<Cell> = (0..n)
            .flat_map(|y| (0..n).map(move |x| Cell::new(x, y)))
            .filter(is_free)
            .collect();
        free.choose(rng).copied()
    }

    /// Returns and clears the dirty flag.
    pub(crate) fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Overwrites a player's position. Test support for fixed scenarios.
    #[cfg(test)]
    pub(crate) fn place(&mut self, token: &PlayerToken, cell: Cell) {
        if let Some(p) = self.players.get_mut(token) {
            p.position = cell;
        }
    }
}

fn random_cell<R: Rng>(grid_size: u32, rng: &mut R) -> Cell {
    let x = rng.random_range(0..grid_size);
    let y = rng.random_range(0..grid_size);
    Cell::new(x, y)
}
