//! Core types shared by the engine and anything that talks to it.
//!
//! Everything in this module is either an identifier, a grid primitive, or
//! a read-only projection that is safe to hand to viewers. Projections carry
//! no player tokens; a token must never appear in a snapshot or a listing.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The short numeric code that identifies a room, e.g. `"4821"`.
///
/// Newtype over `String` so a room code can't be confused with a player
/// name or token in a function signature. `#[serde(transparent)]` keeps the
/// JSON representation a plain string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Smallest code the generator hands out.
    pub const MIN: u16 = 1000;
    /// Largest code the generator hands out.
    pub const MAX: u16 = 9999;

    /// Builds a code from its numeric value.
    pub fn from_number(n: u16) -> Self {
        Self(n.to_string())
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if `s` has the shape of a generated code
    /// (four ASCII digits in `1000..=9999`).
    pub fn is_valid(s: &str) -> bool {
        s.len() == 4
            && s.bytes().all(|b| b.is_ascii_digit())
            && s.parse::<u16>()
                .is_ok_and(|n| (Self::MIN..=Self::MAX).contains(&n))
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lookups take whatever string the caller received; an unknown or
/// malformed code simply won't match any room.
impl From<&str> for RoomCode {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The secret identifier a player receives at registration.
///
/// 128 random bits rendered as 32 lowercase hex characters. The token is
/// the player's only proof of identity when submitting moves.
///
/// `Display` is intentionally *not* implemented for `PlayerToken`, so it
/// can't end up in a log line by accident through `%token`. Use
/// [`PlayerToken::as_str`] when the raw value is genuinely needed (handing
/// it back to the player who registered).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerToken(String);

impl PlayerToken {
    /// Wraps an already generated token string.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PlayerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Show only a short prefix so debug output stays useful for
        // correlating without printing the whole credential.
        let prefix: String = self.0.chars().take(6).collect();
        write!(f, "PlayerToken({prefix}…)")
    }
}

impl From<&str> for PlayerToken {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Grid primitives
// ---------------------------------------------------------------------------

/// A single grid cell. `(0, 0)` is the top-left corner; `y` grows downward,
/// so `Direction::Up` decrements `y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub x: u32,
    pub y: u32,
}

impl Cell {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Returns `true` if the cell lies on a square grid of edge `grid_size`.
    pub fn in_bounds(self, grid_size: u32) -> bool {
        self.x < grid_size && self.y < grid_size
    }

    /// Moves one step in `dir`, clamping each axis to `[0, grid_size - 1]`.
    ///
    /// Walking into the edge of the grid is a no-op on that axis rather
    /// than an error, so a player in the corner who keeps pressing toward
    /// the wall just stays put.
    pub fn step(self, dir: Direction, grid_size: u32) -> Self {
        let max = grid_size.saturating_sub(1);
        let (dx, dy) = dir.delta();
        let x = (i64::from(self.x) + dx).clamp(0, i64::from(max));
        let y = (i64::from(self.y) + dy).clamp(0, i64::from(max));
        // Both values are clamped into `0..=max`, and `max` came from a u32.
        Self::new(x as u32, y as u32)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// One of the four cardinal moves a player can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Self::Up, Self::Down, Self::Left, Self::Right];

    /// Unit displacement `(dx, dy)` for this direction.
    pub fn delta(self) -> (i64, i64) {
        match self {
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = ProtocolError;

    /// Parses the lowercase wire names. Anything else is rejected; callers
    /// map this to a user-correctable input error.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            other => Err(ProtocolError::InvalidDirection(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Projections
// ---------------------------------------------------------------------------

/// How a room decides when the game is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationMode {
    /// Every goal reached scores points and the goal jumps somewhere else.
    /// The room never finishes.
    #[default]
    Endless,
    /// The first player to reach the goal wins and the room stops
    /// resolving moves.
    FirstToGoal,
}

/// What a viewer is allowed to see about one player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    pub name: String,
    pub color: String,
    pub x: u32,
    pub y: u32,
}

/// A read-only, token-free projection of a room.
///
/// This is both the response to a snapshot request and the body of every
/// frame pushed to subscribers. `BTreeMap`s keep the JSON key order stable,
/// which makes frames diffable and tests deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub code: RoomCode,
    /// Number of ticks this room has been resolved for.
    pub tick: u64,
    pub grid_size: u32,
    pub mode: TerminationMode,
    /// Obstacle cells in sorted order.
    pub obstacles: Vec<Cell>,
    pub goal: Cell,
    /// Name of the winning player (single-winner rooms only).
    pub winner: Option<String>,
    pub finished: bool,
    /// Player name → score.
    pub scores: BTreeMap<String, u64>,
    /// Player name → public view.
    pub players: BTreeMap<String, PlayerView>,
}

/// One row of a room's leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub name: String,
    pub score: u64,
}

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

/// A serialized snapshot ready for delivery to subscribers.
///
/// Backed by `Arc<str>`: one broadcast encodes the snapshot once and every
/// subscriber receives a pointer to the same text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame(Arc<str>);

impl Frame {
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Renders the frame as one server-sent event: `data: <json>\n\n`.
    pub fn to_event_stream(&self) -> String {
        format!("data: {}\n\n", self.0)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
