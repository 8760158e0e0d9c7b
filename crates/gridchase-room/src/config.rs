//! Room settings, registry configuration, and game constants.

use gridchase_protocol::TerminationMode;
use serde::{Deserialize, Serialize};

use crate::RoomError;

/// Points awarded every time a player steps onto the goal.
pub const GOAL_POINTS: u64 = 1000;

/// Colours handed out when a requested colour is already taken.
pub const PALETTE: [&str; 11] = [
    "red", "blue", "green", "orange", "purple", "pink", "cyan", "lime", "brown", "magenta",
    "teal",
];

/// Colours no player may hold: the grid renders walls and the goal in them.
pub const RESERVED_COLORS: [&str; 2] = ["black", "yellow"];

// ---------------------------------------------------------------------------
// RoomSettings
// ---------------------------------------------------------------------------

/// Parameters fixed at room creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomSettings {
    /// Edge length of the square grid.
    pub grid_size: u32,

    /// Obstacle samples as a fraction of the cell count. Sampling is with
    /// replacement, so the actual wall count is usually a bit lower.
    pub obstacle_density: f64,

    /// Whether the room ends at the first goal or keeps scoring forever.
    pub termination: TerminationMode,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            grid_size: 20,
            obstacle_density: Self::DEFAULT_OBSTACLE_DENSITY,
            termination: TerminationMode::Endless,
        }
    }
}

impl RoomSettings {
    /// `grid_size * grid_size / 2` samples.
    pub const DEFAULT_OBSTACLE_DENSITY: f64 = 0.5;

    /// Default settings on a grid of the given size.
    pub fn with_grid_size(grid_size: u32) -> Self {
        Self {
            grid_size,
            ..Default::default()
        }
    }

    /// Checks that the settings describe a playable room.
    ///
    /// A density below 1.0 always leaves at least one cell free, which is
    /// what guarantees the goal can be placed.
    pub fn validate(&self, max_grid_size: u32) -> Result<(), RoomError> {
        if self.grid_size == 0 || self.grid_size > max_grid_size {
            return Err(RoomError::InvalidInput(format!(
                "grid size must be between 1 and {max_grid_size}, got {}",
                self.grid_size
            )));
        }
        if !(0.0..1.0).contains(&self.obstacle_density) {
            return Err(RoomError::InvalidInput(format!(
                "obstacle density must be in [0.0, 1.0), got {}",
                self.obstacle_density
            )));
        }
        Ok(())
    }

    /// Number of obstacle cells to sample.
    pub fn obstacle_samples(&self) -> usize {
        let cells = f64::from(self.grid_size) * f64::from(self.grid_size);
        (cells * self.obstacle_density).floor() as usize
    }
}

// ---------------------------------------------------------------------------
// RegistryConfig
// ---------------------------------------------------------------------------

/// Limits and tuning for a [`Registry`](crate::Registry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Largest grid a room may be created with.
    pub max_grid_size: u32,

    /// Frames buffered per subscriber before new frames are dropped for it.
    pub subscriber_capacity: usize,

    /// Fixed RNG seed. `None` seeds from the OS; tests set it to get
    /// reproducible maps, spawns and tokens.
    pub seed: Option<u64>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_grid_size: 100,
            subscriber_capacity: 16,
            seed: None,
        }
    }
}
