//! Engine configuration.

use gridchase_room::{RegistryConfig, RoomSettings};
use gridchase_tick::TickConfig;
use serde::{Deserialize, Serialize};

/// Everything the engine needs to start.
///
/// All fields have defaults, so a config file only needs the values it
/// changes:
///
/// ```rust
/// let cfg: gridchase::EngineConfig =
///     serde_json::from_str(r#"{ "heartbeat_ticks": 5 }"#).unwrap();
/// assert_eq!(cfg.heartbeat_ticks, 5);
/// assert_eq!(cfg.default_room.grid_size, 20);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Tick period and overrun policy.
    pub tick: TickConfig,

    /// Send every room's state to its subscribers every N ticks even when
    /// nothing changed. 0 disables the heartbeat.
    pub heartbeat_ticks: u32,

    /// Grid limits, subscriber buffer size, RNG seed.
    pub registry: RegistryConfig,

    /// Settings used by [`Engine::create_default_room`](crate::Engine::create_default_room).
    pub default_room: RoomSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick: TickConfig::default(),
            heartbeat_ticks: Self::DEFAULT_HEARTBEAT_TICKS,
            registry: RegistryConfig::default(),
            default_room: RoomSettings::default(),
        }
    }
}

impl EngineConfig {
    /// Heartbeat every 10 ticks (one second at the default period).
    pub const DEFAULT_HEARTBEAT_TICKS: u32 = 10;

    /// Clamps values the engine can't work with.
    pub fn validated(mut self) -> Self {
        self.tick = self.tick.validated();
        if self.registry.subscriber_capacity == 0 {
            tracing::warn!("subscriber_capacity of 0 is not usable, using 1");
            self.registry.subscriber_capacity = 1;
        }
        self
    }
}
