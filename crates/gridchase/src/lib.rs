//! # Gridchase
//!
//! A multi-room, tick-based grid game engine. Players join a room, queue
//! one move at a time, and race to a goal cell; a background tick resolves
//! every room at a fixed rate and streams each changed room's state to its
//! subscribers.
//!
//! The engine is transport-agnostic: wire [`Engine`]'s command methods to
//! whatever HTTP, WebSocket or SSE layer you like, and forward
//! [`Subscription`] frames (see [`Frame::to_event_stream`]) to viewers.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gridchase::prelude::*;
//!
//! # async fn run() -> Result<(), EngineError> {
//! gridchase::telemetry::init();
//!
//! let engine = Engine::new(EngineConfig::default());
//! let _ticker = engine.spawn_ticker();
//!
//! let code = engine.create_default_room().await?;
//! let mut viewer = engine.subscribe(code.as_str()).await?;
//! while let Some(frame) = viewer.recv().await {
//!     print!("{}", frame.to_event_stream());
//! }
//! # Ok(())
//! # }
//! ```

mod admin;
mod config;
mod engine;
mod error;
mod reply;
pub mod telemetry;

pub use admin::{AdminGate, SharedSecret};
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::EngineError;
pub use reply::{Joined, Reply};

pub use gridchase_protocol::{
    Cell, Codec, Direction, ErrorKind, Frame, JsonCodec, LeaderboardEntry, PlayerToken,
    PlayerView, RoomCode, Snapshot, TerminationMode,
};
pub use gridchase_room::{
    GOAL_POINTS, PALETTE, RegistryConfig, RoomError, RoomSettings, Subscription, TickReport,
};
pub use gridchase_tick::{TickConfig, TickPolicy};

/// Everything needed to run an engine and talk to it.
pub mod prelude {
    pub use crate::{
        AdminGate, Engine, EngineConfig, EngineError, ErrorKind, Frame, Joined, Reply,
        RoomCode, RoomSettings, SharedSecret, Snapshot, Subscription, TerminationMode,
    };
}
