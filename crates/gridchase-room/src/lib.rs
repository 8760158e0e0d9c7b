//! Rooms, move resolution, and subscriber fan-out for Gridchase.
//!
//! Everything here is synchronous, owned data; locking is the engine's job.
//!
//! # Key types
//!
//! - [`Room`]: one grid with obstacles, a goal, players and scores
//! - [`Registry`]: owns every room, creates them, routes commands
//! - [`resolver::resolve`]: applies one tick of queued moves to a room
//! - [`Fanout`] / [`Subscription`]: per-room delivery of snapshot frames
//! - [`RoomSettings`] / [`RegistryConfig`]: creation parameters and limits

mod config;
mod error;
mod fanout;
pub mod ids;
mod registry;
pub mod resolver;
mod room;

pub use config::{GOAL_POINTS, PALETTE, RESERVED_COLORS, RegistryConfig, RoomSettings};
pub use error::RoomError;
pub use fanout::{BroadcastReport, Fanout, Subscription};
pub use registry::{Registry, TickReport};
pub use resolver::TickOutcome;
pub use room::{Player, Registration, Room};

pub use gridchase_protocol::ErrorKind;
