//! Wire types for Gridchase.
//!
//! This crate defines the vocabulary shared by the engine and its callers:
//!
//! - **Identifiers** ([`RoomCode`], [`PlayerToken`])
//! - **Grid primitives** ([`Cell`], [`Direction`])
//! - **Projections** ([`Snapshot`], [`PlayerView`], [`LeaderboardEntry`]):
//!   what viewers are allowed to see, with tokens stripped out
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) and [`Frame`], the
//!   serialized unit pushed to subscribers
//!
//! It knows nothing about rooms as live objects, locks, or ticks.

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::{ErrorKind, ProtocolError};
pub use types::{
    Cell, Direction, Frame, LeaderboardEntry, PlayerToken, PlayerView, RoomCode,
    Snapshot, TerminationMode,
};
