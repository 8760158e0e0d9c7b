//! Unified error type for the Gridchase engine.

use gridchase_protocol::ErrorKind;
use gridchase_room::RoomError;

/// Top-level error returned by every [`Engine`](crate::Engine) operation.
///
/// Callers that only need to pick a status code use [`kind()`](Self::kind);
/// the `Display` output is safe to show to a player.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A room-level error (unknown room or player, name clash, bad input).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The admin secret presented for a gated operation was rejected.
    #[error("admin credentials rejected")]
    Unauthorized,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Room(e) => e.kind(),
            Self::Unauthorized => ErrorKind::Unauthorized,
        }
    }
}
