//! Error types for the room layer.

use gridchase_protocol::{ErrorKind, ProtocolError, RoomCode};

/// Errors that can occur during room operations.
///
/// None of these leave a room partially modified: every check runs before
/// the first write.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// The token doesn't belong to any player in the room.
    #[error("player not found in room {0}")]
    PlayerNotFound(RoomCode),

    /// Another player in the room already uses this name.
    #[error("name {name:?} is already taken in room {code}")]
    NameTaken { code: RoomCode, name: String },

    /// Every palette colour is in use.
    #[error("room {0} is full: no colors left")]
    ColorsExhausted(RoomCode),

    /// All 9000 room codes are in use.
    #[error("no room codes left")]
    CodesExhausted,

    /// Bad settings, empty fields, out-of-bounds cells.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A wire value failed to parse (currently: the move direction).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl RoomError {
    /// The [`ErrorKind`] this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) | Self::PlayerNotFound(_) => ErrorKind::NotFound,
            Self::NameTaken { .. } | Self::ColorsExhausted(_) | Self::CodesExhausted => {
                ErrorKind::Conflict
            }
            Self::InvalidInput(_) | Self::Protocol(_) => ErrorKind::InvalidInput,
        }
    }
}
