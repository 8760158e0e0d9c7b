//! Error types for the protocol layer.
//!
//! Each Gridchase crate defines its own error enum, so a `ProtocolError`
//! always means "the bytes or the words on the wire were wrong", never a
//! missing room or a name clash.

/// Errors that can occur while encoding, decoding, or parsing wire values.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust value into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, missing fields, wrong types.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// Encoded bytes were not valid UTF-8 and can't become a text frame.
    #[error("frame is not valid UTF-8")]
    NotUtf8,

    /// A direction other than `up`, `down`, `left` or `right`.
    #[error("invalid direction {0:?}: expected up, down, left or right")]
    InvalidDirection(String),
}

/// Coarse classification of every error the engine returns to a caller.
///
/// Each error type maps to exactly one kind, so a routing layer can turn
/// errors into status codes without inspecting messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The referenced room or player does not exist.
    NotFound,
    /// The request was malformed; fixing the input fixes the request.
    InvalidInput,
    /// The request clashes with current room state (name, colour, capacity).
    Conflict,
    /// The caller's credentials were rejected.
    Unauthorized,
}
