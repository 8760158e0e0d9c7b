//! Codec trait and implementations for turning snapshots into frames.
//!
//! The engine doesn't care how a snapshot is serialized; it only needs
//! something implementing [`Codec`]. [`JsonCodec`] is the default and the
//! format every viewer understands today.

use serde::{de::DeserializeOwned, Serialize};

use crate::{Frame, ProtocolError};

/// Encodes values to bytes and decodes them back.
///
/// `Send + Sync + 'static` because the codec lives inside the engine, which
/// is shared between the tick task and every caller task.
///
/// Implementors provide [`encode`](Codec::encode) and
/// [`decode`](Codec::decode); the frame helpers are derived from them. The
/// tick encodes each room's [`Snapshot`](crate::Snapshot) once and hands the
/// same [`Frame`] to every subscriber of that room, so encoding cost does
/// not grow with the number of viewers.
///
/// A custom codec only has to agree with itself: whatever
/// `encode_frame` produces, `decode_frame` on the same codec must accept.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    ///
    /// Fails when the value can't be represented in this format.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    ///
    /// Fails on malformed input or input that doesn't match `T`.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;

    /// Encodes a value into a text [`Frame`] for subscribers.
    ///
    /// Frames travel as text, so codecs that produce non-UTF-8 output
    /// can't be used for streaming.
    ///
    /// # Errors
    ///
    /// Propagates [`encode`](Codec::encode) errors, and returns
    /// [`ProtocolError::NotUtf8`] when the encoded bytes aren't valid
    /// UTF-8.
    fn encode_frame<T: Serialize>(&self, value: &T) -> Result<Frame, ProtocolError> {
        let bytes = self.encode(value)?;
        let text = String::from_utf8(bytes).map_err(|_| ProtocolError::NotUtf8)?;
        Ok(Frame::new(text))
    }

    /// Decodes a frame produced by [`Codec::encode_frame`].
    fn decode_frame<T: DeserializeOwned>(&self, frame: &Frame) -> Result<T, ProtocolError> {
        self.decode(frame.as_str().as_bytes())
    }
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] backed by `serde_json`.
///
/// ```rust
/// use gridchase_protocol::{Cell, Codec, JsonCodec};
///
/// let codec = JsonCodec;
/// let frame = codec.encode_frame(&Cell::new(3, 4)).unwrap();
/// assert_eq!(frame.as_str(), r#"{"x":3,"y":4}"#);
///
/// let back: Cell = codec.decode_frame(&frame).unwrap();
/// assert_eq!(back, Cell::new(3, 4));
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::{Cell, PlayerView, RoomCode, Snapshot, TerminationMode};

    fn sample_snapshot() -> Snapshot {
        let mut players = BTreeMap::new();
        players.insert(
            "alice".to_string(),
            PlayerView {
                name: "alice".into(),
                color: "red".into(),
                x: 1,
                y: 2,
            },
        );
        let mut scores = BTreeMap::new();
        scores.insert("alice".to_string(), 1000);
        Snapshot {
            code: RoomCode::from_number(1234),
            tick: 7,
            grid_size: 10,
            mode: TerminationMode::Endless,
            obstacles: vec![Cell::new(0, 1), Cell::new(3, 3)],
            goal: Cell::new(4, 4),
            winner: None,
            finished: false,
            scores,
            players,
        }
    }

    #[test]
    fn test_snapshot_frame_is_readable_json() {
        let frame = JsonCodec.encode_frame(&sample_snapshot()).unwrap();
        let value: serde_json::Value = serde_json::from_str(frame.as_str()).unwrap();
        assert_eq!(value["code"], "1234");
        assert_eq!(value["grid_size"], 10);
        assert_eq!(value["goal"]["x"], 4);
        assert_eq!(value["players"]["alice"]["color"], "red");
        assert_eq!(value["scores"]["alice"], 1000);
        assert_eq!(value["mode"], "endless");
    }

    #[test]
    fn test_decode_frame_returns_snapshot() {
        let snap = sample_snapshot();
        let frame = JsonCodec.encode_frame(&snap).unwrap();
        let decoded: Snapshot = JsonCodec.decode_frame(&frame).unwrap();
        assert_eq!(decoded, snap);
    }

    /// Emits raw bytes that aren't UTF-8.
    struct Latin1Codec;

    impl Codec for Latin1Codec {
        fn encode<T: Serialize>(&self, _value: &T) -> Result<Vec<u8>, ProtocolError> {
            Ok(vec![b'c', b'a', b'f', 0xE9])
        }

        fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
            JsonCodec.decode(data)
        }
    }

    #[test]
    fn test_non_utf8_codec_cannot_frame() {
        let result = Latin1Codec.encode_frame(&Cell::new(0, 0));
        assert!(matches!(result, Err(ProtocolError::NotUtf8)));
        assert_eq!(Latin1Codec.encode(&1u8).unwrap().len(), 4);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let result: Result<Snapshot, _> = JsonCodec.decode(b"not json");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }
}
