//! Successful command results.

use gridchase_protocol::PlayerToken;
use serde::{Deserialize, Serialize};

/// A successful result, optionally carrying a non-fatal notice for the
/// player ("colour taken, you got blue", "there is a wall there").
///
/// Failures are [`EngineError`](crate::EngineError)s, so the three outcomes
/// a caller must handle are `Ok(Reply)`, a not-found error, and a user
/// error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply<T> {
    pub payload: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

impl<T> Reply<T> {
    /// A reply with nothing to warn about.
    pub fn new(payload: T) -> Self {
        Self {
            payload,
            notice: None,
        }
    }

    /// Wraps `payload`, attaching `notice` when the command succeeded with
    /// a caveat.
    pub fn with_notice(payload: T, notice: Option<String>) -> Self {
        Self { payload, notice }
    }
}

/// Payload of a successful registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Joined {
    /// Secret handle for submitting moves. Never appears in snapshots.
    pub token: PlayerToken,
    pub color: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_omitted_when_absent() {
        let json = serde_json::to_string(&Reply::new(7)).unwrap();
        assert_eq!(json, r#"{"payload":7}"#);
    }

    #[test]
    fn test_joined_reply_shape() {
        let reply = Reply::with_notice(
            Joined {
                token: PlayerToken::from("abc"),
                color: "blue".into(),
            },
            Some("colour red is taken".into()),
        );
        let value = serde_json::to_value(&reply).unwrap();
        assert_eq!(value["payload"]["token"], "abc");
        assert_eq!(value["payload"]["color"], "blue");
        assert_eq!(value["notice"], "colour red is taken");
    }
}
