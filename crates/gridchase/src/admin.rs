//! Admin hook for gating room creation.
//!
//! Gridchase doesn't decide who counts as an administrator. It asks an
//! [`AdminGate`], a single async check on an opaque secret, and refuses the
//! operation with [`EngineError::Unauthorized`](crate::EngineError) when the
//! gate says no. [`SharedSecret`] covers the common case of one configured
//! password; anything fancier (tokens, an identity provider) is a custom
//! implementation.

/// Decides whether a caller may perform admin operations.
///
/// `Send + Sync + 'static` so a gate can live as long as the server and be
/// consulted from any task.
///
/// # Example
///
/// ```rust
/// use gridchase::AdminGate;
///
/// /// Lets everyone in. Local development only.
/// struct OpenGate;
///
/// impl AdminGate for OpenGate {
///     async fn verify(&self, _secret: &str) -> bool {
///         true
///     }
/// }
/// ```
pub trait AdminGate: Send + Sync + 'static {
    /// Returns `true` if `secret` grants admin rights.
    fn verify(&self, secret: &str) -> impl std::future::Future<Output = bool> + Send;
}

/// An [`AdminGate`] that accepts exactly one configured secret.
///
/// An empty configured secret accepts nobody.
#[derive(Clone)]
pub struct SharedSecret {
    secret: String,
}

impl SharedSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedSecret(..)")
    }
}

impl AdminGate for SharedSecret {
    async fn verify(&self, secret: &str) -> bool {
        !self.secret.is_empty() && constant_time_eq(self.secret.as_bytes(), secret.as_bytes())
    }
}

/// Compares without returning early on the first differing byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_shared_secret() {
        let gate = SharedSecret::new("hunter2");
        assert!(gate.verify("hunter2").await);
        assert!(!gate.verify("hunter3").await);
        assert!(!gate.verify("hunter22").await);
        assert!(!gate.verify("").await);
    }

    #[tokio::test]
    async fn test_empty_secret_accepts_nobody() {
        let gate = SharedSecret::new("");
        assert!(!gate.verify("").await);
    }

    #[test]
    fn test_debug_hides_secret() {
        let gate = SharedSecret::new("hunter2");
        assert!(!format!("{gate:?}").contains("hunter2"));
    }
}
