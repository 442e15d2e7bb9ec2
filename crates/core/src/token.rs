//! Action tokens for the admin surface
//!
//! State-mutating admin requests (activate/deactivate/delete) carry a token
//! derived from a shared secret and the request timestamp. The surface must
//! verify the token and that the timestamp is recent before calling into
//! the license manager — this is a replay fence for browser-driven admin
//! pages, not a cryptographic trust boundary (license keys are validated
//! remotely).

use crate::clock::Clock;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// How far a request timestamp may drift from now, in either direction.
pub const TOKEN_WINDOW_SECS: u64 = 5 * 60;

pub struct Tokenizer {
    secret: String,
    clock: Arc<dyn Clock>,
}

impl Tokenizer {
    pub fn new(secret: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            secret: secret.into(),
            clock,
        }
    }

    /// Token for a request stamped at `timestamp`.
    pub fn tokenize(&self, timestamp: u64) -> String {
        let hash = Sha256::digest(format!("{}:{}", self.secret, timestamp).as_bytes());
        hash.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Whether `token` matches `timestamp` and the timestamp is inside the
    /// validity window.
    pub fn is_valid(&self, token: &str, timestamp: u64) -> bool {
        let now = self.clock.now();
        let drift = now.abs_diff(timestamp);
        if drift > TOKEN_WINDOW_SECS {
            return false;
        }
        token == self.tokenize(timestamp)
    }
}
