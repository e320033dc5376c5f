//! Token string generation strategies

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::rngs::OsRng;
use rand::RngCore;

use ot_shared::config::token::DEFAULT_TOKEN_LENGTH;

/// Produces candidate token strings
///
/// Called once per reservation attempt; implementations must never return a
/// memoized value.
pub trait TokenGenerator: Send + Sync {
    /// Produce a fresh candidate token string
    fn generate(&self) -> String;
}

/// Random URL-safe identifiers drawn from the operating system CSPRNG
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpaqueTokenGenerator {
    length: usize,
}

impl OpaqueTokenGenerator {
    /// Create a generator producing `length` random bytes per token
    pub fn new(length: usize) -> Self {
        Self { length }
    }

    /// Number of random bytes per token
    pub fn length(&self) -> usize {
        self.length
    }
}

impl Default for OpaqueTokenGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_LENGTH)
    }
}

impl TokenGenerator for OpaqueTokenGenerator {
    /// # Panics
    ///
    /// Panics if the operating system entropy source fails. A predictable
    /// token is never an acceptable fallback.
    fn generate(&self) -> String {
        let mut bytes = vec![0u8; self.length];
        OsRng.fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }
}
