//! Token lifetime and generation configuration

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Default access token lifetime in seconds (6 hours)
pub const DEFAULT_ACCESS_TOKEN_EXPIRY: u64 = 6 * 60 * 60;

/// Default refresh token lifetime in seconds (15 days)
pub const DEFAULT_REFRESH_TOKEN_EXPIRY: u64 = 15 * 24 * 60 * 60;

/// Default deadline applied to every store call, in milliseconds
pub const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 5_000;

/// Default number of random bytes behind an opaque token
pub const DEFAULT_TOKEN_LENGTH: usize = 48;

/// Smallest accepted random byte length for an opaque token
pub const MIN_TOKEN_LENGTH: usize = 16;

/// Strategy used to produce token strings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenGeneratorKind {
    /// Random URL-safe identifiers with all state held server-side
    #[default]
    Opaque,
}

/// Token issuing configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TokenConfig {
    /// Access token expiry time in seconds
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry: u64,

    /// Refresh token expiry time in seconds
    #[serde(default = "default_refresh_token_expiry")]
    pub refresh_token_expiry: u64,

    /// Deadline for each backend call in milliseconds
    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,

    /// Number of random bytes per token
    #[serde(default = "default_token_length")]
    pub token_length: usize,

    /// Token generation strategy
    #[serde(default)]
    pub generator: TokenGeneratorKind,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            access_token_expiry: DEFAULT_ACCESS_TOKEN_EXPIRY,
            refresh_token_expiry: DEFAULT_REFRESH_TOKEN_EXPIRY,
            operation_timeout_ms: DEFAULT_OPERATION_TIMEOUT_MS,
            token_length: DEFAULT_TOKEN_LENGTH,
            generator: TokenGeneratorKind::Opaque,
        }
    }
}

impl TokenConfig {
    /// Set access token expiry in minutes
    pub fn with_access_expiry_minutes(mut self, minutes: u64) -> Self {
        self.access_token_expiry = minutes * 60;
        self
    }

    /// Set refresh token expiry in days
    pub fn with_refresh_expiry_days(mut self, days: u64) -> Self {
        self.refresh_token_expiry = days * 86400;
        self
    }

    /// Check that every field holds a usable value
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.access_token_expiry == 0 {
            return Err(ConfigError::Invalid {
                field: "access_token_expiry".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.refresh_token_expiry == 0 {
            return Err(ConfigError::Invalid {
                field: "refresh_token_expiry".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.operation_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "operation_timeout_ms".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.token_length < MIN_TOKEN_LENGTH {
            return Err(ConfigError::Invalid {
                field: "token_length".to_string(),
                reason: format!("must be at least {} bytes", MIN_TOKEN_LENGTH),
            });
        }
        Ok(())
    }
}

fn default_access_token_expiry() -> u64 {
    DEFAULT_ACCESS_TOKEN_EXPIRY
}

fn default_refresh_token_expiry() -> u64 {
    DEFAULT_REFRESH_TOKEN_EXPIRY
}

fn default_operation_timeout_ms() -> u64 {
    DEFAULT_OPERATION_TIMEOUT_MS
}

fn default_token_length() -> usize {
    DEFAULT_TOKEN_LENGTH
}
