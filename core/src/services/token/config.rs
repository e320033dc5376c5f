//! Configuration for the token service

use std::time::Duration;

use ot_shared::config::token::{
    DEFAULT_ACCESS_TOKEN_EXPIRY, DEFAULT_OPERATION_TIMEOUT_MS, DEFAULT_REFRESH_TOKEN_EXPIRY,
    DEFAULT_TOKEN_LENGTH, MIN_TOKEN_LENGTH,
};
use ot_shared::{ConfigError, TokenConfig, TokenGeneratorKind};

/// Configuration for the token service
///
/// Builder methods overwrite the field they set, so repeating one keeps the last value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenServiceConfig {
    /// Lifetime of access tokens (default 6 hours)
    pub access_token_ttl: Duration,
    /// Lifetime of refresh tokens (default 15 days)
    pub refresh_token_ttl: Duration,
    /// Deadline applied to every store call
    pub operation_timeout: Duration,
    /// Random bytes per opaque token
    pub token_length: usize,
    /// Token generation strategy
    pub generator: TokenGeneratorKind,
}

impl Default for TokenServiceConfig {
    fn default() -> Self {
        Self {
            access_token_ttl: Duration::from_secs(DEFAULT_ACCESS_TOKEN_EXPIRY),
            refresh_token_ttl: Duration::from_secs(DEFAULT_REFRESH_TOKEN_EXPIRY),
            operation_timeout: Duration::from_millis(DEFAULT_OPERATION_TIMEOUT_MS),
            token_length: DEFAULT_TOKEN_LENGTH,
            generator: TokenGeneratorKind::Opaque,
        }
    }
}

impl TokenServiceConfig {
    /// Set the access token lifetime
    pub fn with_access_token_ttl(mut self, ttl: Duration) -> Self {
        self.access_token_ttl = ttl;
        self
    }

    /// Set the refresh token lifetime
    pub fn with_refresh_token_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_token_ttl = ttl;
        self
    }

    /// Set the per-call store deadline
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Set the number of random bytes per token
    pub fn with_token_length(mut self, length: usize) -> Self {
        self.token_length = length;
        self
    }

    /// Check that every field holds a usable value
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("access_token_ttl", self.access_token_ttl.is_zero()),
            ("refresh_token_ttl", self.refresh_token_ttl.is_zero()),
            ("operation_timeout", self.operation_timeout.is_zero()),
        ];
        if let Some((field, _)) = checks.iter().find(|(_, zero)| *zero) {
            return Err(ConfigError::Invalid {
                field: field.to_string(),
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

impl TryFrom<&TokenConfig> for TokenServiceConfig {
    type Error = ConfigError;

    fn try_from(config: &TokenConfig) -> Result<Self, Self::Error> {
        config.validate()?;
        Ok(Self {
            access_token_ttl: Duration::from_secs(config.access_token_expiry),
            refresh_token_ttl: Duration::from_secs(config.refresh_token_expiry),
            operation_timeout: Duration::from_millis(config.operation_timeout_ms),
            token_length: config.token_length,
            generator: config.generator,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TokenServiceConfig::default();
        assert_eq!(config.access_token_ttl, Duration::from_secs(6 * 3600));
        assert_eq!(config.refresh_token_ttl, Duration::from_secs(15 * 86400));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_last_write_wins() {
        let config = TokenServiceConfig::default()
            .with_access_token_ttl(Duration::from_secs(10))
            .with_access_token_ttl(Duration::from_secs(20));
        assert_eq!(config.access_token_ttl, Duration::from_secs(20));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let config = TokenServiceConfig::default().with_operation_timeout(Duration::ZERO);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("operation_timeout"));
    }

    #[test]
    fn test_from_shared_config() {
        let shared = TokenConfig::default().with_access_expiry_minutes(15);
        let config = TokenServiceConfig::try_from(&shared).unwrap();
        assert_eq!(config.access_token_ttl, Duration::from_secs(900));
        assert_eq!(config.operation_timeout, Duration::from_millis(5000));

        let invalid = TokenConfig {
            token_length: 4,
            ..Default::default()
        };
        assert!(TokenServiceConfig::try_from(&invalid).is_err());
    }
}
