//! Configuration module with service-specific sub-modules
//!
//! - `cache` - Redis connection and key layout
//! - `environment` - Environment detection and logging configuration
//! - `token` - Token lifetimes, store deadlines and generator strategy

pub mod cache;
pub mod environment;
pub mod token;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// Re-export commonly used types
pub use cache::CacheConfig;
pub use environment::{Environment, LogFormat, LoggingConfig};
pub use token::{TokenConfig, TokenGeneratorKind};

/// Prefix of environment variables overriding file configuration
pub const ENV_PREFIX: &str = "OT";

/// Errors raised while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration value for {field}: {reason}")]
    Invalid { field: String, reason: String },

    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/// Complete application configuration combining all sub-configurations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Environment configuration
    #[serde(default)]
    pub environment: Environment,

    /// Token issuing configuration
    #[serde(default)]
    pub token: TokenConfig,

    /// Redis configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let env = Environment::default();
        Self {
            environment: env,
            token: TokenConfig::default(),
            cache: CacheConfig::default(),
            logging: LoggingConfig::for_environment(env),
        }
    }
}

impl AppConfig {
    /// Load configuration from layered sources
    ///
    /// Later sources override earlier ones:
    /// 1. `config/default.toml` (optional)
    /// 2. `config/{environment}.toml` (optional)
    /// 3. `OT__*` environment variables, e.g. `OT__TOKEN__ACCESS_TOKEN_EXPIRY=900`
    pub fn load() -> Result<Self, ConfigError> {
        let env = Environment::from_env();

        let settings = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(env.config_file()).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut app: AppConfig = settings.try_deserialize()?;
        app.environment = env;
        app.token.validate()?;
        Ok(app)
    }

    /// Load configuration from plain environment variables only
    pub fn from_env() -> Self {
        let env = Environment::from_env();
        Self {
            environment: env,
            token: TokenConfig::default(),
            cache: CacheConfig::from_env(),
            logging: LoggingConfig::for_environment(env),
        }
    }
}
