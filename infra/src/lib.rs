//! # Infrastructure Layer
//!
//! This crate implements the infrastructure layer for the opaque token engine.
//! It provides the concrete pieces a deployment wires around `ot_core`.
//!
//! ## Architecture
//!
//! The infrastructure layer contains:
//! - **Cache**: Redis client and the Redis-backed `TokenStore`
//! - **Telemetry**: `tracing` subscriber setup driven by `LoggingConfig`
//! - **Configuration**: `.env` loading on top of the layered `AppConfig`
//!
//! ## Features
//!
//! - `redis-cache`: Enable Redis token store support (default)

use ot_core::errors::StoreError;
use ot_shared::{AppConfig, ConfigError};

// Re-export core types for convenience
pub use ot_core::errors::*;

/// Cache module - Redis client and token store
pub mod cache;

/// Telemetry module - tracing subscriber initialization
pub mod telemetry;

/// Load application configuration
///
/// Reads a `.env` file when present, then resolves the layered configuration
/// (`config/default.toml`, the environment-specific file, `OT__*` variables).
pub fn load_config() -> Result<AppConfig, InfrastructureError> {
    dotenvy::dotenv().ok(); // Load .env file if present

    AppConfig::load().map_err(|e| match e {
        ConfigError::Load(source) => InfrastructureError::Settings(source),
        invalid => InfrastructureError::Config(invalid.to_string()),
    })
}

/// Infrastructure-specific error types
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    /// Redis cache error
    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration sources could not be read or deserialized
    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    /// Connection attempt did not finish in time
    #[error("Connection timed out after {0}s")]
    Timeout(u64),

    /// Telemetry setup error
    #[error("Telemetry error: {0}")]
    Telemetry(String),
}

impl From<InfrastructureError> for StoreError {
    fn from(err: InfrastructureError) -> Self {
        StoreError::unavailable(err)
    }
}
