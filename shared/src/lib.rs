//! Shared configuration types for the opaque token services
//!
//! This crate provides functionality used across all workspace members:
//! - Token lifetime and generator configuration
//! - Redis cache configuration
//! - Environment detection and logging configuration
//! - Layered configuration loading

pub mod config;

// Re-export commonly used items at crate root
pub use config::{
    AppConfig, CacheConfig, ConfigError, Environment, LogFormat, LoggingConfig, TokenConfig,
    TokenGeneratorKind,
};
