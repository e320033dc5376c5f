//! # Opaque Token Core
//!
//! Core lifecycle logic for opaque bearer tokens.
//! This crate contains the token record model, the error taxonomy, the storage
//! capability contract with an in-memory implementation, and the lifecycle
//! engine that mints, validates, rotates and revokes access/refresh pairs.

pub mod domain;
pub mod errors;
pub mod repositories;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::*;
pub use errors::*;
pub use repositories::*;
pub use services::*;
