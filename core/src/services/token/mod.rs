//! Token service module for opaque bearer tokens
//!
//! This module handles all token-related operations including:
//! - Minting access/refresh pairs under a shared lineage
//! - Validation with lazy index reconciliation
//! - Refresh token rotation
//! - Single, lineage-wide and user-wide revocation

mod config;
mod deadline;
mod generator;
mod service;
mod sweep;

#[cfg(test)]
mod tests;

pub use config::TokenServiceConfig;
pub use generator::{OpaqueTokenGenerator, TokenGenerator};
pub use service::TokenService;
pub use sweep::SweepReport;
