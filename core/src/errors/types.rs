//! Error types for the token store and the lifecycle engine
//!
//! Store implementations speak [`StoreError`]. The engine translates every
//! store error into the closed [`TokenError`] set before it reaches a caller.

use std::fmt;

use thiserror::Error;

use crate::domain::entities::token::TokenKind;

/// Errors raised by a [`TokenStore`](crate::repositories::TokenStore) implementation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A primary-store lookup missed
    #[error("Key not found in token store")]
    NotFound,

    /// Transport or connection failure
    #[error("Token store unavailable: {message}")]
    Unavailable { message: String },

    /// The call did not finish before its deadline
    #[error("Token store call `{operation}` exceeded its deadline")]
    DeadlineExceeded { operation: String },
}

impl StoreError {
    /// Build an `Unavailable` error from any displayable cause
    pub fn unavailable(cause: impl fmt::Display) -> Self {
        StoreError::Unavailable {
            message: cause.to_string(),
        }
    }
}

/// Errors surfaced by the token lifecycle engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Token not found, expired, index-inconsistent or undecodable
    #[error("Invalid token")]
    TokenInvalid,

    /// A kind-specific operation received the other kind of token
    #[error("Invalid token kind: expected {expected}, got {actual}")]
    InvalidTokenKind { expected: TokenKind, actual: TokenKind },

    /// Infrastructure failure; retry policy belongs to the caller
    #[error("Token backend unavailable: {message}")]
    BackendUnavailable { message: String },
}

impl TokenError {
    /// Stable machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            TokenError::TokenInvalid => "TOKEN_INVALID",
            TokenError::InvalidTokenKind { .. } => "INVALID_TOKEN_KIND",
            TokenError::BackendUnavailable { .. } => "BACKEND_UNAVAILABLE",
        }
    }

    /// Whether the failure is infrastructure-related rather than about the token
    pub fn is_backend_failure(&self) -> bool {
        matches!(self, TokenError::BackendUnavailable { .. })
    }
}

impl From<StoreError> for TokenError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => TokenError::TokenInvalid,
            StoreError::Unavailable { message } => TokenError::BackendUnavailable { message },
            other @ StoreError::DeadlineExceeded { .. } => TokenError::BackendUnavailable {
                message: other.to_string(),
            },
        }
    }
}
