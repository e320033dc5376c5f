//! Store-level and engine-level error types.

mod types;

pub use types::{StoreError, TokenError};

/// Result of a lifecycle engine operation
pub type TokenResult<T> = Result<T, TokenError>;

/// Result of a token store call
pub type StoreResult<T> = Result<T, StoreError>;
