//! Domain entities representing issued tokens.

pub mod token;

// Re-export commonly used types
pub use token::{mask_token, IssuedToken, RecordHeader, TokenKind, TokenPair, TokenRecord};
