//! Cache module for Redis-based token storage
//!
//! This module provides the Redis client with connection retry logic and the
//! Redis implementation of the `TokenStore` contract.

pub mod redis_client;
pub mod redis_token_store;

#[cfg(test)]
mod tests;

pub use redis_client::RedisClient;
pub use redis_token_store::{RedisTokenStore, TOKEN_NAMESPACE, USER_INDEX_NAMESPACE};

// Re-export commonly used types
pub use ot_shared::CacheConfig;
