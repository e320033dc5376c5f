//! Redis-backed implementation of the token store
//!
//! Records live under `TOKENS:{token}` with a native expiry. Each user's index
//! is a sorted set under `USER_TOKENS:{user_id}` scored by absolute expiry in
//! unix seconds. Both key families honour the configured key prefix.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use ot_core::errors::{StoreError, StoreResult};
use ot_core::repositories::TokenStore;
use ot_shared::CacheConfig;

use super::redis_client::RedisClient;

/// Key namespace for primary token records
pub const TOKEN_NAMESPACE: &str = "TOKENS";

/// Key namespace for per-user sorted-set indexes
pub const USER_INDEX_NAMESPACE: &str = "USER_TOKENS";

/// Token store persisting records and user indexes in Redis
#[derive(Clone)]
pub struct RedisTokenStore {
    client: Arc<RedisClient>,
}

impl RedisTokenStore {
    /// Create a store on top of an existing client
    pub fn new(client: Arc<RedisClient>) -> Self {
        Self { client }
    }

    /// Underlying Redis client
    pub fn client(&self) -> &RedisClient {
        &self.client
    }

    /// Physical key of a token record
    pub fn token_key(&self, token: &str) -> String {
        namespaced_key(self.client.config(), TOKEN_NAMESPACE, token)
    }

    /// Physical key of a user's index
    pub fn index_key(&self, user_id: &str) -> String {
        namespaced_key(self.client.config(), USER_INDEX_NAMESPACE, user_id)
    }
}

pub(crate) fn namespaced_key(config: &CacheConfig, namespace: &str, id: &str) -> String {
    config.make_key(&format!("{}:{}", namespace, id))
}

#[async_trait]
impl TokenStore for RedisTokenStore {
    async fn reserve(&self, token: &str, value: &str, ttl: Duration) -> StoreResult<bool> {
        Ok(self
            .client
            .set_nx_px(&self.token_key(token), value, ttl)
            .await?)
    }

    async fn get(&self, token: &str) -> StoreResult<String> {
        self.client
            .get(&self.token_key(token))
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn delete(&self, tokens: &[String]) -> StoreResult<()> {
        let keys: Vec<String> = tokens.iter().map(|token| self.token_key(token)).collect();
        self.client.unlink(&keys).await?;
        Ok(())
    }

    async fn exists(&self, token: &str) -> StoreResult<bool> {
        Ok(self.client.exists(&self.token_key(token)).await?)
    }

    async fn index_add(&self, user_id: &str, token: &str, expiry_score: f64) -> StoreResult<()> {
        Ok(self
            .client
            .zadd(&self.index_key(user_id), token, expiry_score)
            .await?)
    }

    async fn index_remove_expired(&self, user_id: &str, now_score: f64) -> StoreResult<usize> {
        Ok(self
            .client
            .zrem_range_by_score(&self.index_key(user_id), now_score)
            .await?)
    }

    async fn index_list(&self, user_id: &str) -> StoreResult<Vec<String>> {
        Ok(self.client.zrange_all(&self.index_key(user_id)).await?)
    }

    async fn index_remove(&self, user_id: &str, tokens: &[String]) -> StoreResult<usize> {
        Ok(self.client.zrem(&self.index_key(user_id), tokens).await?)
    }
}
