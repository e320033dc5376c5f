//! Redis cache client implementation
//!
//! This module provides a Redis client over a multiplexed connection with
//! connection retry logic and the commands the token store needs: conditional
//! set with millisecond expiry, lookups, unlinking, and sorted-set maintenance.
//! Individual commands are not retried; callers bound them with their own deadlines.

use redis::{
    aio::MultiplexedConnection, AsyncCommands, Client, IntoConnectionInfo, RedisError,
};
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use ot_core::domain::mask_token;
use ot_shared::CacheConfig;

use crate::InfrastructureError;

/// Redis cache client over a single multiplexed connection
///
/// Cloning is cheap and every clone shares the same connection.
#[derive(Clone)]
pub struct RedisClient {
    /// Redis multiplexed connection for async operations
    connection: MultiplexedConnection,
    /// Configuration used to create this client
    config: CacheConfig,
}

impl RedisClient {
    /// Create a new Redis client
    ///
    /// # Arguments
    /// * `config` - Cache configuration settings
    ///
    /// # Returns
    /// * `Result<Self, InfrastructureError>` - Redis client or error
    ///
    /// # Example
    /// ```no_run
    /// use ot_infra::cache::{CacheConfig, RedisClient};
    ///
    /// async fn create_client() -> Result<RedisClient, Box<dyn std::error::Error>> {
    ///     let config = CacheConfig::new("redis://localhost:6379").with_prefix("auth");
    ///     let client = RedisClient::new(config).await?;
    ///     Ok(client)
    /// }
    /// ```
    pub async fn new(config: CacheConfig) -> Result<Self, InfrastructureError> {
        info!(
            "Creating Redis client with URL: {} (database {})",
            mask_url(&config.url),
            config.database
        );

        let mut connection_info = config.url.as_str().into_connection_info().map_err(|e| {
            error!("Failed to parse Redis URL: {}", e);
            InfrastructureError::Config(format!("Invalid Redis URL: {}", e))
        })?;
        if config.database != 0 {
            connection_info.redis.db = i64::from(config.database);
        }

        let client = Client::open(connection_info).map_err(|e| {
            error!("Failed to create Redis client: {}", e);
            InfrastructureError::Config(format!("Invalid Redis URL: {}", e))
        })?;

        let connection = Self::create_connection_with_retry(client, &config).await?;

        info!("Redis client created successfully");

        Ok(Self { connection, config })
    }

    /// Create multiplexed connection with retry logic
    async fn create_connection_with_retry(
        client: Client,
        config: &CacheConfig,
    ) -> Result<MultiplexedConnection, InfrastructureError> {
        let max_attempts = config.connect_retries.max(1);
        let connect_timeout = Duration::from_secs(config.connection_timeout);
        let mut attempts = 0;
        let mut delay = config.connect_retry_delay_ms;

        loop {
            attempts += 1;
            debug!("Attempting to connect to Redis (attempt {})", attempts);

            let outcome = match timeout(connect_timeout, client.get_multiplexed_async_connection()).await {
                Ok(Ok(connection)) => Ok(connection),
                Ok(Err(e)) => Err(InfrastructureError::Cache(e)),
                Err(_) => Err(InfrastructureError::Timeout(config.connection_timeout)),
            };

            match outcome {
                Ok(connection) => {
                    info!("Successfully connected to Redis");
                    return Ok(connection);
                }
                Err(e) if attempts < max_attempts => {
                    warn!(
                        "Failed to connect to Redis (attempt {}/{}): {}. Retrying in {}ms...",
                        attempts, max_attempts, e, delay
                    );
                    sleep(Duration::from_millis(delay)).await;
                    // Exponential backoff with cap at 5 seconds
                    delay = (delay * 2).min(5000);
                }
                Err(e) => {
                    error!(
                        "Failed to connect to Redis after {} attempts: {}",
                        attempts, e
                    );
                    return Err(e);
                }
            }
        }
    }

    /// Configuration used to create this client
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Store `value` under `key` only if the key is absent, expiring after `ttl`
    ///
    /// Issues `SET key value NX PX ttl`. Sub-millisecond TTLs are rounded up to 1ms.
    ///
    /// # Returns
    /// * `Ok(true)` - The key was written
    /// * `Ok(false)` - The key already existed
    pub async fn set_nx_px(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, InfrastructureError> {
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        debug!("Reserving key '{}' with expiry {}ms", mask_key(key), ttl_ms);

        let mut conn = self.connection.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await
            .map_err(|e| command_failed("reserve", key, e))?;

        Ok(reply.is_some())
    }

    /// Get a value from cache
    ///
    /// # Returns
    /// * `Result<Option<String>, InfrastructureError>` - Cached value or None if not found
    pub async fn get(&self, key: &str) -> Result<Option<String>, InfrastructureError> {
        debug!("Getting key '{}'", mask_key(key));

        let mut conn = self.connection.clone();
        let value: Option<String> = conn
            .get(key)
            .await
            .map_err(|e| command_failed("get", key, e))?;

        if value.is_none() {
            debug!("Key '{}' not found", mask_key(key));
        }
        Ok(value)
    }

    /// Unlink keys from cache; missing keys are ignored
    ///
    /// # Returns
    /// * `Result<usize, InfrastructureError>` - Number of keys that existed
    pub async fn unlink(&self, keys: &[String]) -> Result<usize, InfrastructureError> {
        if keys.is_empty() {
            return Ok(0);
        }
        debug!("Unlinking {} keys", keys.len());

        let mut conn = self.connection.clone();
        let removed: usize = redis::cmd("UNLINK")
            .arg(keys)
            .query_async(&mut conn)
            .await
            .map_err(|e| command_failed("unlink", &keys[0], e))?;

        Ok(removed)
    }

    /// Check if a key exists in cache
    pub async fn exists(&self, key: &str) -> Result<bool, InfrastructureError> {
        let mut conn = self.connection.clone();
        let exists: bool = conn
            .exists(key)
            .await
            .map_err(|e| command_failed("exists", key, e))?;

        debug!("Key '{}' exists: {}", mask_key(key), exists);
        Ok(exists)
    }

    /// Get time-to-live for a key
    ///
    /// # Returns
    /// * `Result<Option<i64>, InfrastructureError>` - TTL in seconds, None if key doesn't exist or has no expiry
    pub async fn ttl(&self, key: &str) -> Result<Option<i64>, InfrastructureError> {
        let mut conn = self.connection.clone();
        let ttl: i64 = conn
            .ttl(key)
            .await
            .map_err(|e| command_failed("ttl", key, e))?;

        Ok((ttl >= 0).then_some(ttl))
    }

    /// Add a member to a sorted set, or update its score
    pub async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<(), InfrastructureError> {
        debug!("Adding member '{}' to '{}' with score {}", mask_token(member), key, score);

        let mut conn = self.connection.clone();
        redis::cmd("ZADD")
            .arg(key)
            .arg(score)
            .arg(member)
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| command_failed("zadd", key, e))
    }

    /// Remove sorted-set members with a score at or below `max_score`
    ///
    /// # Returns
    /// * `Result<usize, InfrastructureError>` - Number of members removed
    pub async fn zrem_range_by_score(&self, key: &str, max_score: f64) -> Result<usize, InfrastructureError> {
        let mut conn = self.connection.clone();
        redis::cmd("ZREMRANGEBYSCORE")
            .arg(key)
            .arg("-inf")
            .arg(max_score)
            .query_async::<_, usize>(&mut conn)
            .await
            .map_err(|e| command_failed("zremrangebyscore", key, e))
    }

    /// All members of a sorted set in ascending score order
    pub async fn zrange_all(&self, key: &str) -> Result<Vec<String>, InfrastructureError> {
        let mut conn = self.connection.clone();
        redis::cmd("ZRANGE")
            .arg(key)
            .arg(0)
            .arg(-1)
            .query_async::<_, Vec<String>>(&mut conn)
            .await
            .map_err(|e| command_failed("zrange", key, e))
    }

    /// Remove members from a sorted set
    ///
    /// # Returns
    /// * `Result<usize, InfrastructureError>` - Number of members that were present
    pub async fn zrem(&self, key: &str, members: &[String]) -> Result<usize, InfrastructureError> {
        if members.is_empty() {
            return Ok(0);
        }

        let mut conn = self.connection.clone();
        redis::cmd("ZREM")
            .arg(key)
            .arg(members)
            .query_async::<_, usize>(&mut conn)
            .await
            .map_err(|e| command_failed("zrem", key, e))
    }

    /// Check if the Redis connection is healthy
    ///
    /// Performs a PING command to verify connectivity.
    ///
    /// # Returns
    /// * `Result<bool, InfrastructureError>` - True if healthy, error otherwise
    pub async fn health_check(&self) -> Result<bool, InfrastructureError> {
        debug!("Performing Redis health check");

        let mut conn = self.connection.clone();
        let result = redis::cmd("PING").query_async::<_, String>(&mut conn).await;

        match result {
            Ok(response) if response == "PONG" => {
                debug!("Redis health check passed");
                Ok(true)
            }
            Ok(response) => {
                warn!("Redis health check returned unexpected response: {}", response);
                Ok(false)
            }
            Err(e) => {
                error!("Redis health check failed: {}", e);
                Err(InfrastructureError::Cache(e))
            }
        }
    }
}

fn command_failed(command: &str, key: &str, e: RedisError) -> InfrastructureError {
    error!("Redis {} on '{}' failed: {}", command, mask_key(key), e);
    InfrastructureError::Cache(e)
}

/// Mask the token part of a namespaced key for logging
pub(crate) fn mask_key(key: &str) -> String {
    match key.rsplit_once(':') {
        Some((namespace, tail)) => format!("{}:{}", namespace, mask_token(tail)),
        None => mask_token(key),
    }
}

/// Mask sensitive parts of Redis URL for logging
pub(crate) fn mask_url(url: &str) -> String {
    if let Some(at_pos) = url.find('@') {
        if let Some(proto_end) = url.find("://") {
            let proto = &url[..proto_end + 3];
            let host_part = &url[at_pos..];
            return format!("{}****{}", proto, host_part);
        }
    }
    url.to_string()
}
