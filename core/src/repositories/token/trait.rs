//! Token store trait defining the storage capabilities the engine depends on.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::errors::StoreResult;

/// Capability contract for the key-value store behind the token engine
///
/// Two structures live in the store:
/// - the primary key space, one entry per token string holding the encoded record
///   and expiring natively after its TTL
/// - one ordered index per user, mapping token strings to their absolute expiry
///   (unix seconds) as score
///
/// Implementations are the sole writers of the physical key space. Transport
/// failures surface as `StoreError::Unavailable` and are never retried here.
/// Cancellation is cooperative: dropping a returned future abandons the call.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Atomically store `value` under `token` if the key is absent
    ///
    /// # Returns
    /// * `Ok(true)` - The key was reserved with the given TTL
    /// * `Ok(false)` - The key already exists; nothing was written
    /// * `Err(StoreError)` - Transport failure
    ///
    /// # Example
    /// ```no_run
    /// # use std::time::Duration;
    /// # use ot_core::repositories::TokenStore;
    /// # async fn example(store: &impl TokenStore) -> Result<(), Box<dyn std::error::Error>> {
    /// if !store.reserve("candidate", "{}", Duration::from_secs(60)).await? {
    ///     println!("collision, pick another identifier");
    /// }
    /// # Ok(())
    /// # }
    /// ```
    async fn reserve(&self, token: &str, value: &str, ttl: Duration) -> StoreResult<bool>;

    /// Fetch the value stored under `token`
    ///
    /// # Returns
    /// * `Ok(String)` - The stored value
    /// * `Err(StoreError::NotFound)` - No live entry
    async fn get(&self, token: &str) -> StoreResult<String>;

    /// Remove entries from the primary key space; missing keys are ignored
    async fn delete(&self, tokens: &[String]) -> StoreResult<()>;

    /// Check whether a live entry exists under `token`
    async fn exists(&self, token: &str) -> StoreResult<bool>;

    /// Add `token` to the user's index, or update its score
    async fn index_add(&self, user_id: &str, token: &str, expiry_score: f64) -> StoreResult<()>;

    /// Drop every index entry whose score is at or below `now_score`
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of entries removed
    async fn index_remove_expired(&self, user_id: &str, now_score: f64) -> StoreResult<usize>;

    /// List the user's indexed tokens ordered by ascending score
    async fn index_list(&self, user_id: &str) -> StoreResult<Vec<String>>;

    /// Remove tokens from the user's index
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of entries that were present and removed
    async fn index_remove(&self, user_id: &str, tokens: &[String]) -> StoreResult<usize>;
}

#[async_trait]
impl<T: TokenStore + ?Sized> TokenStore for Arc<T> {
    async fn reserve(&self, token: &str, value: &str, ttl: Duration) -> StoreResult<bool> {
        (**self).reserve(token, value, ttl).await
    }

    async fn get(&self, token: &str) -> StoreResult<String> {
        (**self).get(token).await
    }

    async fn delete(&self, tokens: &[String]) -> StoreResult<()> {
        (**self).delete(tokens).await
    }

    async fn exists(&self, token: &str) -> StoreResult<bool> {
        (**self).exists(token).await
    }

    async fn index_add(&self, user_id: &str, token: &str, expiry_score: f64) -> StoreResult<()> {
        (**self).index_add(user_id, token, expiry_score).await
    }

    async fn index_remove_expired(&self, user_id: &str, now_score: f64) -> StoreResult<usize> {
        (**self).index_remove_expired(user_id, now_score).await
    }

    async fn index_list(&self, user_id: &str) -> StoreResult<Vec<String>> {
        (**self).index_list(user_id).await
    }

    async fn index_remove(&self, user_id: &str, tokens: &[String]) -> StoreResult<usize> {
        (**self).index_remove(user_id, tokens).await
    }
}
