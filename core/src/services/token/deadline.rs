//! Per-call deadlines around store operations

use std::future::Future;
use std::time::Duration;

use tokio::time::timeout;
use tracing::warn;

use crate::errors::{StoreError, StoreResult};
use crate::repositories::TokenStore;

/// Borrowed view of a store that bounds every call by a fixed deadline
///
/// An elapsed deadline abandons the call and reports
/// `StoreError::DeadlineExceeded` naming the operation.
pub(crate) struct BoundedStore<'a, S: ?Sized> {
    store: &'a S,
    limit: Duration,
}

impl<S: ?Sized> Clone for BoundedStore<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: ?Sized> Copy for BoundedStore<'_, S> {}

impl<'a, S: TokenStore + ?Sized> BoundedStore<'a, S> {
    pub(crate) fn new(store: &'a S, limit: Duration) -> Self {
        Self { store, limit }
    }

    async fn run<T, F>(&self, operation: &'static str, call: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        match timeout(self.limit, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "Store operation '{}' exceeded its {:?} deadline",
                    operation, self.limit
                );
                Err(StoreError::DeadlineExceeded {
                    operation: operation.to_string(),
                })
            }
        }
    }

    pub(crate) async fn reserve(&self, token: &str, value: &str, ttl: Duration) -> StoreResult<bool> {
        self.run("reserve", self.store.reserve(token, value, ttl)).await
    }

    pub(crate) async fn get(&self, token: &str) -> StoreResult<String> {
        self.run("get", self.store.get(token)).await
    }

    pub(crate) async fn delete(&self, tokens: &[String]) -> StoreResult<()> {
        if tokens.is_empty() {
            return Ok(());
        }
        self.run("delete", self.store.delete(tokens)).await
    }

    pub(crate) async fn exists(&self, token: &str) -> StoreResult<bool> {
        self.run("exists", self.store.exists(token)).await
    }

    pub(crate) async fn index_add(&self, user_id: &str, token: &str, expiry_score: f64) -> StoreResult<()> {
        self.run("index_add", self.store.index_add(user_id, token, expiry_score))
            .await
    }

    pub(crate) async fn index_remove_expired(&self, user_id: &str, now_score: f64) -> StoreResult<usize> {
        self.run(
            "index_remove_expired",
            self.store.index_remove_expired(user_id, now_score),
        )
        .await
    }

    pub(crate) async fn index_list(&self, user_id: &str) -> StoreResult<Vec<String>> {
        self.run("index_list", self.store.index_list(user_id)).await
    }

    pub(crate) async fn index_remove(&self, user_id: &str, tokens: &[String]) -> StoreResult<usize> {
        if tokens.is_empty() {
            return Ok(0);
        }
        self.run("index_remove", self.store.index_remove(user_id, tokens))
            .await
    }
}
