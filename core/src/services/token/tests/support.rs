//! Shared fixtures for token service tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::{StoreError, StoreResult};
use crate::repositories::{MemoryTokenStore, TokenStore};
use crate::services::token::{TokenGenerator, TokenService, TokenServiceConfig};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(super) struct Session {
    pub role: String,
    pub device: Option<String>,
}

pub(super) fn session(role: &str) -> Session {
    Session {
        role: role.to_string(),
        device: None,
    }
}

pub(super) type TestService = TokenService<Arc<MemoryTokenStore>, Session>;

pub(super) fn create_test_service() -> (TestService, Arc<MemoryTokenStore>) {
    create_service_with(TokenServiceConfig::default())
}

pub(super) fn create_service_with(config: TokenServiceConfig) -> (TestService, Arc<MemoryTokenStore>) {
    let store = Arc::new(MemoryTokenStore::new());
    let service = TestService::new(store.clone(), config).expect("Failed to create token service");
    (service, store)
}

/// Hands out queued token strings first, then numbered ones
pub(super) struct SequenceGenerator {
    queue: Mutex<VecDeque<String>>,
    counter: AtomicUsize,
}

impl SequenceGenerator {
    pub fn new(tokens: &[&str]) -> Self {
        Self {
            queue: Mutex::new(tokens.iter().map(|t| t.to_string()).collect()),
            counter: AtomicUsize::new(0),
        }
    }
}

impl TokenGenerator for SequenceGenerator {
    fn generate(&self) -> String {
        if let Some(next) = self.queue.lock().unwrap().pop_front() {
            return next;
        }
        format!("generated-{}", self.counter.fetch_add(1, Ordering::SeqCst))
    }
}

/// Delegates to a memory store but fails every `index_add` after the first `healthy_adds`
pub(super) struct FlakyIndexStore {
    pub inner: MemoryTokenStore,
    healthy_adds: usize,
    adds: AtomicUsize,
}

impl FlakyIndexStore {
    pub fn new(inner: MemoryTokenStore, healthy_adds: usize) -> Self {
        Self {
            inner,
            healthy_adds,
            adds: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TokenStore for FlakyIndexStore {
    async fn reserve(&self, token: &str, value: &str, ttl: Duration) -> StoreResult<bool> {
        self.inner.reserve(token, value, ttl).await
    }

    async fn get(&self, token: &str) -> StoreResult<String> {
        self.inner.get(token).await
    }

    async fn delete(&self, tokens: &[String]) -> StoreResult<()> {
        self.inner.delete(tokens).await
    }

    async fn exists(&self, token: &str) -> StoreResult<bool> {
        self.inner.exists(token).await
    }

    async fn index_add(&self, user_id: &str, token: &str, expiry_score: f64) -> StoreResult<()> {
        if self.adds.fetch_add(1, Ordering::SeqCst) >= self.healthy_adds {
            return Err(StoreError::unavailable("connection reset by peer"));
        }
        self.inner.index_add(user_id, token, expiry_score).await
    }

    async fn index_remove_expired(&self, user_id: &str, now_score: f64) -> StoreResult<usize> {
        self.inner.index_remove_expired(user_id, now_score).await
    }

    async fn index_list(&self, user_id: &str) -> StoreResult<Vec<String>> {
        self.inner.index_list(user_id).await
    }

    async fn index_remove(&self, user_id: &str, tokens: &[String]) -> StoreResult<usize> {
        self.inner.index_remove(user_id, tokens).await
    }
}

/// Store whose primary lookups never complete
pub(super) struct StalledStore {
    pub inner: MemoryTokenStore,
}

#[async_trait]
impl TokenStore for StalledStore {
    async fn reserve(&self, token: &str, value: &str, ttl: Duration) -> StoreResult<bool> {
        self.inner.reserve(token, value, ttl).await
    }

    async fn get(&self, _token: &str) -> StoreResult<String> {
        std::future::pending().await
    }

    async fn delete(&self, tokens: &[String]) -> StoreResult<()> {
        self.inner.delete(tokens).await
    }

    async fn exists(&self, token: &str) -> StoreResult<bool> {
        self.inner.exists(token).await
    }

    async fn index_add(&self, user_id: &str, token: &str, expiry_score: f64) -> StoreResult<()> {
        self.inner.index_add(user_id, token, expiry_score).await
    }

    async fn index_remove_expired(&self, user_id: &str, now_score: f64) -> StoreResult<usize> {
        self.inner.index_remove_expired(user_id, now_score).await
    }

    async fn index_list(&self, user_id: &str) -> StoreResult<Vec<String>> {
        self.inner.index_list(user_id).await
    }

    async fn index_remove(&self, user_id: &str, tokens: &[String]) -> StoreResult<usize> {
        self.inner.index_remove(user_id, tokens).await
    }
}

/// Store that yields to the scheduler before every call, interleaving concurrent flows
#[derive(Default)]
pub(super) struct YieldingStore {
    pub inner: MemoryTokenStore,
    empty_removes: AtomicUsize,
}

impl YieldingStore {
    /// Number of `index_remove` calls that found nothing to remove
    pub fn empty_removes(&self) -> usize {
        self.empty_removes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenStore for YieldingStore {
    async fn reserve(&self, token: &str, value: &str, ttl: Duration) -> StoreResult<bool> {
        tokio::task::yield_now().await;
        self.inner.reserve(token, value, ttl).await
    }

    async fn get(&self, token: &str) -> StoreResult<String> {
        tokio::task::yield_now().await;
        self.inner.get(token).await
    }

    async fn delete(&self, tokens: &[String]) -> StoreResult<()> {
        tokio::task::yield_now().await;
        self.inner.delete(tokens).await
    }

    async fn exists(&self, token: &str) -> StoreResult<bool> {
        tokio::task::yield_now().await;
        self.inner.exists(token).await
    }

    async fn index_add(&self, user_id: &str, token: &str, expiry_score: f64) -> StoreResult<()> {
        tokio::task::yield_now().await;
        self.inner.index_add(user_id, token, expiry_score).await
    }

    async fn index_remove_expired(&self, user_id: &str, now_score: f64) -> StoreResult<usize> {
        tokio::task::yield_now().await;
        self.inner.index_remove_expired(user_id, now_score).await
    }

    async fn index_list(&self, user_id: &str) -> StoreResult<Vec<String>> {
        tokio::task::yield_now().await;
        self.inner.index_list(user_id).await
    }

    async fn index_remove(&self, user_id: &str, tokens: &[String]) -> StoreResult<usize> {
        tokio::task::yield_now().await;
        let removed = self.inner.index_remove(user_id, tokens).await?;
        if removed == 0 {
            self.empty_removes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(removed)
    }
}
