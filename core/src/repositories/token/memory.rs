//! In-memory implementation of TokenStore
//!
//! Honours TTLs against the wall clock and keeps per-user indexes ordered by
//! score. Used by the engine tests and by deployments without a shared store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::errors::{StoreError, StoreResult};

use super::r#trait::TokenStore;

struct StoredValue {
    value: String,
    expires_at: DateTime<Utc>,
}

impl StoredValue {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

#[derive(Default)]
struct MemoryState {
    records: HashMap<String, StoredValue>,
    indexes: HashMap<String, Vec<(String, f64)>>,
}

impl MemoryState {
    fn purge_expired(&mut self, now: DateTime<Utc>) {
        self.records.retain(|_, stored| stored.is_live(now));
    }
}

/// In-memory token store
#[derive(Clone, Default)]
pub struct MemoryTokenStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryTokenStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Token strings with a live primary entry, sorted
    pub async fn record_ids(&self) -> Vec<String> {
        let now = Utc::now();
        let state = self.state.read().await;
        let mut ids: Vec<String> = state
            .records
            .iter()
            .filter(|(_, stored)| stored.is_live(now))
            .map(|(token, _)| token.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Raw index entries for a user in score order
    pub async fn index_snapshot(&self, user_id: &str) -> Vec<(String, f64)> {
        let state = self.state.read().await;
        let mut entries = state.indexes.get(user_id).cloned().unwrap_or_default();
        sort_entries(&mut entries);
        entries
    }

    /// Users that currently have an index
    pub async fn indexed_users(&self) -> Vec<String> {
        let state = self.state.read().await;
        state.indexes.keys().cloned().collect()
    }

    /// Drop a primary entry without touching any index, as a native TTL eviction would
    pub async fn evict(&self, token: &str) -> bool {
        let mut state = self.state.write().await;
        state.records.remove(token).is_some()
    }

    /// Write a primary entry unconditionally, bypassing reservation
    pub async fn insert_raw(&self, token: &str, value: &str, ttl: Duration) {
        let mut state = self.state.write().await;
        state.records.insert(
            token.to_string(),
            StoredValue {
                value: value.to_string(),
                expires_at: expiry_from(Utc::now(), ttl),
            },
        );
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn reserve(&self, token: &str, value: &str, ttl: Duration) -> StoreResult<bool> {
        let now = Utc::now();
        let mut state = self.state.write().await;
        state.purge_expired(now);

        if state.records.contains_key(token) {
            return Ok(false);
        }

        state.records.insert(
            token.to_string(),
            StoredValue {
                value: value.to_string(),
                expires_at: expiry_from(now, ttl),
            },
        );
        Ok(true)
    }

    async fn get(&self, token: &str) -> StoreResult<String> {
        let now = Utc::now();
        let state = self.state.read().await;
        match state.records.get(token) {
            Some(stored) if stored.is_live(now) => Ok(stored.value.clone()),
            _ => Err(StoreError::NotFound),
        }
    }

    async fn delete(&self, tokens: &[String]) -> StoreResult<()> {
        let mut state = self.state.write().await;
        for token in tokens {
            state.records.remove(token);
        }
        Ok(())
    }

    async fn exists(&self, token: &str) -> StoreResult<bool> {
        let now = Utc::now();
        let state = self.state.read().await;
        Ok(state
            .records
            .get(token)
            .map(|stored| stored.is_live(now))
            .unwrap_or(false))
    }

    async fn index_add(&self, user_id: &str, token: &str, expiry_score: f64) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let entries = state.indexes.entry(user_id.to_string()).or_default();
        match entries.iter_mut().find(|(member, _)| member == token) {
            Some(entry) => entry.1 = expiry_score,
            None => entries.push((token.to_string(), expiry_score)),
        }
        Ok(())
    }

    async fn index_remove_expired(&self, user_id: &str, now_score: f64) -> StoreResult<usize> {
        let mut state = self.state.write().await;
        let Some(entries) = state.indexes.get_mut(user_id) else {
            return Ok(0);
        };

        let before = entries.len();
        entries.retain(|(_, score)| *score > now_score);
        let removed = before - entries.len();

        if entries.is_empty() {
            state.indexes.remove(user_id);
        }
        Ok(removed)
    }

    async fn index_list(&self, user_id: &str) -> StoreResult<Vec<String>> {
        Ok(self
            .index_snapshot(user_id)
            .await
            .into_iter()
            .map(|(member, _)| member)
            .collect())
    }

    async fn index_remove(&self, user_id: &str, tokens: &[String]) -> StoreResult<usize> {
        let mut state = self.state.write().await;
        let Some(entries) = state.indexes.get_mut(user_id) else {
            return Ok(0);
        };

        let before = entries.len();
        entries.retain(|(member, _)| !tokens.contains(member));
        let removed = before - entries.len();

        if entries.is_empty() {
            state.indexes.remove(user_id);
        }
        Ok(removed)
    }
}

fn expiry_from(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

// Score ascending, ties broken by member like a sorted set
fn sort_entries(entries: &mut [(String, f64)]) {
    entries.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
}
