//! Lazy reconciliation of a user's token index against the primary store
//!
//! There is no background cleanup task. Every per-user operation sweeps the
//! user's index first, so stale entries never outlive the next touch.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::mask_token;
use crate::errors::StoreResult;
use crate::repositories::TokenStore;

use super::deadline::BoundedStore;

/// Outcome of one sweep over a user's index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Entries dropped because their expiry score had passed
    pub expired_removed: usize,
    /// Entries dropped because the primary store no longer held them
    pub orphaned_removed: usize,
    /// Token strings still indexed after the sweep, in ascending expiry order
    pub live: Vec<String>,
}

impl SweepReport {
    /// Total number of index entries removed
    pub fn total_removed(&self) -> usize {
        self.expired_removed + self.orphaned_removed
    }

    /// Whether `token` survived the sweep
    pub fn contains(&self, token: &str) -> bool {
        self.live.iter().any(|live| live == token)
    }
}

/// Index score for an instant: fractional unix seconds
pub(crate) fn score_at(at: DateTime<Utc>) -> f64 {
    at.timestamp_millis() as f64 / 1000.0
}

pub(crate) struct LazySweeper<'a, S: ?Sized> {
    store: BoundedStore<'a, S>,
}

impl<'a, S: TokenStore + ?Sized> LazySweeper<'a, S> {
    pub(crate) fn new(store: BoundedStore<'a, S>) -> Self {
        Self { store }
    }

    /// Drop expired entries by score, then entries whose primary record is gone
    pub(crate) async fn sweep(&self, user_id: &str, now: DateTime<Utc>) -> StoreResult<SweepReport> {
        let expired_removed = self
            .store
            .index_remove_expired(user_id, score_at(now))
            .await?;

        let indexed = self.store.index_list(user_id).await?;
        let mut live = Vec::with_capacity(indexed.len());
        let mut orphans = Vec::new();

        for token in indexed {
            if self.store.exists(&token).await? {
                live.push(token);
            } else {
                debug!("Orphaned index entry {} for user {}", mask_token(&token), user_id);
                orphans.push(token);
            }
        }

        let orphaned_removed = self.store.index_remove(user_id, &orphans).await?;

        if expired_removed > 0 || orphaned_removed > 0 {
            debug!(
                "Swept index for user {} - Expired: {}, Orphaned: {}, Live: {}",
                user_id,
                expired_removed,
                orphaned_removed,
                live.len()
            );
        }

        Ok(SweepReport {
            expired_removed,
            orphaned_removed,
            live,
        })
    }
}
