//! Per-user async locks
//!
//! Every balance mutation runs while holding the locks of all users it
//! touches. Locks are taken in ascending id order so two operations over the
//! same pair of users cannot deadlock.

use dashmap::DashMap;
use std::sync::Arc;
use taskpay_core::UserId;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Guards held for the duration of one ledger operation
#[derive(Debug)]
pub struct UserGuards {
    _guards: Vec<OwnedMutexGuard<()>>,
}

/// Lock table keyed by user id
#[derive(Debug, Default)]
pub struct UserLocks {
    inner: DashMap<UserId, Arc<Mutex<()>>>,
}

impl UserLocks {
    /// Create empty lock table
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the locks of `ids`, deduplicated, in sorted order
    pub async fn acquire<'a, I>(&self, ids: I) -> UserGuards
    where
        I: IntoIterator<Item = &'a UserId>,
    {
        let mut ordered: Vec<&UserId> = ids.into_iter().collect();
        ordered.sort();
        ordered.dedup();

        let mut guards = Vec::with_capacity(ordered.len());
        for id in ordered {
            // Clone the Arc out so no shard lock is held across the await.
            let lock = self.inner.entry(id.clone()).or_default().value().clone();
            guards.push(lock.lock_owned().await);
        }
        UserGuards { _guards: guards }
    }

    /// Number of users that ever took a lock
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// No lock was ever taken
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
