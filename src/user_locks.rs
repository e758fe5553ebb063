//! # Per-User Lock Module
//!
//! Serialises find-then-write sequences of the same user inside this
//! process. Two concurrent updates from one user would otherwise both find
//! "no row" and append twice. Other processes writing the same store are not
//! covered.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Pool of async mutexes keyed by user id
///
/// Locks are created on first request and shared through `Arc`; entries
/// nobody holds are dropped by [`UserLockManager::prune`].
#[derive(Debug, Default)]
pub struct UserLockManager {
    locks: Mutex<HashMap<u64, Arc<AsyncMutex<()>>>>,
}

impl UserLockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `user_id`'s record
    pub async fn lock(&self, user_id: u64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap();
            Arc::clone(locks.entry(user_id).or_default())
        };
        lock.lock_owned().await
    }

    /// Drop locks that are neither held nor awaited
    pub fn prune(&self) -> usize {
        let mut locks = self.locks.lock().unwrap();
        let before = locks.len();
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        let removed = before - locks.len();
        if removed > 0 {
            tracing::debug!(removed, "Pruned idle user locks");
        }
        removed
    }

    /// Number of tracked users
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_user_is_serialised() {
        let manager = Arc::new(UserLockManager::new());
        let guard = manager.lock(7).await;

        let contender = {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move {
                let _guard = manager.lock(7).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn test_different_users_do_not_block() {
        let manager = UserLockManager::new();
        let _a = manager.lock(1).await;
        let _b = manager.lock(2).await;
        assert_eq!(manager.len(), 2);
    }

    #[tokio::test]
    async fn test_prune_keeps_held_locks() {
        let manager = UserLockManager::new();
        let held = manager.lock(1).await;
        drop(manager.lock(2).await);

        assert_eq!(manager.prune(), 1);
        assert_eq!(manager.len(), 1);
        drop(held);
        assert_eq!(manager.prune(), 1);
        assert!(manager.is_empty());
    }
}
