//! Per-user serialization of the read-decide-append sequence.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per user id, created on first use.
///
/// Classifications for different users never share a lock.
#[derive(Debug, Default)]
pub struct UserLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `user_id`'s state.
    pub async fn acquire(&self, user_id: &str) -> OwnedMutexGuard<()> {
        // Clone the Arc out so the shard guard is released before awaiting.
        let lock = Arc::clone(&self.locks.entry(user_id.to_string()).or_default());
        lock.lock_owned().await
    }

    /// Drop locks nobody holds or waits on. Returns the number dropped.
    pub fn release_idle(&self) -> usize {
        let before = self.locks.len();
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        before.saturating_sub(self.locks.len())
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn same_user_waits_other_user_does_not() {
        let locks = UserLocks::new();
        let held = locks.acquire("u1").await;

        let same = tokio::time::timeout(Duration::from_millis(20), locks.acquire("u1")).await;
        assert!(same.is_err());

        let other = tokio::time::timeout(Duration::from_millis(20), locks.acquire("u2")).await;
        assert!(other.is_ok());

        drop(held);
        let again = tokio::time::timeout(Duration::from_millis(20), locks.acquire("u1")).await;
        assert!(again.is_ok());
    }

    #[tokio::test]
    async fn idle_locks_are_released() {
        let locks = UserLocks::new();
        let held = locks.acquire("busy").await;
        drop(locks.acquire("idle").await);

        assert_eq!(locks.release_idle(), 1);
        assert_eq!(locks.len(), 1);
        drop(held);
        assert_eq!(locks.release_idle(), 1);
        assert!(locks.is_empty());
    }
}
