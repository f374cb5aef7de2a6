//! Per-user concurrency control.
//!
//! Ensures only one turn runs per user at a time.  A second request
//! arriving while a turn is in-flight waits for the running turn to
//! finish, so two concurrent turns for the same user can never interleave
//! their context mutations.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Manages per-user turn locks.
///
/// Each user identity maps to a `Semaphore(1)`.  Acquiring the permit
/// ensures exclusive access for one turn at a time; the permit is held
/// for the duration of the turn and auto-releases on drop, on every exit
/// path.
pub struct SessionLockMap {
    locks: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl Default for SessionLockMap {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionLockMap {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Acquire the turn lock for a user, waiting for any in-flight turn to
    /// finish first.
    pub async fn acquire(&self, user_id: &str) -> Result<OwnedSemaphorePermit, SessionBusy> {
        let sem = {
            let mut locks = self.locks.lock();
            locks
                .entry(user_id.to_owned())
                .or_insert_with(|| Arc::new(Semaphore::new(1)))
                .clone()
        };

        sem.acquire_owned().await.map_err(|_| SessionBusy)
    }

    /// Number of tracked users (for monitoring).
    pub fn session_count(&self) -> usize {
        self.locks.lock().len()
    }

    /// Remove locks for users without a turn in flight (cleanup).
    pub fn prune_idle(&self) {
        let mut locks = self.locks.lock();
        locks.retain(|_, sem| sem.available_permits() == 0);
    }
}

/// Error returned when a user's lock can no longer be acquired.
#[derive(Debug)]
pub struct SessionBusy;

impl std::fmt::Display for SessionBusy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "a turn is already in progress for this user")
    }
}

impl std::error::Error for SessionBusy {}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sequential_access() {
        let map = SessionLockMap::new();

        let permit1 = map.acquire("u1").await.unwrap();
        drop(permit1);

        let permit2 = map.acquire("u1").await.unwrap();
        drop(permit2);
    }

    #[tokio::test]
    async fn different_users_concurrent() {
        let map = Arc::new(SessionLockMap::new());

        let p1 = map.acquire("u1").await.unwrap();
        let p2 = map.acquire("u2").await.unwrap();

        // Both acquired simultaneously.
        assert_eq!(map.session_count(), 2);

        drop(p1);
        drop(p2);
    }

    #[tokio::test]
    async fn same_user_waits() {
        let map = Arc::new(SessionLockMap::new());
        let map2 = map.clone();

        let p1 = map.acquire("u1").await.unwrap();

        // Spawn a task that waits for the lock.
        let handle = tokio::spawn(async move {
            let _p2 = map2.acquire("u1").await.unwrap();
            42
        });

        // Give the waiter a moment to queue.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        // Release the first permit.
        drop(p1);

        // The waiter should now proceed.
        let result = handle.await.unwrap();
        assert_eq!(result, 42);
    }

    #[tokio::test]
    async fn prune_removes_idle_locks() {
        let map = SessionLockMap::new();
        let p = map.acquire("busy").await.unwrap();
        drop(map.acquire("idle").await.unwrap());

        map.prune_idle();
        assert_eq!(map.session_count(), 1);
        drop(p);
    }
}
