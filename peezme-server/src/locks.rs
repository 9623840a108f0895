use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

/// One async mutex per record id. Holding the guard gives the holder
/// exclusive rights to read-modify-write that record.
#[derive(Default)]
pub struct KeyedLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Wait as long as it takes.
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        self.slot(key).lock_owned().await
    }

    pub fn try_acquire(&self, key: &str) -> Option<OwnedMutexGuard<()>> {
        self.slot(key).try_lock_owned().ok()
    }

    /// Try up to `attempts` times, doubling the pause after each miss.
    pub async fn acquire_with_backoff(
        &self,
        key: &str,
        attempts: u32,
        base_delay: Duration,
    ) -> Option<OwnedMutexGuard<()>> {
        let slot = self.slot(key);
        let mut delay = base_delay;
        for attempt in 1..=attempts.max(1) {
            if let Ok(guard) = slot.clone().try_lock_owned() {
                return Some(guard);
            }
            if attempt < attempts {
                debug!(key = %key, attempt, "Lock busy, backing off");
                tokio::time::sleep(delay).await;
                delay = delay.saturating_mul(2);
            }
        }
        None
    }

    pub fn is_locked(&self, key: &str) -> bool {
        self.locks
            .get(key)
            .map(|slot| slot.try_lock().is_err())
            .unwrap_or(false)
    }

    /// Drop slots nobody holds or waits on.
    pub fn prune(&self) -> usize {
        let before = self.locks.len();
        self.locks.retain(|_, slot| Arc::strong_count(slot) > 1);
        before - self.locks.len()
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
    use super::*;

    #[tokio::test]
    async fn test_second_holder_is_refused() {
        let locks = KeyedLocks::new();
        let guard = locks.try_acquire("t1").unwrap();
        assert!(locks.is_locked("t1"));
        assert!(locks.try_acquire("t1").is_none());
        assert!(locks.try_acquire("t2").is_some());

        drop(guard);
        assert!(!locks.is_locked("t1"));
        assert!(locks.try_acquire("t1").is_some());
    }

    #[tokio::test]
    async fn test_backoff_gives_up_then_succeeds_after_release() {
        let locks = Arc::new(KeyedLocks::new());
        let guard = locks.acquire("t1").await;

        let missed = locks
            .acquire_with_backoff("t1", 3, Duration::from_millis(1))
            .await;
        assert!(missed.is_none());

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                locks
                    .acquire_with_backoff("t1", 10, Duration::from_millis(5))
                    .await
                    .is_some()
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(guard);
        assert!(waiter.await.unwrap());
    }

    #[tokio::test]
    async fn test_prune_keeps_held_slots() {
        let locks = KeyedLocks::new();
        let _held = locks.acquire("a").await;
        drop(locks.acquire("b").await);
        assert_eq!(locks.len(), 2);
        assert_eq!(locks.prune(), 1);
        assert!(locks.is_locked("a"));
    }
}
