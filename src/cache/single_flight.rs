use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-key async locks used to collapse concurrent cache misses.
///
/// The first caller for a key computes while later callers wait on the same
/// lock, then re-read the cache once it is released. Entries are removed when
/// the last holder drops its guard, so the map only tracks keys in flight.
#[derive(Debug, Default, Clone)]
pub struct InflightRegistry {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl InflightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, key: &str) -> InflightGuard {
        let lock = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let guard = lock.lock_owned().await;
        InflightGuard {
            key: key.to_string(),
            locks: self.locks.clone(),
            _guard: guard,
        }
    }

    /// Number of keys currently being computed or waited on.
    pub fn in_flight(&self) -> usize {
        self.locks.len()
    }
}

pub struct InflightGuard {
    key: String,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
    _guard: OwnedMutexGuard<()>,
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        // Two strong refs remain when nobody else is waiting: the map's and this guard's.
        self.locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) <= 2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn guard_release_cleans_up_key() {
        let registry = InflightRegistry::new();
        {
            let _guard = registry.acquire("warehouse-dashboard:1").await;
            assert_eq!(registry.in_flight(), 1);
        }
        assert_eq!(registry.in_flight(), 0);
    }

    #[tokio::test]
    async fn same_key_callers_are_serialized() {
        let registry = InflightRegistry::new();
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let registry = registry.clone();
            let active = active.clone();
            let peak = peak.clone();
            handles.push(tokio::spawn(async move {
                let _guard = registry.acquire("supplier-dashboard:9").await;
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert_eq!(registry.in_flight(), 0);
    }

    #[tokio::test]
    async fn different_keys_do_not_block_each_other() {
        let registry = InflightRegistry::new();
        let _a = registry.acquire("a").await;
        let b = tokio::time::timeout(Duration::from_millis(50), registry.acquire("b")).await;
        assert!(b.is_ok());
    }
}
