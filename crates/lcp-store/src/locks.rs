//! Per-license serialization of status transitions.
//!
//! Two requests on the same license must not interleave their
//! read-check-write sequences. Each license reference maps to one async
//! mutex. Requests on different licenses never wait on each other.
//!
//! An entry lives only while some request holds or waits for it. The last
//! guard to drop removes it, so the registry is bounded by the number of
//! licenses in flight.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of per-license mutexes.
///
/// Cheaply cloneable via `Arc`; all clones share the same registry.
#[derive(Debug, Clone, Default)]
pub struct LicenseLocks {
    inner: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl LicenseLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to one license. Access is released when
    /// the guard drops.
    pub async fn lock(&self, license_ref: &str) -> LicenseGuard {
        // The map shard guard must be released before awaiting.
        let mutex = self
            .inner
            .entry(license_ref.to_string())
            .or_default()
            .clone();
        let guard = mutex.lock_owned().await;
        LicenseGuard {
            guard: Some(guard),
            registry: Arc::clone(&self.inner),
            license_ref: license_ref.to_string(),
        }
    }

    /// Number of licenses currently held or waited for.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Exclusive access to one license.
#[derive(Debug)]
pub struct LicenseGuard {
    guard: Option<OwnedMutexGuard<()>>,
    registry: Arc<DashMap<String, Arc<Mutex<()>>>>,
    license_ref: String,
}

impl Drop for LicenseGuard {
    fn drop(&mut self) {
        // Release the mutex first so its count reflects waiters only.
        drop(self.guard.take());
        // The shard lock makes the count check atomic with `lock`'s clone.
        self.registry
            .remove_if(&self.license_ref, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_license_is_serialized() {
        let locks = LicenseLocks::new();
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let inside = inside.clone();
            let max_seen = max_seen.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.lock("lic-1").await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_different_licenses_do_not_block() {
        let locks = LicenseLocks::new();
        let _a = locks.lock("lic-a").await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.lock("lic-b")).await;
        assert!(b.is_ok());
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_guard_release_unblocks() {
        let locks = LicenseLocks::new();
        let first = locks.lock("lic").await;
        let blocked = tokio::time::timeout(Duration::from_millis(20), locks.lock("lic")).await;
        assert!(blocked.is_err());
        drop(first);
        let again = tokio::time::timeout(Duration::from_millis(100), locks.lock("lic")).await;
        assert!(again.is_ok());
    }

    #[tokio::test]
    async fn test_entry_removed_after_last_guard() {
        let locks = LicenseLocks::new();
        let first = locks.lock("lic").await;
        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock("lic").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(first);
        // The waiting request keeps the entry alive until it finishes.
        waiter.await.unwrap();
        assert!(locks.is_empty());

        for n in 0..100 {
            let _guard = locks.lock(&format!("lic-{n}")).await;
        }
        assert!(locks.is_empty());
    }
}
