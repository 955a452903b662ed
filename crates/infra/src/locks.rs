//! Keyed critical sections.
//!
//! Lock order when nesting: product lock first, then the `(product, prefix)`
//! code-sequence lock. Nothing acquires them the other way round.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

use stockpool_core::{ProductId, TenantId};

/// Serializes reservation commits, conversions and status changes of one product.
pub type ProductKey = (TenantId, ProductId);

/// Serializes unit-code generation for one `(product, prefix)`.
pub type PrefixKey = (TenantId, ProductId, String);

/// One mutex per key, created on first use.
///
/// The guarded value is `()`: the lock only orders callers, so a poisoned slot
/// carries no broken state and is simply re-entered.
#[derive(Debug)]
pub struct KeyedLocks<K> {
    slots: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `key`.
    pub fn with<R>(&self, key: &K, f: impl FnOnce() -> R) -> R {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.entry(key.clone()).or_default().clone()
        };
        let _guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    /// Number of keys that have been locked at least once.
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use super::*;

    #[test]
    fn same_key_is_mutually_exclusive() {
        let locks = Arc::new(KeyedLocks::<u32>::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let locks = locks.clone();
                let inside = inside.clone();
                let max_seen = max_seen.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    locks.with(&1, || {
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        thread::yield_now();
                        inside.fetch_sub(1, Ordering::SeqCst);
                    });
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert_eq!(locks.len(), 1);
    }

    #[test]
    fn a_panicking_holder_does_not_wedge_the_key() {
        let locks = Arc::new(KeyedLocks::<&'static str>::new());
        let l = locks.clone();
        let _ = thread::spawn(move || l.with(&"p", || panic!("boom"))).join();

        assert_eq!(locks.with(&"p", || 42), 42);
    }
}
