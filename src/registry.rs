//! Request-keyed registry of in-flight/cached containers.
//!
//! Repeated or concurrent requests for the same logical key must converge on
//! one [`LoadableContainer`] instance instead of creating duplicates, so that
//! an update fulfilled for one consumer reaches every consumer holding the
//! container for that key. The registry holds only weak handles: it is never
//! the thing keeping a container alive, ownership belongs to whoever holds a
//! strong handle (typically the presentation layer).

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, PoisonError};

use crate::container::{LoadableContainer, WeakContainer};

/// De-duplicating map from request keys to the single live container for
/// that key.
///
/// Keys are anything hashable and structurally comparable: an entity id, or a
/// whole request descriptor with field-wise equality.
pub struct Registry<K, V> {
    map: Mutex<HashMap<K, WeakContainer<V>>>,
}

impl<K, V> Default for Registry<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Registry<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            map: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the live container for `key`, or builds one with `factory`,
    /// stores a weak handle to it and returns it.
    ///
    /// The lookup-or-insert is atomic with respect to itself: concurrent
    /// calls with the same key observe one container, and `factory` runs at
    /// most once per stored entry. `factory` is invoked while the registry
    /// lock is held, so it must not call back into this registry.
    pub fn get_or_create<F>(&self, key: K, factory: F) -> LoadableContainer<V>
    where
        F: FnOnce() -> LoadableContainer<V>,
    {
        let mut map = self.lock();
        if let Some(container) = map.get(&key).and_then(WeakContainer::upgrade) {
            return container;
        }
        // Either no entry, or the last strong handle is gone; sweep the dead
        // entries while we are here, then insert fresh.
        map.retain(|_, weak| weak.upgrade().is_some());
        let container = factory();
        map.insert(key, container.downgrade());
        container
    }

    /// Returns the live container for `key`, if any.
    pub fn get(&self, key: &K) -> Option<LoadableContainer<V>> {
        self.lock().get(key).and_then(WeakContainer::upgrade)
    }

    /// Drops every entry whose container no longer has a strong holder.
    /// Returns the number of entries removed.
    pub fn sweep(&self) -> usize {
        let mut map = self.lock();
        let before = map.len();
        map.retain(|_, weak| weak.upgrade().is_some());
        before - map.len()
    }

    /// Number of entries currently stored, dead ones included until the next
    /// sweep.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<K, WeakContainer<V>>> {
        self.map.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn default_registry_starts_empty() {
        let registry: Registry<u64, u32> = Registry::default();
        assert!(registry.is_empty());
    }

    #[test]
    fn get_or_create_is_idempotent_and_calls_factory_once() {
        let registry: Registry<&str, u32> = Registry::new();
        let calls = AtomicUsize::new(0);

        let first = registry.get_or_create("user:42", || {
            calls.fetch_add(1, Ordering::SeqCst);
            LoadableContainer::new()
        });
        let second = registry.get_or_create("user:42", || {
            calls.fetch_add(1, Ordering::SeqCst);
            LoadableContainer::new()
        });

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn distinct_keys_get_distinct_containers() {
        let registry: Registry<u64, u32> = Registry::new();
        let a = registry.get_or_create(1, LoadableContainer::new);
        let b = registry.get_or_create(2, LoadableContainer::new);
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn registry_does_not_keep_containers_alive() {
        let registry: Registry<u64, u32> = Registry::new();
        let container = registry.get_or_create(1, LoadableContainer::new);
        assert!(registry.get(&1).is_some());

        drop(container);
        assert!(registry.get(&1).is_none());
        assert_eq!(registry.sweep(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn dropped_entry_is_replaced_on_next_request() {
        let registry: Registry<u64, u32> = Registry::new();
        let first = registry.get_or_create(1, LoadableContainer::new);
        first.set_value(7);
        drop(first);

        let second = registry.get_or_create(1, LoadableContainer::new);
        assert_eq!(second.get_value(), None);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn concurrent_get_or_create_converges_on_one_container() {
        let registry: Arc<Registry<&str, u32>> = Arc::new(Registry::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let calls = Arc::clone(&calls);
                std::thread::spawn(move || {
                    registry.get_or_create("user:42", move || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        LoadableContainer::new()
                    })
                })
            })
            .collect();

        let containers: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(containers.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
