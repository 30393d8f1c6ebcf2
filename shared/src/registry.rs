use lru::LruCache;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

use crate::config::PaginationConfig;
use crate::item::ListItem;
use crate::loader::Paginator;
use crate::DEFAULT_REGISTRY_CAPACITY;

/// One paginator per query key, least recently used evicted first.
///
/// Lets a screen come back to a query (owner, search term) and find the
/// pages it already loaded.
pub struct ListRegistry<K: Hash + Eq, T> {
    config: PaginationConfig,
    lists: Mutex<LruCache<K, Arc<Paginator<T>>>>,
}

impl<K, T> ListRegistry<K, T>
where
    K: Hash + Eq + Clone + std::fmt::Debug,
    T: ListItem,
{
    #[must_use]
    pub fn new(config: PaginationConfig) -> Self {
        let capacity = NonZeroUsize::new(config.registry_capacity)
            .or_else(|| NonZeroUsize::new(DEFAULT_REGISTRY_CAPACITY))
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            config,
            lists: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn lists(&self) -> std::sync::MutexGuard<'_, LruCache<K, Arc<Paginator<T>>>> {
        self.lists.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the list for `key`, creating an empty one if needed.
    pub fn get_or_create(&self, key: &K) -> Arc<Paginator<T>> {
        let mut lists = self.lists();
        if let Some(existing) = lists.get(key) {
            return Arc::clone(existing);
        }

        let created = Arc::new(Paginator::new(self.config.clone()));
        if let Some((evicted, _)) = lists.push(key.clone(), Arc::clone(&created)) {
            debug!(?evicted, "evicted cached list");
        }
        created
    }

    #[must_use]
    pub fn get(&self, key: &K) -> Option<Arc<Paginator<T>>> {
        self.lists().get(key).cloned()
    }

    pub fn remove(&self, key: &K) -> Option<Arc<Paginator<T>>> {
        self.lists().pop(key)
    }

    /// Drops every cached list, e.g. on sign-out.
    pub fn clear(&self) {
        self.lists().clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lists().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lists().is_empty()
    }
}
