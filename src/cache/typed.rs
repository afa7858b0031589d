//! In-process memo cache built on Moka.
//!
//! Used for artifacts that are expensive to build but cheap to share, such as
//! compiled templates and regular expressions. Concurrent lookups of the same
//! missing key are coalesced: one caller computes, the others wait for and
//! reuse its result.

use std::hash::Hash;
use std::sync::Arc;

use moka::sync::Cache;
use tracing::trace;

/// Keyed memo of shared, immutable values. Nothing here is persisted.
pub struct TypedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    memo: Cache<K, V>,
    label: Arc<str>,
}

// moka's cache is already a shared handle; cloning needs no K/V bounds.
impl<K, V> Clone for TypedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            memo: self.memo.clone(),
            label: Arc::clone(&self.label),
        }
    }
}

impl<K, V> TypedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// A memo holding at most `max_capacity` values; least recently used go first.
    pub fn new(label: impl Into<Arc<str>>, max_capacity: u64) -> Self {
        Self {
            memo: Cache::builder().max_capacity(max_capacity).build(),
            label: label.into(),
        }
    }

    /// A memo that never evicts. Values live as long as the cache.
    pub fn unbounded(label: impl Into<Arc<str>>) -> Self {
        Self {
            memo: Cache::builder().build(),
            label: label.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.memo.get(key)
    }

    /// Memoized value for `key`, built with `build` on a miss.
    ///
    /// Only one of several concurrent callers for the same key runs `build`;
    /// the rest block until it finishes and share the outcome. Errors are not
    /// memoized, so a later call retries.
    pub fn get_or_try_insert_with<F, E>(&self, key: K, build: F) -> Result<V, Arc<E>>
    where
        F: FnOnce() -> Result<V, E>,
        E: Send + Sync + 'static,
    {
        self.memo.try_get_with(key, || {
            trace!("{}: miss", self.label);
            build()
        })
    }

    /// Number of memoized values, after applying pending writes.
    pub fn len(&self) -> u64 {
        self.memo.run_pending_tasks();
        self.memo.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> std::fmt::Debug for TypedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedCache")
            .field("label", &self.label)
            .field("len", &self.memo.entry_count())
            .finish()
    }
}
