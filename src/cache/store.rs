//! Concurrent key/value store.
//!
//! Values are kept as JSON so the store can be persisted and so callers can
//! ask for any deserializable type on read. A value that does not decode into
//! the requested type is treated as a miss.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::CacheDuration;

/// A single cached value with its optional expiration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entry {
    pub value: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    /// Process-local entries are never written to disk.
    #[serde(skip)]
    pub transient: bool,
}

impl Entry {
    /// Build an entry that expires according to `duration`, starting at `now`.
    pub fn new(value: Value, duration: CacheDuration, now: DateTime<Utc>) -> Self {
        let expires_at = duration
            .ttl()
            .and_then(|ttl| chrono::Duration::from_std(ttl).ok())
            .and_then(|ttl| now.checked_add_signed(ttl));

        Self {
            value,
            expires_at,
            transient: !duration.persists(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

struct Inner {
    name: String,
    duration: CacheDuration,
    entries: Mutex<HashMap<String, Entry>>,
    dirty: AtomicBool,
}

/// Thread-safe string-keyed store.
///
/// Cloning is cheap and shares the same underlying map. A single lock guards
/// the whole map; no I/O happens while it is held.
#[derive(Clone)]
pub struct Store {
    inner: Arc<Inner>,
}

impl Store {
    /// Create an empty store whose entries default to `duration`.
    pub fn new(name: impl Into<String>, duration: CacheDuration) -> Self {
        Self::from_entries(name, duration, HashMap::new())
    }

    /// Create a store hydrated from a persisted snapshot. Expired entries are dropped.
    pub fn from_entries(
        name: impl Into<String>,
        duration: CacheDuration,
        mut entries: HashMap<String, Entry>,
    ) -> Self {
        let now = Utc::now();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));

        let name = name.into();
        if before != entries.len() {
            debug!("Dropped {} expired entries from {}", before - entries.len(), name);
        }

        Self {
            inner: Arc::new(Inner {
                name,
                duration,
                entries: Mutex::new(entries),
                dirty: AtomicBool::new(false),
            }),
        }
    }

    /// Name of this store, used in logs and file names.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Default duration applied by [`Store::set`].
    pub fn duration(&self) -> CacheDuration {
        self.inner.duration
    }

    /// Insert or replace a value using the store's default duration.
    pub fn set<T: Serialize>(&self, key: impl Into<String>, value: T) {
        self.set_with_duration(key, value, self.inner.duration);
    }

    /// Insert or replace a value with an explicit duration.
    ///
    /// Never fails: a value that cannot be encoded is logged and skipped.
    pub fn set_with_duration<T: Serialize>(
        &self,
        key: impl Into<String>,
        value: T,
        duration: CacheDuration,
    ) {
        let key = key.into();
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(e) => {
                debug!("{}: not caching {}: {}", self.inner.name, key, e);
                return;
            }
        };

        let entry = Entry::new(value, duration, Utc::now());
        let persist = !entry.transient;
        self.inner.entries.lock().insert(key, entry);

        if persist {
            self.inner.dirty.store(true, Ordering::Release);
        }
    }

    /// Get a value as `T`.
    ///
    /// Returns `None` if the key is missing, expired, or holds a value of a different type.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get_value(key)?;
        match serde_json::from_value(value) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(
                    "{}: {} is not a {}: {}",
                    self.inner.name,
                    key,
                    std::any::type_name::<T>(),
                    e
                );
                None
            }
        }
    }

    /// Get the raw stored value.
    pub fn get_value(&self, key: &str) -> Option<Value> {
        let now = Utc::now();
        let mut entries = self.inner.entries.lock();

        let expired = entries.get(key)?.is_expired(now);
        if expired {
            entries.remove(key);
            self.inner.dirty.store(true, Ordering::Release);
            return None;
        }

        entries.get(key).map(|entry| entry.value.clone())
    }

    /// Remove a key. Returns `true` if it was present.
    pub fn delete(&self, key: &str) -> bool {
        let removed = self.inner.entries.lock().remove(key).is_some();
        if removed {
            self.inner.dirty.store(true, Ordering::Release);
        }
        removed
    }

    /// Check if a live entry exists for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.get_value(key).is_some()
    }

    /// Number of entries, including ones that expired but were not read since.
    pub fn len(&self) -> usize {
        self.inner.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.lock().is_empty()
    }

    /// Whether the store changed since it was loaded or last flushed.
    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.load(Ordering::Acquire)
    }

    /// Copy of all persistable, unexpired entries, clearing the dirty flag.
    pub fn take_snapshot(&self) -> HashMap<String, Entry> {
        let now = Utc::now();
        let entries = self.inner.entries.lock();
        self.inner.dirty.store(false, Ordering::Release);

        entries
            .iter()
            .filter(|(_, entry)| !entry.transient && !entry.is_expired(now))
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect()
    }

    /// Flag the store as needing a flush again, e.g. after a failed save.
    pub(crate) fn mark_dirty(&self) {
        self.inner.dirty.store(true, Ordering::Release);
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.inner.name)
            .field("entry_count", &self.len())
            .field("dirty", &self.is_dirty())
            .finish()
    }
}
