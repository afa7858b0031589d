//! Cache service - owns the persisted stores for one process.
//!
//! There are two stores:
//! - `device` - shared by every shell on the machine (command paths, folder-scoped values)
//! - `session` - private to one shell session
//!
//! Both are hydrated once in [`CacheService::init`] and flushed once in
//! [`CacheService::close`]. Load and save failures are logged and the process
//! continues with a cold cache.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use super::{CacheConfig, CommandCache, ScopedStore, Store, Strategy, persist};

const DEVICE_FILE: &str = "device.cache.json";

/// Where the cache lives and which namespaces this process writes to.
#[derive(Debug, Clone)]
pub struct CacheLocation {
    /// Cache directory.
    pub dir: PathBuf,
    /// Shell session identifier.
    pub session_id: String,
    /// Working directory, used by the folder strategy.
    pub pwd: String,
}

pub struct CacheService {
    location: CacheLocation,
    config: CacheConfig,
    device: Store,
    session: Store,
    closed: AtomicBool,
}

impl CacheService {
    /// Load the device and session stores from disk.
    pub fn init(location: CacheLocation, config: CacheConfig) -> Self {
        let device = load_store(
            "device",
            &location.dir.join(DEVICE_FILE),
            &config,
        );
        let session = load_store(
            "session",
            &location.dir.join(session_file(&location.session_id)),
            &config,
        );

        info!(
            "Cache initialized at {} (strategy: {}, session: {})",
            location.dir.display(),
            config.strategy,
            location.session_id
        );

        Self {
            location,
            config,
            device,
            session,
            closed: AtomicBool::new(false),
        }
    }

    /// Cache directory, also used for trace logs.
    pub fn path(&self) -> &Path {
        &self.location.dir
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn device(&self) -> &Store {
        &self.device
    }

    pub fn session(&self) -> &Store {
        &self.session
    }

    /// Command path cache, persisted in the device store.
    pub fn commands(&self) -> CommandCache {
        CommandCache::new(self.device.clone())
    }

    /// A view namespaced according to the configured strategy.
    pub fn scoped(&self) -> ScopedStore {
        match self.config.strategy {
            Strategy::Folder => {
                ScopedStore::new(self.device.clone(), Strategy::Folder, &self.location.pwd)
            }
            Strategy::Session => ScopedStore::new(
                self.session.clone(),
                Strategy::Session,
                &self.location.session_id,
            ),
        }
    }

    /// Write changed stores to disk. Only the first call does any work.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        save_store(&self.device, &self.location.dir.join(DEVICE_FILE));
        save_store(
            &self.session,
            &self.location.dir.join(session_file(&self.location.session_id)),
        );
    }

    /// A guard that closes the cache when dropped, including during unwinding.
    pub fn guard(self: &Arc<Self>) -> CacheGuard {
        CacheGuard {
            cache: Arc::clone(self),
        }
    }

    /// Delete every cache file in `dir`. Returns the number of files removed.
    pub fn clear(dir: &Path) -> usize {
        let Ok(read_dir) = std::fs::read_dir(dir) else {
            return 0;
        };

        let mut removed = 0;
        for entry in read_dir.flatten() {
            let path = entry.path();
            let is_cache_file = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with(".cache.json"));

            if !is_cache_file {
                continue;
            }

            match persist::remove(&path) {
                Ok(()) => removed += 1,
                Err(e) => warn!("{}", e),
            }
        }

        info!("Removed {} cache files from {}", removed, dir.display());
        removed
    }
}

impl std::fmt::Debug for CacheService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheService")
            .field("dir", &self.location.dir)
            .field("strategy", &self.config.strategy)
            .field("device", &self.device)
            .field("session", &self.session)
            .finish()
    }
}

/// Flushes the cache when it goes out of scope.
#[must_use = "the cache is flushed when the guard is dropped"]
pub struct CacheGuard {
    cache: Arc<CacheService>,
}

impl Drop for CacheGuard {
    fn drop(&mut self) {
        self.cache.close();
    }
}

fn session_file(session_id: &str) -> String {
    let id: String = session_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("session.{id}.cache.json")
}

fn load_store(name: &str, path: &Path, config: &CacheConfig) -> Store {
    if !config.duration.persists() {
        return Store::new(name, config.duration);
    }

    match persist::load(path) {
        Ok(entries) => Store::from_entries(name, config.duration, entries),
        Err(e) => {
            warn!("Starting with an empty {} cache: {}", name, e);
            if let Err(e) = persist::remove(path) {
                debug!("Could not remove {}: {}", path.display(), e);
            }
            Store::new(name, config.duration)
        }
    }
}

fn save_store(store: &Store, path: &Path) {
    if !store.is_dirty() {
        debug!("{} cache unchanged, skipping save", store.name());
        return;
    }

    if let Err(e) = persist::save(path, store.take_snapshot()) {
        warn!("Failed to save {} cache: {}", store.name(), e);
        store.mark_dirty();
    }
}
