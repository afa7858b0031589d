//! Strategy-scoped view over a [`Store`].
//!
//! With [`Strategy::Folder`] keys are namespaced by working directory, with
//! [`Strategy::Session`] by shell session. Two views with different scopes
//! never see each other's entries, even for identical logical keys.

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{CacheDuration, Store, Strategy};

#[derive(Clone, Debug)]
pub struct ScopedStore {
    store: Store,
    strategy: Strategy,
    prefix: String,
}

impl ScopedStore {
    /// Create a view over `store` using `scope` (a folder or session id) as namespace.
    pub fn new(store: Store, strategy: Strategy, scope: &str) -> Self {
        Self {
            store,
            strategy,
            prefix: format!("{strategy}:{scope}:"),
        }
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// The effective key under which `key` is stored.
    pub fn key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    pub fn set<T: Serialize>(&self, key: &str, value: T) {
        self.store.set(self.key(key), value);
    }

    pub fn set_with_duration<T: Serialize>(&self, key: &str, value: T, duration: CacheDuration) {
        self.store.set_with_duration(self.key(key), value, duration);
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.store.get(&self.key(key))
    }

    pub fn delete(&self, key: &str) -> bool {
        self.store.delete(&self.key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folders_do_not_share_entries() {
        let store = Store::new("device", CacheDuration::Infinite);
        let home = ScopedStore::new(store.clone(), Strategy::Folder, "/home/me");
        let src = ScopedStore::new(store.clone(), Strategy::Folder, "/home/me/src");

        home.set("branch", "main");
        src.set("branch", "feature");

        assert_eq!(home.get::<String>("branch"), Some("main".to_string()));
        assert_eq!(src.get::<String>("branch"), Some("feature".to_string()));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_strategy_changes_namespace() {
        let store = Store::new("device", CacheDuration::Infinite);
        let folder = ScopedStore::new(store.clone(), Strategy::Folder, "abc");
        let session = ScopedStore::new(store, Strategy::Session, "abc");

        folder.set("key", 1);
        assert_eq!(session.get::<i32>("key"), None);
        assert_ne!(folder.key("key"), session.key("key"));
    }
}
