//! Cache module - memoization that survives between prompt renders.
//!
//! The prompt binary is started on every redraw, so anything expensive is
//! cached here and written back to disk once, on exit.
//!
//! ## Architecture
//!
//! - `Store` - thread-safe string-keyed store with lazy expiration
//! - `ScopedStore` - folder- or session-namespaced view over a store
//! - `CommandCache` - command name to resolved path
//! - `CacheService` - owns the device and session stores, loads and saves them
//! - `TypedCache` - in-process single-flight memo cache (templates, regexes)
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use monline::cache::{CacheConfig, CacheLocation, CacheService};
//!
//! let location = CacheLocation {
//!     dir: "/tmp/monline".into(),
//!     session_id: "1234".into(),
//!     pwd: "/home/me".into(),
//! };
//! let cache = Arc::new(CacheService::init(location, CacheConfig::default()));
//! let _guard = cache.guard();
//!
//! cache.commands().set("git", "/usr/bin/git");
//! let git = cache.commands().get("git");
//! ```

mod command;
mod config;
mod persist;
mod scoped;
mod service;
mod store;
mod typed;

pub use command::CommandCache;
pub use config::{CacheConfig, CacheDuration, Strategy, parse_duration};
pub use scoped::ScopedStore;
pub use service::{CacheGuard, CacheLocation, CacheService};
pub use store::{Entry, Store};
pub use typed::TypedCache;
