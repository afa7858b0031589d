//! monline - a cache-backed segment and template engine for shell prompts.
//!
//! ## Architecture
//!
//! - `config` - Environment configuration
//! - `cache` - Persisted stores, command path cache and in-process memo caches
//! - `runtime` - What the host system can tell segments (shell, memory, battery)
//! - `template` - Go-style templates with cached compilation
//! - `segments` - Prompt segments (extensible)
//! - `engine` - Concurrent segment evaluation with a deadline
//! - `trace` - Logging setup

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod runtime;
pub mod segments;
pub mod template;
pub mod trace;
