//! Runtime environment - what segments and templates can ask about the system.
//!
//! Everything here sits behind the [`Environment`] trait so segments can be
//! tested against [`mock::MockEnvironment`] instead of the real machine.

mod battery;
#[cfg(test)]
pub mod mock;
mod sysinfo;
mod terminal;

use std::collections::HashMap;

pub use battery::{BatteryInfo, BatteryState};
pub use sysinfo::SystemInfo;
pub use terminal::Terminal;

use crate::error::ProbeError;

/// Values the CLI resolved before the engine starts.
#[derive(Debug, Clone, Default)]
pub struct Flags {
    pub shell: String,
    pub pwd: String,
    pub session_id: String,
    pub debug: bool,
}

/// Capabilities the prompt engine consumes from the host system.
pub trait Environment: Send + Sync {
    /// Name of the shell the prompt is rendered for.
    fn shell(&self) -> &str;

    /// Current working directory.
    fn pwd(&self) -> &str;

    fn getenv(&self, key: &str) -> Option<String>;

    /// All environment variables.
    fn environ(&self) -> HashMap<String, String>;

    fn home(&self) -> Option<String> {
        self.getenv("HOME").or_else(|| self.getenv("USERPROFILE"))
    }

    fn user(&self) -> String {
        self.getenv("USER")
            .or_else(|| self.getenv("USERNAME"))
            .unwrap_or_default()
    }

    fn host(&self) -> Result<String, ProbeError>;

    /// Memory and load figures.
    fn system_info(&self) -> Result<SystemInfo, ProbeError>;

    fn battery_state(&self) -> Result<BatteryInfo, ProbeError>;

    /// Resolved path of an executable on `PATH`, if there is one.
    fn has_command(&self, command: &str) -> Option<String>;
}

/// Last component of a path, or the path itself for a root.
pub fn base(path: &str) -> &str {
    let trimmed = path.trim_end_matches(['/', '\\']);
    if trimmed.is_empty() {
        return path;
    }
    trimmed.rsplit(['/', '\\']).next().unwrap_or(trimmed)
}
