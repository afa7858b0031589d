//! Resolved command paths.

use super::Store;

const PREFIX: &str = "command_path:";

/// Maps a command name to its resolved absolute path.
///
/// Backed by the device store so resolutions survive across invocations for
/// the configured cache duration.
#[derive(Clone, Debug)]
pub struct CommandCache {
    commands: Store,
}

impl CommandCache {
    pub fn new(commands: Store) -> Self {
        Self { commands }
    }

    pub fn set(&self, command: &str, path: &str) {
        self.commands.set(format!("{PREFIX}{command}"), path);
    }

    /// Returns `None` if the command was never resolved or its entry expired.
    pub fn get(&self, command: &str) -> Option<String> {
        self.commands.get(&format!("{PREFIX}{command}"))
    }

    /// Forget a resolution, e.g. when the cached path no longer exists.
    pub fn invalidate(&self, command: &str) {
        self.commands.delete(&format!("{PREFIX}{command}"));
    }
}
