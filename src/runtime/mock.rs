//! In-memory environment for tests.

use std::collections::HashMap;

use super::{BatteryInfo, Environment, SystemInfo};
use crate::error::ProbeError;

#[derive(Debug, Clone, Default)]
pub struct MockEnvironment {
    pub shell: String,
    pub pwd: String,
    pub env: HashMap<String, String>,
    pub host: Option<String>,
    pub system_info: Option<SystemInfo>,
    pub battery: Option<BatteryInfo>,
    pub commands: HashMap<String, String>,
}

impl MockEnvironment {
    pub fn new(shell: &str, pwd: &str) -> Self {
        Self {
            shell: shell.to_string(),
            pwd: pwd.to_string(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }

    #[must_use]
    pub fn with_command(mut self, command: &str, path: &str) -> Self {
        self.commands.insert(command.to_string(), path.to_string());
        self
    }
}

impl Environment for MockEnvironment {
    fn shell(&self) -> &str {
        &self.shell
    }

    fn pwd(&self) -> &str {
        &self.pwd
    }

    fn getenv(&self, key: &str) -> Option<String> {
        self.env.get(key).cloned()
    }

    fn environ(&self) -> HashMap<String, String> {
        self.env.clone()
    }

    fn host(&self) -> Result<String, ProbeError> {
        self.host.clone().ok_or(ProbeError::NotFound("host name"))
    }

    fn system_info(&self) -> Result<SystemInfo, ProbeError> {
        self.system_info
            .clone()
            .ok_or(ProbeError::Unsupported("system info"))
    }

    fn battery_state(&self) -> Result<BatteryInfo, ProbeError> {
        self.battery.clone().ok_or(ProbeError::NotFound("battery"))
    }

    fn has_command(&self, command: &str) -> Option<String> {
        self.commands.get(command).cloned()
    }
}
