//! The real environment of the running process.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, trace};

use super::{BatteryInfo, Environment, Flags, SystemInfo};
use crate::cache::CommandCache;
use crate::error::ProbeError;

pub struct Terminal {
    flags: Flags,
    commands: CommandCache,
}

impl Terminal {
    pub fn new(flags: Flags, commands: CommandCache) -> Self {
        debug!("Terminal: shell={}, pwd={}", flags.shell, flags.pwd);
        Self { flags, commands }
    }

    pub fn flags(&self) -> &Flags {
        &self.flags
    }

    fn resolve_command(&self, command: &str) -> Option<PathBuf> {
        let path = self.getenv("PATH")?;
        std::env::split_paths(&path)
            .flat_map(|dir| candidates(&dir, command))
            .find(|candidate| is_executable(candidate))
    }
}

impl Environment for Terminal {
    fn shell(&self) -> &str {
        &self.flags.shell
    }

    fn pwd(&self) -> &str {
        &self.flags.pwd
    }

    fn getenv(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|value| !value.is_empty())
    }

    fn environ(&self) -> HashMap<String, String> {
        std::env::vars().collect()
    }

    fn host(&self) -> Result<String, ProbeError> {
        if let Some(host) = self.getenv("HOSTNAME").or_else(|| self.getenv("COMPUTERNAME")) {
            return Ok(host);
        }

        let path = Path::new("/etc/hostname");
        let host = std::fs::read_to_string(path).map_err(|source| ProbeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(host.trim().to_string())
    }

    #[cfg(target_os = "linux")]
    fn system_info(&self) -> Result<SystemInfo, ProbeError> {
        let start = Instant::now();
        let meminfo = read_file(Path::new("/proc/meminfo"))?;
        let loadavg = read_file(Path::new("/proc/loadavg")).ok();
        let info = SystemInfo::parse(&meminfo, loadavg.as_deref());
        trace!("system_info took {:?}", start.elapsed());
        info
    }

    #[cfg(not(target_os = "linux"))]
    fn system_info(&self) -> Result<SystemInfo, ProbeError> {
        Err(ProbeError::Unsupported("system info"))
    }

    #[cfg(target_os = "linux")]
    fn battery_state(&self) -> Result<BatteryInfo, ProbeError> {
        let start = Instant::now();
        let root = Path::new("/sys/class/power_supply");
        let entries = std::fs::read_dir(root).map_err(|source| ProbeError::Io {
            path: root.to_path_buf(),
            source,
        })?;

        let battery = entries
            .flatten()
            .map(|entry| entry.path())
            .find(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with("BAT"))
            })
            .ok_or(ProbeError::NotFound("battery"))?;

        let capacity = read_file(&battery.join("capacity"))?;
        let status = read_file(&battery.join("status")).unwrap_or_default();
        let info = BatteryInfo::parse(&capacity, &status);
        trace!("battery_state took {:?}", start.elapsed());
        info
    }

    #[cfg(not(target_os = "linux"))]
    fn battery_state(&self) -> Result<BatteryInfo, ProbeError> {
        Err(ProbeError::Unsupported("battery"))
    }

    fn has_command(&self, command: &str) -> Option<String> {
        if let Some(path) = self.commands.get(command) {
            if is_executable(Path::new(&path)) {
                trace!("Command {} resolved from cache: {}", command, path);
                return Some(path);
            }
            debug!("Cached path for {} is gone: {}", command, path);
            self.commands.invalidate(command);
        }

        let start = Instant::now();
        let path = self.resolve_command(command)?;
        let path = path.to_string_lossy().into_owned();
        debug!("Resolved {} to {} in {:?}", command, path, start.elapsed());

        self.commands.set(command, &path);
        Some(path)
    }
}

#[cfg(target_os = "linux")]
fn read_file(path: &Path) -> Result<String, ProbeError> {
    std::fs::read_to_string(path).map_err(|source| ProbeError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(windows)]
fn candidates(dir: &Path, command: &str) -> Vec<PathBuf> {
    ["", ".exe", ".cmd", ".bat"]
        .iter()
        .map(|ext| dir.join(format!("{command}{ext}")))
        .collect()
}

#[cfg(not(windows))]
fn candidates(dir: &Path, command: &str) -> Vec<PathBuf> {
    vec![dir.join(command)]
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .is_ok_and(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
