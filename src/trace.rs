//! Logging setup.
//!
//! Logs go to stderr at `warn` by default so the prompt stays clean. With
//! `MON_TRACE` set, everything down to `trace` is written to a per-invocation
//! file under `<cache>/logs` instead.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Local};
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "monline=warn";
const TRACE_FILTER: &str = "monline=trace";

/// Install the global subscriber. Returns the trace log path when one was opened.
pub fn init(trace: bool, cache_dir: &Path, shell: &str, command: &[&str]) -> Option<PathBuf> {
    if !trace {
        // If RUST_LOG is not set, keep our crate at warn
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        return None;
    }

    let path = cache_dir
        .join("logs")
        .join(log_file_name(Local::now(), shell, command));
    let file = path
        .parent()
        .map_or(Ok(()), std::fs::create_dir_all)
        .and_then(|()| File::create(&path));

    match file {
        Ok(file) => {
            tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::new(TRACE_FILTER))
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
            Some(path)
        }
        Err(e) => {
            tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::new(TRACE_FILTER))
                .with_writer(std::io::stderr)
                .init();
            tracing::warn!("Cannot create trace log {}: {}", path.display(), e);
            None
        }
    }
}

/// `<ddmmyyyyThhmmss.mmm>-<shell>-<command words>.log`
pub fn log_file_name(now: DateTime<Local>, shell: &str, command: &[&str]) -> String {
    let stamp = now.format("%d%m%YT%H%M%S%.3f");
    let prefix = if shell.is_empty() {
        String::new()
    } else {
        format!("{shell}-")
    };
    format!("{stamp}-{prefix}{}.log", command.join("-"))
}
