//! Snapshot files for cache stores.

use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use super::Entry;
use crate::error::CacheError;

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    entries: HashMap<String, Entry>,
}

/// Read a snapshot. A missing file is an empty snapshot, not an error.
pub fn load(path: &Path) -> Result<HashMap<String, Entry>, CacheError> {
    let start = Instant::now();

    let content = match fs::read(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("No cache file at {}", path.display());
            return Ok(HashMap::new());
        }
        Err(e) => return Err(CacheError::io(path, e)),
    };

    let snapshot: Snapshot =
        serde_json::from_slice(&content).map_err(|source| CacheError::Deserialize {
            path: path.to_path_buf(),
            source,
        })?;

    debug!(
        "Loaded {} entries from {} in {:?}",
        snapshot.entries.len(),
        path.display(),
        start.elapsed()
    );
    Ok(snapshot.entries)
}

/// Write a snapshot atomically: a temp file in the same directory is renamed over `path`.
pub fn save(path: &Path, entries: HashMap<String, Entry>) -> Result<(), CacheError> {
    let start = Instant::now();
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|e| CacheError::io(dir, e))?;

    let count = entries.len();
    let content = serde_json::to_vec(&Snapshot { entries }).map_err(CacheError::Serialize)?;

    let mut file = NamedTempFile::new_in(dir).map_err(|e| CacheError::io(dir, e))?;
    file.write_all(&content)
        .map_err(|e| CacheError::io(file.path(), e))?;
    file.persist(path)
        .map_err(|e| CacheError::io(path, e.error))?;

    debug!(
        "Saved {} entries to {} in {:?}",
        count,
        path.display(),
        start.elapsed()
    );
    Ok(())
}

/// Remove a snapshot file, ignoring a missing one.
pub fn remove(path: &Path) -> Result<(), CacheError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(CacheError::io(path, e)),
    }
}
