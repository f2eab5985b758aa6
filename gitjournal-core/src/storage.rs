//! File primitives shared by the state store and the registry: advisory
//! locks, atomic replacement and strict JSON documents.

use crate::error::{Error, Result};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Exclusive advisory lock on a lock file.
///
/// Released when dropped; the OS releases it too if the process dies.
pub struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    /// Block until the lock at `path` is ours.
    pub fn acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)?;
        file.lock_exclusive()?;

        tracing::debug!("Acquired lock {:?}", path);
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        // The lock file itself stays for reuse.
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!("Failed to release lock {:?}: {}", self.path, e);
        } else {
            tracing::debug!("Released lock {:?}", self.path);
        }
    }
}

/// Replace `path` with `contents` so readers see either the old or the new
/// file, never a partial one.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Like [`write_atomic`], but leaves the file alone when it already holds
/// exactly `contents`. Returns whether anything was written.
pub fn write_if_changed(path: &Path, contents: &str) -> Result<bool> {
    if let Ok(existing) = fs::read(path) {
        if existing == contents.as_bytes() {
            return Ok(false);
        }
    }
    write_atomic(path, contents.as_bytes())?;
    Ok(true)
}

/// Read a JSON document, `None` if it does not exist.
///
/// Anything unreadable or malformed is [`Error::StateCorruption`]: silently
/// starting over would duplicate journal entries.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(Error::corrupt(path, e)),
    };

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| Error::corrupt(path, e))
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut content = serde_json::to_string_pretty(value)?;
    content.push('\n');
    write_atomic(path, content.as_bytes())
}

/// Remove a file, treating "already gone" as success. Returns whether a file
/// was removed.
pub fn remove_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
