//! Directory operations for creating, copying and removing package trees.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use walkdir::WalkDir;

/// Ensures a directory exists, creating it and all parent directories if necessary.
///
/// Fails when the path exists but is not a directory.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    } else if !path.is_dir() {
        return Err(anyhow::anyhow!("Path exists but is not a directory: {}", path.display()));
    }
    Ok(())
}

/// Recursively copies a directory and all its contents to a new location.
///
/// The destination is created if needed and existing files are overwritten.
/// Only directories and regular files are copied; symlinks and special files
/// are skipped.
pub fn copy_dir(src: &Path, dst: &Path) -> Result<()> {
    ensure_dir(dst)?;

    for entry in WalkDir::new(src).min_depth(1).sort_by_file_name() {
        let entry =
            entry.with_context(|| format!("Failed to read directory: {}", src.display()))?;
        let relative = entry.path().strip_prefix(src)?;
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            ensure_dir(&target)?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &target).with_context(|| {
                format!(
                    "Failed to copy file from {} to {}",
                    entry.path().display(),
                    target.display()
                )
            })?;
        }
    }

    Ok(())
}

/// Recursively removes a directory; a missing directory is not an error.
pub fn remove_dir_all(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)
            .with_context(|| format!("Failed to remove directory: {}", path.display()))?;
    }
    Ok(())
}

/// Whether `path` is a directory with no entries.
pub fn is_dir_empty(path: &Path) -> Result<bool> {
    let mut entries =
        fs::read_dir(path).with_context(|| format!("Failed to read directory: {}", path.display()))?;
    Ok(entries.next().is_none())
}

/// Remove empty directories from `start` upwards, stopping at `stop`.
///
/// `stop` itself is never removed. Nothing happens unless `start` lies
/// strictly below `stop`.
pub fn prune_empty_parents(start: &Path, stop: &Path) -> Result<()> {
    let mut current = start.to_path_buf();
    while current.starts_with(stop) && current != stop {
        if !current.is_dir() || !is_dir_empty(&current)? {
            break;
        }
        fs::remove_dir(&current)
            .with_context(|| format!("Failed to remove directory: {}", current.display()))?;
        if !current.pop() {
            break;
        }
    }
    Ok(())
}
