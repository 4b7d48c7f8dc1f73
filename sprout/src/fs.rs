//! File system-related utilities.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::Error;

/// Canonicalize the given path if it exists. If it does not exist, returns
/// `Ok(None)`.
pub fn maybe_canonicalize<P>(path: P) -> Result<Option<PathBuf>, Error>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if path.exists() {
        Ok(Some(path.canonicalize().map_err(|e| Error::io(path, e))?))
    } else {
        Ok(None)
    }
}

pub fn ensure_parent_path_exists(path: &Path) -> Result<(), Error> {
    let parent = path
        .parent()
        .ok_or_else(|| Error::PathMissingParent(path.to_path_buf()))?;
    ensure_path_exists(parent)
}

pub fn ensure_path_exists(path: &Path) -> Result<(), Error> {
    if !path.is_dir() {
        fs::create_dir_all(path).map_err(|e| Error::io(path, e))?;
        debug!("Created path: {}", path.display());
    }
    Ok(())
}

/// Removes everything inside the given directory, leaving the directory
/// itself in place. Does nothing if the directory does not exist.
pub fn delete_contents(path: &Path) -> Result<(), Error> {
    if !path.is_dir() {
        return Ok(());
    }
    for entry in fs::read_dir(path).map_err(|e| Error::io(path, e))? {
        let entry = entry.map_err(|e| Error::io(path, e))?;
        let entry_path = entry.path();
        let file_type = entry.file_type().map_err(|e| Error::io(&entry_path, e))?;
        let removed = if file_type.is_dir() {
            fs::remove_dir_all(&entry_path)
        } else {
            fs::remove_file(&entry_path)
        };
        removed.map_err(|e| Error::io(&entry_path, e))?;
    }
    debug!("Cleaned {}", path.display());
    Ok(())
}
