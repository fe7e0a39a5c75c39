//! Filesystem helpers shared by staging, extraction and relocation.

use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Remove a directory tree, treating "does not exist" as success.
pub fn remove_dir_if_exists(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => {
            Err(e).with_context(|| format!("removing directory '{}'", path.display()))
        }
    }
}

/// Write `content` to `path`, creating missing parent directories first.
pub fn write_file_creating_parents(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory '{}'", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("writing '{}'", path.display()))
}

/// Move a file by renaming, with fallback to copy+delete.
///
/// The packager's output and the final build directory may sit on
/// different filesystems (the cache dir is often under `~/.cache`). Only a
/// cross-device rename falls back; any other rename error is returned.
pub fn move_file(src: &Path, dst: &Path) -> Result<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory '{}'", parent.display()))?;
    }
    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() != ErrorKind::CrossesDevices => Err(e).with_context(|| {
            format!("renaming '{}' to '{}'", src.display(), dst.display())
        }),
        Err(_) => {
            fs::copy(src, dst).with_context(|| {
                format!("copying '{}' to '{}'", src.display(), dst.display())
            })?;
            fs::remove_file(src).with_context(|| format!("removing '{}'", src.display()))?;
            Ok(())
        }
    }
}
