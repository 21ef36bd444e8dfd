//! Filesystem utilities.
//!
//! Helper functions for file operations.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::{Result, SkmError};

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Read a file to string, returning None if it doesn't exist.
pub fn read_optional(path: impl AsRef<Path>) -> Result<Option<String>> {
    let path = path.as_ref();
    if path.exists() {
        Ok(Some(std::fs::read_to_string(path)?))
    } else {
        Ok(None)
    }
}

/// Move a file or directory tree, copying when a rename is not possible
/// (e.g. across filesystems). `to` must not exist.
pub fn move_path(from: &Path, to: &Path) -> Result<()> {
    if std::fs::symlink_metadata(to).is_ok() {
        return Err(SkmError::AlreadyExists(to.to_path_buf()));
    }
    match std::fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(err) => {
            debug!(from = %from.display(), to = %to.display(), error = %err, "rename failed, copying");
            copy_tree(from, to)?;
            let meta = std::fs::symlink_metadata(from)?;
            if meta.is_dir() {
                std::fs::remove_dir_all(from)?;
            } else {
                std::fs::remove_file(from)?;
            }
            Ok(())
        }
    }
}

/// Recursively copy `from` to `to`. Symlinks are recreated, not followed.
pub fn copy_tree(from: &Path, to: &Path) -> Result<()> {
    for entry in WalkDir::new(from).follow_links(false) {
        let entry = entry.map_err(|err| SkmError::Io(err.into()))?;
        let rel = entry.path().strip_prefix(from).unwrap_or(Path::new(""));
        let dest = if rel.as_os_str().is_empty() {
            to.to_path_buf()
        } else {
            to.join(rel)
        };

        let file_type = entry.file_type();
        if file_type.is_symlink() {
            copy_symlink(entry.path(), &dest)?;
        } else if file_type.is_dir() {
            std::fs::create_dir_all(&dest)?;
        } else {
            std::fs::copy(entry.path(), &dest)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(link: &Path, dest: &Path) -> Result<()> {
    let target = std::fs::read_link(link)?;
    std::os::unix::fs::symlink(target, dest)?;
    Ok(())
}

#[cfg(windows)]
fn copy_symlink(link: &Path, dest: &Path) -> Result<()> {
    let target = std::fs::read_link(link)?;
    let resolved = link.parent().map_or_else(|| target.clone(), |p| p.join(&target));
    if resolved.is_dir() {
        std::os::windows::fs::symlink_dir(target, dest)?;
    } else {
        std::os::windows::fs::symlink_file(target, dest)?;
    }
    Ok(())
}

#[cfg(not(any(unix, windows)))]
fn copy_symlink(link: &Path, _dest: &Path) -> Result<()> {
    debug!(link = %link.display(), "skipping symlink on unsupported platform");
    Ok(())
}

/// Expand a leading `~` to the home directory.
#[must_use]
pub fn expand_tilde(raw: &str) -> PathBuf {
    if raw == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from(raw));
    }
    if let Some(rest) = raw.strip_prefix("~/").or_else(|| raw.strip_prefix("~\\")) {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(raw)
}

/// Render a path with the home directory shortened to `~`.
#[must_use]
pub fn display_path(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(rest) = path.strip_prefix(&home) {
            if rest.as_os_str().is_empty() {
                return "~".to_string();
            }
            return format!("~/{}", rest.display());
        }
    }
    path.display().to_string()
}
