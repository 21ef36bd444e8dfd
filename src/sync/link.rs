//! Directory links: creation, inspection and path comparison.
//!
//! POSIX systems get a plain symlink. Windows tries a junction first (no
//! elevation needed) and falls back to a directory symlink. Inspection never
//! follows the final link, so a dangling link is still reported as a link.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::error::{Result, SkmError};

/// What occupies a path, observed without following the final link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    Missing,
    /// A symlink or junction. `target` is absolute and lexically normalized;
    /// `exists` is false when the link dangles.
    Link { target: PathBuf, exists: bool },
    RealDirectory,
    OtherFile,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEntry {
    pub path: PathBuf,
    pub kind: EntryKind,
}

impl LinkEntry {
    #[must_use]
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    #[must_use]
    pub const fn is_link(&self) -> bool {
        matches!(self.kind, EntryKind::Link { .. })
    }

    /// Resolved link target, if this entry is a link.
    #[must_use]
    pub fn link_target(&self) -> Option<&Path> {
        match &self.kind {
            EntryKind::Link { target, .. } => Some(target),
            _ => None,
        }
    }

    /// True iff this entry is a link whose target equals `expected`.
    #[must_use]
    pub fn points_to(&self, expected: &Path) -> bool {
        self.link_target()
            .is_some_and(|target| paths_equal(target, &normalize(expected)))
    }
}

/// Platform mechanism for creating a directory link.
///
/// Callers go through [`create_link_with`], which checks preconditions; an
/// implementation only has to create the link itself.
pub trait LinkStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Create `link` pointing at the directory `target`. Both paths are
    /// absolute and `link` does not exist.
    fn create_dir_link(&self, link: &Path, target: &Path) -> Result<()>;
}

/// Native symbolic link.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymlinkStrategy;

impl LinkStrategy for SymlinkStrategy {
    fn name(&self) -> &'static str {
        "symlink"
    }

    fn create_dir_link(&self, link: &Path, target: &Path) -> Result<()> {
        symlink_dir(target, link).map_err(|err| symlink_error(link, target, err))
    }
}

/// EPERM: the filesystem holding the link does not support symlinks.
#[cfg(unix)]
const EPERM: i32 = 1;

/// Map a failed `symlink(2)` onto the error taxonomy. A filesystem without
/// symlink support is `LinkUnsupported`; a denied directory is an access
/// problem with that one target.
fn symlink_error(link: &Path, target: &Path, err: io::Error) -> SkmError {
    #[cfg(unix)]
    let unsupported = err.raw_os_error() == Some(EPERM);
    #[cfg(not(unix))]
    let unsupported = false;

    if unsupported || err.kind() == io::ErrorKind::Unsupported {
        return SkmError::LinkUnsupported {
            link: link.to_path_buf(),
            source_path: target.to_path_buf(),
            details: format!("symlink: {err} (the filesystem may not support symbolic links)"),
        };
    }
    if err.kind() == io::ErrorKind::PermissionDenied {
        let parent = link.parent().unwrap_or(link);
        return SkmError::TargetAccess {
            target: parent.display().to_string(),
            reason: format!("cannot create link {}: {err}", link.display()),
        };
    }
    SkmError::Io(err)
}

/// Junction with directory-symlink fallback.
#[cfg(windows)]
#[derive(Debug, Clone, Copy, Default)]
pub struct JunctionStrategy;

#[cfg(windows)]
impl LinkStrategy for JunctionStrategy {
    fn name(&self) -> &'static str {
        "junction"
    }

    fn create_dir_link(&self, link: &Path, target: &Path) -> Result<()> {
        let output = std::process::Command::new("cmd")
            .arg("/C")
            .arg("mklink")
            .arg("/J")
            .arg(link)
            .arg(target)
            .output();

        let junction_error = match output {
            Ok(out) if out.status.success() => return Ok(()),
            Ok(out) => {
                let stderr = String::from_utf8_lossy(&out.stderr).trim().to_string();
                if stderr.is_empty() {
                    "mklink /J command failed".to_string()
                } else {
                    stderr
                }
            }
            Err(err) => format!("could not run mklink: {err}"),
        };
        debug!(link = %link.display(), %junction_error, "junction failed, trying symlink");

        match symlink_dir(target, link) {
            Ok(()) => Ok(()),
            Err(symlink_error) => Err(SkmError::LinkUnsupported {
                link: link.to_path_buf(),
                source_path: target.to_path_buf(),
                details: format!(
                    "junction: {junction_error}; symlink: {symlink_error} (requires Administrator or Developer Mode)"
                ),
            }),
        }
    }
}

/// Strategy for the platform this binary was built for.
#[must_use]
pub fn platform_strategy() -> Box<dyn LinkStrategy> {
    #[cfg(windows)]
    {
        Box::new(JunctionStrategy)
    }
    #[cfg(not(windows))]
    {
        Box::new(SymlinkStrategy)
    }
}

#[cfg(unix)]
fn symlink_dir(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink_dir(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
}

#[cfg(not(any(unix, windows)))]
fn symlink_dir(_target: &Path, _link: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "directory links are not supported on this platform",
    ))
}

/// Create a link at `link` pointing to the directory `target` using the
/// platform strategy.
pub fn create_link(link: &Path, target: &Path) -> Result<()> {
    create_link_with(platform_strategy().as_ref(), link, target)
}

/// Create a link with an explicit strategy.
///
/// Fails with `SourceMissing` if `target` is not a directory and with
/// `AlreadyExists` if anything (including a dangling link) occupies `link`.
pub fn create_link_with(strategy: &dyn LinkStrategy, link: &Path, target: &Path) -> Result<()> {
    let abs_target = normalize(target);
    let abs_link = normalize(link);

    if !abs_target.is_dir() {
        return Err(SkmError::SourceMissing(abs_target));
    }
    if fs::symlink_metadata(&abs_link).is_ok() {
        return Err(SkmError::AlreadyExists(abs_link));
    }

    debug!(
        strategy = strategy.name(),
        link = %abs_link.display(),
        target = %abs_target.display(),
        "creating directory link"
    );
    strategy.create_dir_link(&abs_link, &abs_target)
}

/// Remove a link without touching what it points to.
pub fn remove_link(path: &Path) -> Result<()> {
    #[cfg(windows)]
    {
        // Junctions and directory symlinks are directories to the Win32 API.
        if fs::remove_dir(path).is_ok() {
            return Ok(());
        }
    }
    fs::remove_file(path)?;
    Ok(())
}

/// Observe what occupies `path`.
///
/// A missing path is `EntryKind::Missing`, not an error; any other metadata
/// failure (permissions, I/O) is returned.
pub fn inspect(path: &Path) -> Result<LinkEntry> {
    let kind = match fs::symlink_metadata(path) {
        Err(err) if err.kind() == io::ErrorKind::NotFound => EntryKind::Missing,
        Err(err) => return Err(err.into()),
        Ok(meta) if meta.file_type().is_symlink() => {
            let target = resolve_link(path)?;
            let exists = fs::metadata(path).is_ok();
            EntryKind::Link { target, exists }
        }
        Ok(meta) if meta.is_dir() => EntryKind::RealDirectory,
        Ok(_) => EntryKind::OtherFile,
    };
    Ok(LinkEntry {
        path: path.to_path_buf(),
        kind,
    })
}

/// True iff `path` is a link whose resolved target equals `expected`.
#[must_use]
pub fn resolves_to(path: &Path, expected: &Path) -> bool {
    inspect(path).is_ok_and(|entry| entry.points_to(expected))
}

/// Read a link and make its target absolute relative to the link's parent.
fn resolve_link(path: &Path) -> Result<PathBuf> {
    let raw = fs::read_link(path)?;
    let joined = if raw.is_absolute() {
        raw
    } else {
        path.parent().unwrap_or_else(|| Path::new("")).join(raw)
    };
    Ok(normalize(&joined))
}

/// Absolute, lexically normalized form of `path`.
///
/// `.` and `..` are folded without touching the filesystem, so the result is
/// stable for paths that do not exist (such as a dangling link target).
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    strip_verbatim(out)
}

#[cfg(windows)]
fn strip_verbatim(path: PathBuf) -> PathBuf {
    let text = path.to_string_lossy();
    match text.strip_prefix(r"\\?\") {
        Some(rest) if !rest.starts_with("UNC") => PathBuf::from(rest),
        _ => path,
    }
}

#[cfg(not(windows))]
const fn strip_verbatim(path: PathBuf) -> PathBuf {
    path
}

/// Whether path comparison ignores case on this platform.
///
/// NTFS and APFS (default) preserve case but match case-insensitively.
#[must_use]
pub const fn case_insensitive_paths() -> bool {
    cfg!(any(windows, target_os = "macos"))
}

/// Fold a name or path string for comparison under the platform case policy.
#[must_use]
pub fn fold_case(value: &str) -> String {
    if case_insensitive_paths() {
        value.to_lowercase()
    } else {
        value.to_string()
    }
}

fn folded(path: &Path) -> PathBuf {
    PathBuf::from(fold_case(&normalize(path).to_string_lossy()))
}

/// Compare two paths after normalization, honoring the platform case policy.
#[must_use]
pub fn paths_equal(a: &Path, b: &Path) -> bool {
    folded(a) == folded(b)
}

/// Component-wise prefix test: `/a/b/c` is under `/a/b`, `/a/bc` is not.
#[must_use]
pub fn path_has_prefix(path: &Path, prefix: &Path) -> bool {
    folded(path).starts_with(folded(prefix))
}
