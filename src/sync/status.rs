//! Target status classification.
//!
//! Status is recomputed from the filesystem on every call; nothing is cached.
//! [`scan_children`] is the single place that sorts a target directory's
//! entries into managed links and local content, and both classifiers as
//! well as the engine go through it.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::link::{self, EntryKind, LinkEntry};
use super::naming;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetStatus {
    NotExist,
    /// The target is one link to the source.
    Linked,
    /// A real directory with content skm does not manage.
    HasFiles,
    /// A dangling link or a plain file where a directory is expected.
    Broken,
    /// A link that points somewhere other than the source.
    Conflict,
    /// A real directory holding links into the source.
    Merged,
}

impl TargetStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotExist => "not exist",
            Self::Linked => "linked",
            Self::HasFiles => "has files",
            Self::Broken => "broken",
            Self::Conflict => "conflict",
            Self::Merged => "merged",
        }
    }

    pub fn all() -> impl Iterator<Item = Self> {
        [
            Self::NotExist,
            Self::Linked,
            Self::HasFiles,
            Self::Broken,
            Self::Conflict,
            Self::Merged,
        ]
        .into_iter()
    }
}

impl fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A link inside a target that resolves into the source tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManagedLink {
    pub name: String,
    pub points_to: PathBuf,
    pub dangling: bool,
}

/// Children of a target directory, sorted by role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChildScan {
    /// Visible links resolving under the source.
    pub managed: Vec<ManagedLink>,
    /// Visible real directories.
    pub local_dirs: Vec<String>,
    /// Visible links pointing outside the source, and plain files.
    pub foreign: Vec<String>,
    /// Entries whose names start with `.`.
    pub hidden: Vec<String>,
}

impl ChildScan {
    /// Everything that is not a managed link, hidden entries included.
    #[must_use]
    pub fn unmanaged(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .local_dirs
            .iter()
            .chain(&self.foreign)
            .chain(&self.hidden)
            .cloned()
            .collect();
        names.sort();
        names
    }
}

/// Read `dir` and sort its children.
pub fn scan_children(dir: &Path, source: &Path) -> Result<ChildScan> {
    let mut scan = ChildScan::default();

    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                debug!(dir = %dir.display(), error = %err, "skipping unreadable child");
                continue;
            }
        };
        let name = entry.file_name().to_string_lossy().into_owned();
        if naming::is_hidden(&name) {
            scan.hidden.push(name);
            continue;
        }

        match link::inspect(&entry.path())?.kind {
            EntryKind::Link { target, exists } if link::path_has_prefix(&target, source) => {
                scan.managed.push(ManagedLink {
                    name,
                    points_to: target,
                    dangling: !exists,
                });
            }
            EntryKind::RealDirectory => scan.local_dirs.push(name),
            EntryKind::Link { .. } | EntryKind::OtherFile => scan.foreign.push(name),
            EntryKind::Missing => {}
        }
    }

    scan.managed.sort_by(|a, b| a.name.cmp(&b.name));
    scan.local_dirs.sort();
    scan.foreign.sort();
    scan.hidden.sort();
    Ok(scan)
}

/// Classify a target synced as one whole-directory link.
#[must_use]
pub fn classify_whole(target: &Path, source: &Path) -> TargetStatus {
    let entry = match link::inspect(target) {
        Ok(entry) => entry,
        Err(err) => {
            debug!(target = %target.display(), error = %err, "cannot inspect target");
            return TargetStatus::Broken;
        }
    };

    match entry.kind {
        EntryKind::Missing => TargetStatus::NotExist,
        EntryKind::Link { .. } if entry.points_to(source) => TargetStatus::Linked,
        EntryKind::Link { exists: false, .. } => TargetStatus::Broken,
        EntryKind::Link { .. } => TargetStatus::Conflict,
        EntryKind::RealDirectory => match scan_children(target, source) {
            Ok(scan) if !scan.managed.is_empty() => TargetStatus::Merged,
            Ok(_) => TargetStatus::HasFiles,
            Err(err) => {
                debug!(target = %target.display(), error = %err, "cannot read target directory");
                TargetStatus::HasFiles
            }
        },
        EntryKind::OtherFile => TargetStatus::Broken,
    }
}

/// Result of classifying a merge-mode target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MergeStatus {
    pub status: TargetStatus,
    /// Children that are links into the source.
    pub linked: usize,
    /// Children that are real directories.
    pub local: usize,
}

impl MergeStatus {
    const fn bare(status: TargetStatus) -> Self {
        Self {
            status,
            linked: 0,
            local: 0,
        }
    }
}

/// A link to an existing directory outside the source, such as a skills
/// directory kept in a dotfiles checkout. Merge mode works through it as if
/// it were the directory it resolves to.
#[must_use]
pub fn is_foreign_dir_link(entry: &LinkEntry, source: &Path) -> bool {
    match &entry.kind {
        EntryKind::Link {
            target,
            exists: true,
        } => !link::path_has_prefix(target, source) && entry.path.is_dir(),
        _ => false,
    }
}

/// Classify a target synced with one link per skill.
///
/// A real directory without managed links reports `HasFiles` with only the
/// local count filled in; that is the neutral "nothing synced yet" state.
#[must_use]
pub fn classify_merge(target: &Path, source: &Path) -> MergeStatus {
    let entry = match link::inspect(target) {
        Ok(entry) => entry,
        Err(err) => {
            debug!(target = %target.display(), error = %err, "cannot inspect target");
            return MergeStatus::bare(TargetStatus::Broken);
        }
    };

    match entry.kind {
        EntryKind::Missing => MergeStatus::bare(TargetStatus::NotExist),
        EntryKind::Link { .. } if entry.points_to(source) => MergeStatus::bare(TargetStatus::Linked),
        _ if is_foreign_dir_link(&entry, source) => classify_merge_dir(target, source),
        EntryKind::Link { exists: false, .. } | EntryKind::OtherFile => {
            MergeStatus::bare(TargetStatus::Broken)
        }
        EntryKind::Link { .. } => MergeStatus::bare(TargetStatus::Conflict),
        EntryKind::RealDirectory => classify_merge_dir(target, source),
    }
}

fn classify_merge_dir(target: &Path, source: &Path) -> MergeStatus {
    match scan_children(target, source) {
        Ok(scan) => {
            let linked = scan.managed.len();
            let local = scan.local_dirs.len();
            let status = if linked > 0 {
                TargetStatus::Merged
            } else {
                TargetStatus::HasFiles
            };
            MergeStatus {
                status,
                linked,
                local,
            }
        }
        Err(err) => {
            debug!(target = %target.display(), error = %err, "cannot read target directory");
            MergeStatus::bare(TargetStatus::Broken)
        }
    }
}
