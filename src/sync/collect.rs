//! Adopting local skills from targets into the source.
//!
//! A local skill is a real directory inside a target that no source skill
//! covers. Collecting moves it into the source and leaves a managed link in
//! its place, so the next sync treats it like any other skill.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use super::discovery::SkillUnit;
use super::engine::{EntryError, SyncEngine};
use super::link::{self, EntryKind, fold_case};
use super::naming;
use super::status::{is_foreign_dir_link, scan_children};
use super::target::Target;
use crate::error::{Result, SkmError};
use crate::utils::fs::move_path;

/// A real directory in a target with no source skill behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalSkill {
    pub target: String,
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectReport {
    /// Moved into the source (or would be, in a dry run).
    pub collected: Vec<LocalSkill>,
    /// Left alone, with the reason.
    pub skipped: Vec<EntryError>,
    pub failed: Vec<EntryError>,
    pub dry_run: bool,
}

impl CollectReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CollectOptions {
    pub dry_run: bool,
    /// Replace a source entry of the same name.
    pub force: bool,
}

/// List local skills in `target`.
///
/// Local directories that shadow a source skill are left out: the source
/// already has that skill. A target that is a link to the source, or that
/// does not exist, has none.
pub fn find_local_skills(target: &Target, source: &Path, units: &[SkillUnit]) -> Result<Vec<LocalSkill>> {
    let entry = link::inspect(&target.path)?;
    let readable = match entry.kind {
        EntryKind::RealDirectory => true,
        EntryKind::Link { .. } => is_foreign_dir_link(&entry, source),
        EntryKind::Missing | EntryKind::OtherFile => false,
    };
    if !readable {
        return Ok(Vec::new());
    }

    let wanted: HashSet<String> = units.iter().map(|u| fold_case(&u.flat_name)).collect();
    let scan = scan_children(&target.path, source)?;
    Ok(scan
        .local_dirs
        .into_iter()
        .filter(|name| !wanted.contains(&fold_case(name)))
        .map(|name| LocalSkill {
            target: target.name.clone(),
            path: target.path.join(&name),
            name,
        })
        .collect())
}

impl SyncEngine {
    /// Move each local skill into the source root and link it back.
    ///
    /// Names the source reserves for tracked repos or nested skills are
    /// skipped, as is a name already present in the source unless `force`
    /// is set. The same name found in two targets is collected once.
    pub fn collect(&self, locals: &[LocalSkill], options: CollectOptions) -> Result<CollectReport> {
        self.ensure_source()?;
        let mut report = CollectReport {
            dry_run: options.dry_run,
            ..CollectReport::default()
        };
        let mut claimed: HashSet<String> = HashSet::new();

        for local in locals {
            let skip = |reason: String| EntryError {
                name: format!("{}/{}", local.target, local.name),
                message: reason,
            };
            if naming::is_tracked_repo_name(&local.name) || naming::is_nested(&local.name) {
                report
                    .skipped
                    .push(skip("name is reserved for tracked repos".to_string()));
                continue;
            }
            if !claimed.insert(fold_case(&local.name)) {
                report
                    .skipped
                    .push(skip("already collected from another target".to_string()));
                continue;
            }

            let dest = self.source().join(&local.name);
            let occupied = fs::symlink_metadata(&dest).is_ok();
            if occupied && !options.force {
                report.skipped.push(skip(
                    "already exists in source (use --force to replace it)".to_string(),
                ));
                continue;
            }

            if !options.dry_run {
                if let Err(err) = self.adopt(local, &dest, occupied) {
                    warn!(skill = %local.name, target = %local.target, error = %err, "collect failed");
                    report.failed.push(skip(err.to_string()));
                    continue;
                }
            }
            debug!(skill = %local.name, target = %local.target, "collected");
            report.collected.push(local.clone());
        }

        info!(
            collected = report.collected.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            dry_run = options.dry_run,
            "collect finished"
        );
        Ok(report)
    }

    fn adopt(&self, local: &LocalSkill, dest: &Path, replace: bool) -> Result<()> {
        if replace {
            match link::inspect(dest)?.kind {
                EntryKind::RealDirectory => fs::remove_dir_all(dest)?,
                EntryKind::Link { .. } => link::remove_link(dest)?,
                EntryKind::OtherFile => fs::remove_file(dest)?,
                EntryKind::Missing => {}
            }
        }
        move_path(&local.path, dest)?;
        self.link(&local.path, dest).map_err(|err| SkmError::TargetAccess {
            target: local.target.clone(),
            reason: format!("{} moved to source, link not created: {err}", local.name),
        })
    }
}
