//! Reconciler: drives targets toward the state implied by the source.
//!
//! Every call re-reads the filesystem. A dry run goes through the same
//! classification and decisions as a real run and returns the same report,
//! it just skips the mutations.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::discovery::{DiscoveryOptions, SkillUnit, discover_units, discover_units_with};
use super::link::{self, EntryKind, LinkStrategy, fold_case};
use super::status::{TargetStatus, classify_whole, is_foreign_dir_link, scan_children};
use super::target::{SyncMode, Target};
use crate::error::{Result, SkmError, StructuredError};
use crate::utils::fs::{ensure_dir, move_path};

/// What to do with unmanaged content at a whole-link target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HasFilesPolicy {
    /// Report `UnmanagedContent` and leave the directory alone.
    #[default]
    Refuse,
    /// Move the content into the source, then link.
    Migrate,
}

#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    pub dry_run: bool,
    pub force: bool,
    pub has_files: HasFilesPolicy,
}

/// Action taken (or planned) for a whole-link target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WholeAction {
    Created,
    AlreadyLinked,
    /// Dangling link replaced.
    Repaired,
    /// Foreign link or file replaced under `force`.
    Replaced,
    /// Directory content moved into the source before linking.
    Migrated,
    /// Merge-mode directory turned into a whole link.
    ConvertedFromMerge,
}

impl WholeAction {
    #[must_use]
    pub const fn describe(&self) -> &'static str {
        match self {
            Self::Created => "symlink created",
            Self::AlreadyLinked => "already linked",
            Self::Repaired => "broken link repaired",
            Self::Replaced => "existing entry replaced",
            Self::Migrated => "content migrated and linked",
            Self::ConvertedFromMerge => "converted from merge mode",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WholeOutcome {
    /// Classification before anything was changed.
    pub status: TargetStatus,
    pub action: WholeAction,
    /// Entries moved into the source.
    pub migrated: Vec<String>,
    /// Per-skill links removed while converting from merge mode.
    pub removed_links: Vec<String>,
    pub dry_run: bool,
}

impl WholeOutcome {
    #[must_use]
    pub fn changed(&self) -> bool {
        self.action != WholeAction::AlreadyLinked
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryError {
    pub name: String,
    pub message: String,
}

/// Result of a merge-mode sync. Each skill lands in exactly one bucket or in
/// `errors`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub target: String,
    pub linked: Vec<String>,
    pub updated: Vec<String>,
    /// Local real directories shadowing a skill name.
    pub skipped: Vec<String>,
    pub pruned: Vec<String>,
    /// Links that were already correct.
    pub unchanged: Vec<String>,
    pub errors: Vec<EntryError>,
    /// The target was a whole link and became a directory.
    pub converted_from_link: bool,
    pub created_target_dir: bool,
    pub dry_run: bool,
}

impl MergeReport {
    fn new(target: &str, dry_run: bool) -> Self {
        Self {
            target: target.to_string(),
            dry_run,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn change_count(&self) -> usize {
        self.linked.len() + self.updated.len() + self.pruned.len()
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn summary_line(&self) -> String {
        format!(
            "{}: +{} ~{} ={} -{} skip {} err {}",
            self.target,
            self.linked.len(),
            self.updated.len(),
            self.unchanged.len(),
            self.pruned.len(),
            self.skipped.len(),
            self.errors.len()
        )
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum TargetOutcome {
    Whole(WholeOutcome),
    Merge(MergeReport),
    Failed { error: StructuredError },
}

#[derive(Debug, Clone, Serialize)]
pub struct TargetReport {
    pub name: String,
    pub path: PathBuf,
    pub mode: SyncMode,
    pub outcome: TargetOutcome,
    pub duration_ms: u128,
}

impl TargetReport {
    /// True when the target was fully reconciled.
    #[must_use]
    pub fn is_success(&self) -> bool {
        match &self.outcome {
            TargetOutcome::Whole(_) => true,
            TargetOutcome::Merge(report) => report.is_clean(),
            TargetOutcome::Failed { .. } => false,
        }
    }
}

enum EntryAction {
    Linked,
    Updated,
    Skipped,
    Unchanged,
}

pub struct SyncEngine {
    source: PathBuf,
    linker: Box<dyn LinkStrategy>,
}

impl SyncEngine {
    /// Engine for `source` using the platform link strategy.
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self::with_strategy(source, link::platform_strategy())
    }

    pub fn with_strategy(source: impl Into<PathBuf>, linker: Box<dyn LinkStrategy>) -> Self {
        Self {
            source: link::normalize(&source.into()),
            linker,
        }
    }

    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    pub(super) fn ensure_source(&self) -> Result<()> {
        if self.source.is_dir() {
            Ok(())
        } else {
            Err(SkmError::SourceMissing(self.source.clone()))
        }
    }

    pub(super) fn link(&self, link_path: &Path, target: &Path) -> Result<()> {
        link::create_link_with(self.linker.as_ref(), link_path, target)
    }

    /// Reconcile every target in order. Errors on one target are recorded in
    /// its report; only fatal errors end the run.
    pub fn sync_all(
        &self,
        targets: &[Target],
        discovery: &DiscoveryOptions,
        options: &SyncOptions,
    ) -> Result<Vec<TargetReport>> {
        self.ensure_source()?;
        let mut units: Option<Vec<SkillUnit>> = None;
        let mut reports = Vec::with_capacity(targets.len());
        let mut ordered: Vec<&Target> = targets.iter().collect();
        ordered.sort_by(|a, b| a.name.cmp(&b.name));

        for target in ordered {
            let started = Instant::now();
            let result = match target.mode {
                SyncMode::Symlink => self.sync_whole(&target.path, options).map(TargetOutcome::Whole),
                SyncMode::Merge => {
                    if units.is_none() {
                        units = Some(discover_units_with(&self.source, discovery)?);
                    }
                    let units = units.as_deref().unwrap_or_default();
                    self.sync_merge(&target.name, &target.path, units, options)
                        .map(TargetOutcome::Merge)
                }
            };

            let outcome = match result {
                Ok(outcome) => outcome,
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    warn!(target = %target.name, error = %err, "target sync failed");
                    TargetOutcome::Failed {
                        error: StructuredError::from(&err),
                    }
                }
            };

            reports.push(TargetReport {
                name: target.name.clone(),
                path: target.path.clone(),
                mode: target.mode,
                outcome,
                duration_ms: started.elapsed().as_millis(),
            });
        }

        Ok(reports)
    }

    /// Make `target` a single link to the source.
    pub fn sync_whole(&self, target: &Path, options: &SyncOptions) -> Result<WholeOutcome> {
        self.ensure_source()?;
        let status = classify_whole(target, &self.source);
        debug!(target = %target.display(), %status, "whole-link target classified");

        let mut outcome = WholeOutcome {
            status,
            action: WholeAction::AlreadyLinked,
            migrated: Vec::new(),
            removed_links: Vec::new(),
            dry_run: options.dry_run,
        };

        match status {
            TargetStatus::Linked => {}
            TargetStatus::NotExist => {
                if !options.dry_run {
                    if let Some(parent) = target.parent() {
                        ensure_dir(parent).map_err(|err| access_error(target, err))?;
                    }
                    self.link(target, &self.source)?;
                }
                outcome.action = WholeAction::Created;
            }
            TargetStatus::Broken => outcome.action = self.repair_whole(target, options)?,
            TargetStatus::Conflict => {
                let entry = link::inspect(target)?;
                if !options.force {
                    return Err(SkmError::Conflict {
                        target: target.to_path_buf(),
                        points_to: entry.link_target().map(Path::to_path_buf).unwrap_or_default(),
                    });
                }
                if !options.dry_run {
                    link::remove_link(target)?;
                    self.link(target, &self.source)?;
                }
                outcome.action = WholeAction::Replaced;
            }
            TargetStatus::HasFiles | TargetStatus::Merged => {
                self.replace_directory(target, options, &mut outcome)?;
            }
        }

        if outcome.changed() {
            info!(
                target = %target.display(),
                action = outcome.action.describe(),
                dry_run = options.dry_run,
                "whole-link target reconciled"
            );
        }
        Ok(outcome)
    }

    fn repair_whole(&self, target: &Path, options: &SyncOptions) -> Result<WholeAction> {
        let entry = link::inspect(target)?;
        match entry.kind {
            EntryKind::Link { .. } => {
                if !options.dry_run {
                    link::remove_link(target)?;
                    self.link(target, &self.source)?;
                }
                Ok(WholeAction::Repaired)
            }
            EntryKind::OtherFile if options.force => {
                if !options.dry_run {
                    fs::remove_file(target).map_err(|err| access_error(target, err))?;
                    self.link(target, &self.source)?;
                }
                Ok(WholeAction::Replaced)
            }
            EntryKind::OtherFile => Err(SkmError::UnmanagedContent {
                target: target.to_path_buf(),
                entries: vec![entry.name()],
            }),
            EntryKind::Missing | EntryKind::RealDirectory => Err(access_error(
                target,
                "target changed while it was being inspected",
            )),
        }
    }

    /// Turn a real directory (unmanaged or merge-mode) into a whole link.
    ///
    /// Under `Refuse` only managed links may be present; anything else,
    /// hidden entries included, is reported and left in place. The source is
    /// written to only under `Migrate`.
    fn replace_directory(
        &self,
        target: &Path,
        options: &SyncOptions,
        outcome: &mut WholeOutcome,
    ) -> Result<()> {
        let scan = scan_children(target, &self.source).map_err(|err| access_error(target, err))?;
        let content = scan.unmanaged();
        if !content.is_empty() {
            if options.has_files == HasFilesPolicy::Refuse {
                return Err(SkmError::UnmanagedContent {
                    target: target.to_path_buf(),
                    entries: content,
                });
            }
            self.check_migration(target, &content)?;
        }

        outcome.removed_links = scan.managed.iter().map(|m| m.name.clone()).collect();
        outcome.action = if outcome.status == TargetStatus::Merged {
            WholeAction::ConvertedFromMerge
        } else if content.is_empty() {
            WholeAction::Created
        } else {
            WholeAction::Migrated
        };
        outcome.migrated = content;

        if options.dry_run {
            return Ok(());
        }

        for name in &outcome.removed_links {
            link::remove_link(&target.join(name))?;
        }
        move_entries(target, &self.source, &outcome.migrated)?;
        fs::remove_dir(target).map_err(|err| access_error(target, err))?;
        self.link(target, &self.source)
    }

    fn check_migration(&self, target: &Path, content: &[String]) -> Result<()> {
        for name in content {
            if fs::symlink_metadata(self.source.join(name)).is_ok() {
                return Err(SkmError::MigrationCollision {
                    target: target.to_path_buf(),
                    name: name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Make `target` a real directory with one link per skill in `units`,
    /// then prune managed links whose skill is gone.
    pub fn sync_merge(
        &self,
        name: &str,
        target: &Path,
        units: &[SkillUnit],
        options: &SyncOptions,
    ) -> Result<MergeReport> {
        self.ensure_source()?;
        let mut report = MergeReport::new(name, options.dry_run);
        self.prepare_merge_dir(target, options, &mut report)?;

        // In a dry run a directory that would be created or converted is
        // still absent (or still the whole link), so every skill is new.
        let planned_only =
            options.dry_run && (report.created_target_dir || report.converted_from_link);

        for unit in units {
            if planned_only {
                report.linked.push(unit.flat_name.clone());
                continue;
            }
            let entry_path = target.join(&unit.flat_name);
            match self.reconcile_entry(&entry_path, unit, options) {
                Ok(EntryAction::Linked) => report.linked.push(unit.flat_name.clone()),
                Ok(EntryAction::Updated) => report.updated.push(unit.flat_name.clone()),
                Ok(EntryAction::Skipped) => report.skipped.push(unit.flat_name.clone()),
                Ok(EntryAction::Unchanged) => report.unchanged.push(unit.flat_name.clone()),
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    warn!(target = name, skill = %unit.flat_name, error = %err, "entry sync failed");
                    report.errors.push(EntryError {
                        name: unit.flat_name.clone(),
                        message: err.to_string(),
                    });
                }
            }
        }

        if !planned_only {
            self.prune(target, units, options, &mut report)?;
        }

        info!(
            target = name,
            linked = report.linked.len(),
            updated = report.updated.len(),
            skipped = report.skipped.len(),
            pruned = report.pruned.len(),
            errors = report.errors.len(),
            dry_run = options.dry_run,
            "merge target reconciled"
        );
        Ok(report)
    }

    fn prepare_merge_dir(
        &self,
        target: &Path,
        options: &SyncOptions,
        report: &mut MergeReport,
    ) -> Result<()> {
        let entry = link::inspect(target).map_err(|err| access_error(target, err))?;
        let ours = entry.points_to(&self.source);
        match &entry.kind {
            EntryKind::RealDirectory => Ok(()),
            EntryKind::Missing => {
                report.created_target_dir = true;
                if !options.dry_run {
                    ensure_dir(target).map_err(|err| access_error(target, err))?;
                }
                Ok(())
            }
            EntryKind::Link { .. } if is_foreign_dir_link(&entry, &self.source) => {
                debug!(target = %target.display(), "merging through linked directory");
                Ok(())
            }
            EntryKind::Link {
                target: points_to,
                exists,
            } => {
                if *exists && !ours && !options.force {
                    return Err(SkmError::Conflict {
                        target: target.to_path_buf(),
                        points_to: points_to.clone(),
                    });
                }
                report.converted_from_link = true;
                if !options.dry_run {
                    link::remove_link(target)?;
                    ensure_dir(target).map_err(|err| access_error(target, err))?;
                }
                Ok(())
            }
            EntryKind::OtherFile => Err(access_error(target, "path is a file, not a directory")),
        }
    }

    fn reconcile_entry(
        &self,
        path: &Path,
        unit: &SkillUnit,
        options: &SyncOptions,
    ) -> Result<EntryAction> {
        let entry = link::inspect(path)?;
        let action = match entry.kind {
            EntryKind::Missing => {
                if !options.dry_run {
                    self.link(path, &unit.source_path)?;
                }
                EntryAction::Linked
            }
            EntryKind::Link { .. } if entry.points_to(&unit.source_path) => EntryAction::Unchanged,
            EntryKind::Link { .. } => {
                if !options.dry_run {
                    link::remove_link(path)?;
                    self.link(path, &unit.source_path)?;
                }
                EntryAction::Updated
            }
            // Local content always wins, force or not.
            EntryKind::RealDirectory => EntryAction::Skipped,
            EntryKind::OtherFile if options.force => {
                if !options.dry_run {
                    fs::remove_file(path)?;
                    self.link(path, &unit.source_path)?;
                }
                EntryAction::Updated
            }
            EntryKind::OtherFile => {
                return Err(SkmError::UnmanagedContent {
                    target: path.to_path_buf(),
                    entries: vec![unit.flat_name.clone()],
                });
            }
        };
        debug!(skill = %unit.flat_name, path = %path.display(), "entry reconciled");
        Ok(action)
    }

    fn prune(
        &self,
        target: &Path,
        units: &[SkillUnit],
        options: &SyncOptions,
        report: &mut MergeReport,
    ) -> Result<()> {
        let wanted: HashSet<String> = units.iter().map(|u| fold_case(&u.flat_name)).collect();
        let scan = scan_children(target, &self.source).map_err(|err| access_error(target, err))?;

        for managed in scan.managed {
            if wanted.contains(&fold_case(&managed.name)) {
                continue;
            }
            if !options.dry_run {
                if let Err(err) = link::remove_link(&target.join(&managed.name)) {
                    report.errors.push(EntryError {
                        name: managed.name,
                        message: err.to_string(),
                    });
                    continue;
                }
            }
            debug!(entry = %managed.name, "pruned stale link");
            report.pruned.push(managed.name);
        }
        Ok(())
    }
}

fn access_error(target: &Path, reason: impl std::fmt::Display) -> SkmError {
    SkmError::TargetAccess {
        target: target.display().to_string(),
        reason: reason.to_string(),
    }
}

/// Move `names` from `from` into `to`. On failure the entries already moved
/// are moved back; the error names the failing entry and anything that could
/// not be restored.
fn move_entries(from: &Path, to: &Path, names: &[String]) -> Result<()> {
    let mut moved: Vec<&String> = Vec::with_capacity(names.len());
    for name in names {
        debug!(entry = %name, "migrating into source");
        if let Err(err) = move_path(&from.join(name), &to.join(name)) {
            let stranded: Vec<String> = moved
                .iter()
                .rev()
                .filter(|done| move_path(&to.join(done), &from.join(done)).is_err())
                .map(|done| done.to_string())
                .collect();
            let reason = if stranded.is_empty() {
                format!("moving '{name}' failed ({err}); {} entries moved back", moved.len())
            } else {
                format!(
                    "moving '{name}' failed ({err}); left in source: {}",
                    stranded.join(", ")
                )
            };
            return Err(access_error(from, reason));
        }
        moved.push(name);
    }
    Ok(())
}

/// Sync one whole-link target with the platform link strategy.
pub fn sync_whole(target: &Path, source: &Path, dry_run: bool, force: bool) -> Result<WholeOutcome> {
    let options = SyncOptions {
        dry_run,
        force,
        ..SyncOptions::default()
    };
    SyncEngine::new(source).sync_whole(target, &options)
}

/// Discover skills under `source` and sync one merge-mode target.
pub fn sync_merge(
    target_name: &str,
    target: &Path,
    source: &Path,
    dry_run: bool,
) -> Result<MergeReport> {
    let units = discover_units(source)?;
    let options = SyncOptions {
        dry_run,
        ..SyncOptions::default()
    };
    SyncEngine::new(source).sync_merge(target_name, target, &units, &options)
}
