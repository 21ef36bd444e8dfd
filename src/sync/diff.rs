//! Read-only comparison of a target against the source.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::discovery::SkillUnit;
use super::engine::{MergeReport, SyncEngine, SyncOptions, WholeAction, WholeOutcome};
use super::link::fold_case;
use super::status::{TargetStatus, classify_merge, classify_whole, scan_children};
use super::target::{SyncMode, Target};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffKind {
    /// In the source, not yet in the target.
    Add,
    /// Present but linked to the wrong place, or needs relinking.
    Update,
    /// A real directory in the target shadows a skill of the same name.
    LocalCopy,
    /// A real directory in the target with no skill behind it.
    LocalOnly,
    /// A managed link whose skill is gone.
    Prune,
    /// Sync would refuse this target or entry; the detail says why.
    Blocked,
}

impl DiffKind {
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Update => "~",
            Self::LocalCopy => "=",
            Self::LocalOnly => "?",
            Self::Prune => "-",
            Self::Blocked => "!",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffItem {
    pub kind: DiffKind,
    pub name: String,
    pub detail: String,
}

impl DiffItem {
    fn new(kind: DiffKind, name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TargetDiff {
    pub target: String,
    pub path: PathBuf,
    pub mode: SyncMode,
    pub status: TargetStatus,
    pub items: Vec<DiffItem>,
}

impl TargetDiff {
    /// True when sync would change nothing. Local-only directories do not
    /// count; sync never touches them.
    #[must_use]
    pub fn is_in_sync(&self) -> bool {
        self.items
            .iter()
            .all(|item| matches!(item.kind, DiffKind::LocalOnly | DiffKind::LocalCopy))
    }
}

/// Compare one target against `units`.
///
/// The verdicts come from a dry run of the engine with default options, so
/// diff reports exactly what a plain `skm sync` would do. Only the local-only
/// listing, which sync never acts on, is read separately.
pub fn diff_target(engine: &SyncEngine, target: &Target, units: &[SkillUnit]) -> Result<TargetDiff> {
    let options = SyncOptions {
        dry_run: true,
        ..SyncOptions::default()
    };
    let source = engine.source();
    let (status, items) = match target.mode {
        SyncMode::Symlink => (
            classify_whole(&target.path, source),
            whole_items(target, engine.sync_whole(&target.path, &options))?,
        ),
        SyncMode::Merge => (
            classify_merge(&target.path, source).status,
            merge_items(
                target,
                units,
                source,
                engine.sync_merge(&target.name, &target.path, units, &options),
            )?,
        ),
    };
    Ok(TargetDiff {
        target: target.name.clone(),
        path: target.path.clone(),
        mode: target.mode,
        status,
        items,
    })
}

fn whole_items(target: &Target, planned: Result<WholeOutcome>) -> Result<Vec<DiffItem>> {
    let name = target.name.as_str();
    let outcome = match planned {
        Ok(outcome) => outcome,
        Err(err) if err.is_fatal() => return Err(err),
        Err(err) => return Ok(vec![DiffItem::new(DiffKind::Blocked, name, err.to_string())]),
    };
    let item = match outcome.action {
        WholeAction::AlreadyLinked => return Ok(Vec::new()),
        WholeAction::Created => DiffItem::new(DiffKind::Add, name, "link whole directory"),
        action => DiffItem::new(DiffKind::Update, name, action.describe()),
    };
    Ok(vec![item])
}

fn merge_items(
    target: &Target,
    units: &[SkillUnit],
    source: &Path,
    planned: Result<MergeReport>,
) -> Result<Vec<DiffItem>> {
    let report = match planned {
        Ok(report) => report,
        Err(err) if err.is_fatal() => return Err(err),
        Err(err) => {
            return Ok(vec![DiffItem::new(
                DiffKind::Blocked,
                &target.name,
                err.to_string(),
            )]);
        }
    };

    let added = if report.converted_from_link {
        "after converting from symlink mode"
    } else {
        "in source, not in target"
    };
    let mut items: BTreeMap<String, DiffItem> = BTreeMap::new();
    let mut put = |kind: DiffKind, names: &[String], detail: &str| {
        for name in names {
            items.insert(name.clone(), DiffItem::new(kind, name, detail));
        }
    };
    put(DiffKind::Add, &report.linked, added);
    put(DiffKind::Update, &report.updated, "relink");
    put(DiffKind::LocalCopy, &report.skipped, "local copy, not linked");
    put(DiffKind::Prune, &report.pruned, "skill removed from source");
    for error in &report.errors {
        items.insert(
            error.name.clone(),
            DiffItem::new(DiffKind::Blocked, &error.name, &error.message),
        );
    }

    if !report.created_target_dir && !report.converted_from_link {
        let wanted: HashSet<String> = units.iter().map(|u| fold_case(&u.flat_name)).collect();
        for local in scan_children(&target.path, source)?.local_dirs {
            if !wanted.contains(&fold_case(&local)) {
                let item = DiffItem::new(DiffKind::LocalOnly, &local, "local only");
                items.insert(local, item);
            }
        }
    }
    Ok(items.into_values().collect())
}
