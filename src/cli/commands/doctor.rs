//! skm doctor - Health checks for the source, targets, and link support

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use clap::Args;
use colored::Colorize;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{emit_json, robot_ok};
use crate::error::Result;
use crate::sync::link::{self, EntryKind, LinkStrategy, fold_case, platform_strategy};
use crate::sync::status::{is_foreign_dir_link, scan_children};
use crate::sync::{DiscoveryOptions, SkillUnit, SyncMode, Target, TargetStatus, classify_merge, classify_whole, discover_units_with};
use crate::utils::fs::display_path;

/// Marker file a skill directory is expected to contain.
pub const SKILL_MARKER: &str = "SKILL.md";

#[derive(Args, Debug, Default)]
pub struct DoctorArgs {
    /// Run a specific check only (source, link, skills, targets)
    #[arg(long)]
    pub check: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Ok,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub check: &'static str,
    pub level: Level,
    pub message: String,
}

impl Finding {
    fn new(check: &'static str, level: Level, message: impl Into<String>) -> Self {
        Self {
            check,
            level,
            message: message.into(),
        }
    }
}

const CHECKS: &[&str] = &["source", "link", "skills", "targets"];

pub fn run(ctx: &AppContext, args: &DoctorArgs) -> Result<()> {
    let only = args.check.as_deref();
    if let Some(check) = only {
        if !CHECKS.contains(&check) {
            println!("{} Unknown check: {check}", "!".yellow());
            println!("  Available checks: {}", CHECKS.join(", "));
            return Ok(());
        }
    }
    let wants = |name: &str| only.is_none_or(|check| check == name);

    let source = ctx.config.source_path();
    let mut findings = Vec::new();
    if wants("source") {
        findings.push(check_source(&source));
    }
    if wants("link") {
        findings.push(check_link_support(platform_strategy().as_ref()));
    }

    let mut units = Vec::new();
    if source.is_dir() && (wants("skills") || wants("targets")) {
        let (found, skill_findings) = check_skills(&source, &ctx.config.discovery_options()?);
        units = found;
        if wants("skills") {
            findings.extend(skill_findings);
        }
    }

    if wants("targets") {
        let targets = ctx.config.targets();
        for target in &targets {
            findings.extend(check_target(target, &source, &units));
        }
        findings.extend(check_shared_local_dirs(&targets, &source));
    }

    let errors = findings.iter().filter(|f| f.level == Level::Error).count();
    let warnings = findings.iter().filter(|f| f.level == Level::Warn).count();

    if ctx.robot_mode {
        return emit_json(&robot_ok(serde_json::json!({
            "findings": findings,
            "errors": errors,
            "warnings": warnings,
        })));
    }

    println!("{}", "skm doctor - Health Checks".bold());
    println!();
    for finding in &findings {
        if finding.level == Level::Ok && ctx.verbosity == 0 && finding.check == "skills" {
            continue;
        }
        let mark = match finding.level {
            Level::Ok => "✓".green(),
            Level::Warn => "!".yellow(),
            Level::Error => "✗".red(),
        };
        println!("{mark} [{}] {}", finding.check, finding.message);
    }
    println!();
    if errors == 0 && warnings == 0 {
        println!("{} All checks passed", "✓".green().bold());
    } else {
        println!(
            "{} Found {errors} errors, {warnings} warnings",
            if errors > 0 { "✗".red().bold() } else { "!".yellow().bold() }
        );
    }
    Ok(())
}

#[must_use]
pub fn check_source(source: &Path) -> Finding {
    if source.is_dir() {
        Finding::new("source", Level::Ok, format!("source {} exists", display_path(source)))
    } else if source.exists() {
        Finding::new(
            "source",
            Level::Error,
            format!("source {} is not a directory", display_path(source)),
        )
    } else {
        Finding::new(
            "source",
            Level::Error,
            format!("source {} does not exist", display_path(source)),
        )
    }
}

/// Create and remove a directory link in a scratch directory.
#[must_use]
pub fn check_link_support(strategy: &dyn LinkStrategy) -> Finding {
    match try_link(strategy) {
        Ok(()) => Finding::new(
            "link",
            Level::Ok,
            format!("directory links work ({})", strategy.name()),
        ),
        Err(err) => Finding::new("link", Level::Error, format!("cannot create links: {err}")),
    }
}

fn try_link(strategy: &dyn LinkStrategy) -> Result<()> {
    let scratch = tempfile::tempdir()?;
    let dir = scratch.path().join("scratch-target");
    std::fs::create_dir(&dir)?;
    let link_path = scratch.path().join("scratch-link");
    link::create_link_with(strategy, &link_path, &dir)?;
    link::remove_link(&link_path)?;
    Ok(())
}

/// Discover skills and flag collisions and missing marker files.
#[must_use]
pub fn check_skills(source: &Path, options: &DiscoveryOptions) -> (Vec<SkillUnit>, Vec<Finding>) {
    let units = match discover_units_with(source, options) {
        Ok(units) => units,
        Err(err) => return (Vec::new(), vec![Finding::new("skills", Level::Error, err.to_string())]),
    };

    let mut findings = vec![Finding::new(
        "skills",
        Level::Ok,
        format!("{} skills discovered", units.len()),
    )];
    for unit in &units {
        if !unit.source_path.join(SKILL_MARKER).is_file() {
            findings.push(Finding::new(
                "skills",
                Level::Warn,
                format!("{} has no {SKILL_MARKER}", unit.rel_path),
            ));
        }
    }
    (units, findings)
}

/// Location, link state, writability and contents of one target.
#[must_use]
pub fn check_target(target: &Target, source: &Path, units: &[SkillUnit]) -> Vec<Finding> {
    let name = target.name.as_str();
    let shown = display_path(&target.path);
    let mut findings = Vec::new();

    let status = match target.mode {
        SyncMode::Symlink => classify_whole(&target.path, source),
        SyncMode::Merge => classify_merge(&target.path, source).status,
    };
    let (level, message) = match (target.mode, status) {
        (_, TargetStatus::NotExist) => {
            if target.path.parent().is_some_and(Path::is_dir) {
                (Level::Ok, format!("{name}: {shown} not created yet"))
            } else {
                (Level::Warn, format!("{name}: parent of {shown} does not exist"))
            }
        }
        (SyncMode::Symlink, TargetStatus::Linked) | (SyncMode::Merge, TargetStatus::Merged) => {
            (Level::Ok, format!("{name}: {status}"))
        }
        (SyncMode::Merge, TargetStatus::HasFiles) => {
            (Level::Ok, format!("{name}: directory exists, no skills linked yet"))
        }
        (SyncMode::Symlink, TargetStatus::HasFiles) => (
            Level::Warn,
            format!("{name}: {shown} holds unmanaged files (sync --migrate)"),
        ),
        (SyncMode::Symlink, TargetStatus::Merged) | (SyncMode::Merge, TargetStatus::Linked) => (
            Level::Warn,
            format!("{name}: laid out for the other mode, needs sync"),
        ),
        (_, TargetStatus::Conflict) => {
            let points_to = link::inspect(&target.path)
                .ok()
                .and_then(|entry| entry.link_target().map(display_path))
                .unwrap_or_default();
            (Level::Error, format!("{name}: links to {points_to}, not the source"))
        }
        (_, TargetStatus::Broken) => (Level::Error, format!("{name}: {shown} is broken")),
    };
    findings.push(Finding::new("targets", level, message));

    let holds_entries = link::inspect(&target.path).is_ok_and(|entry| match entry.kind {
        EntryKind::RealDirectory => true,
        EntryKind::Link { .. } => {
            target.mode == SyncMode::Merge && is_foreign_dir_link(&entry, source)
        }
        EntryKind::Missing | EntryKind::OtherFile => false,
    });
    if !holds_entries {
        return findings;
    }

    if let Err(err) = try_write(&target.path) {
        findings.push(Finding::new(
            "targets",
            Level::Error,
            format!("{name}: {shown} is not writable: {err}"),
        ));
    }

    let Ok(scan) = scan_children(&target.path, source) else {
        findings.push(Finding::new(
            "targets",
            Level::Error,
            format!("{name}: cannot read {shown}"),
        ));
        return findings;
    };
    let dangling: Vec<&str> = scan
        .managed
        .iter()
        .filter(|managed| managed.dangling)
        .map(|managed| managed.name.as_str())
        .collect();
    if !dangling.is_empty() {
        findings.push(Finding::new(
            "targets",
            Level::Warn,
            format!("{name}: broken links {} (sync prunes them)", dangling.join(", ")),
        ));
    }

    let unit_names: HashSet<String> = units.iter().map(|u| fold_case(&u.flat_name)).collect();
    let shadowing: Vec<&str> = scan
        .local_dirs
        .iter()
        .filter(|local| unit_names.contains(&fold_case(local)))
        .map(String::as_str)
        .collect();
    if !shadowing.is_empty() {
        findings.push(Finding::new(
            "targets",
            Level::Warn,
            format!(
                "{name}: local copies shadow source skills: {}",
                shadowing.join(", ")
            ),
        ));
    }
    findings
}

fn try_write(dir: &Path) -> Result<()> {
    let scratch_file = tempfile::Builder::new()
        .prefix(".skm-write-test")
        .tempfile_in(dir)?;
    scratch_file.close()?;
    Ok(())
}

/// Local directories with the same name in more than one target.
#[must_use]
pub fn check_shared_local_dirs(targets: &[Target], source: &Path) -> Vec<Finding> {
    let mut seen: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    for target in targets {
        if link::resolves_to(&target.path, source) {
            continue;
        }
        let Ok(scan) = scan_children(&target.path, source) else {
            continue;
        };
        for local in scan.local_dirs {
            seen.entry(local).or_default().push(target.name.as_str());
        }
    }
    seen.into_iter()
        .filter(|(_, owners)| owners.len() > 1)
        .map(|(local, owners)| {
            Finding::new(
                "targets",
                Level::Warn,
                format!(
                    "local skill {local} is duplicated in {} (consider moving it into the source)",
                    owners.join(", ")
                ),
            )
        })
        .collect()
}
