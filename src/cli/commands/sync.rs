//! skm sync - Reconcile targets with the source

use std::time::Instant;

use clap::Args;
use colored::Colorize;
use tracing::info;

use crate::app::AppContext;
use crate::cli::output::{emit_json, robot_ok, robot_partial};
use crate::error::{Result, SkmError};
use crate::oplog::{OpEntry, OpStatus};
use crate::sync::{
    HasFilesPolicy, MergeReport, SyncEngine, SyncOptions, Target, TargetOutcome, TargetReport,
    WholeOutcome,
};
use crate::utils::fs::display_path;

#[derive(Args, Debug, Default)]
pub struct SyncArgs {
    /// Only sync this target (default: all configured targets)
    #[arg(value_name = "TARGET")]
    pub target: Option<String>,

    /// Show what would change without touching anything
    #[arg(long, short = 'n')]
    pub dry_run: bool,

    /// Replace links and files that point somewhere else
    #[arg(long, short)]
    pub force: bool,

    /// Move unmanaged content of symlink-mode targets into the source
    #[arg(long)]
    pub migrate: bool,
}

impl SyncArgs {
    fn options(&self) -> SyncOptions {
        SyncOptions {
            dry_run: self.dry_run,
            force: self.force,
            has_files: if self.migrate {
                HasFilesPolicy::Migrate
            } else {
                HasFilesPolicy::Refuse
            },
        }
    }

    fn log_args(&self, reports: &[TargetReport]) -> serde_json::Value {
        let targets: serde_json::Map<String, serde_json::Value> = reports
            .iter()
            .map(|report| (report.name.clone(), outcome_counts(&report.outcome)))
            .collect();
        serde_json::json!({
            "target": self.target,
            "dry_run": self.dry_run,
            "force": self.force,
            "migrate": self.migrate,
            "targets": targets,
        })
    }
}

pub fn run(ctx: &AppContext, args: &SyncArgs) -> Result<()> {
    let started = Instant::now();
    let targets: Vec<Target> = match args.target.as_deref() {
        Some(name) => vec![ctx.config.target(name)?],
        None => ctx.config.targets(),
    };

    if targets.is_empty() {
        if ctx.robot_mode {
            return emit_json(&robot_ok(serde_json::json!({ "reports": [] }))
                .with_warnings(vec!["no targets configured".to_string()]));
        }
        println!(
            "{} No targets configured. Add one with `skm target add <name> <path>`",
            "!".yellow()
        );
        return Ok(());
    }

    let engine = SyncEngine::new(ctx.config.source_path());
    let discovery = ctx.config.discovery_options()?;
    let options = args.options();

    let reports = match engine.sync_all(&targets, &discovery, &options) {
        Ok(reports) => reports,
        Err(err) => {
            ctx.oplog.record(
                &OpEntry::new("sync", OpStatus::Error, started.elapsed())
                    .with_message(err.to_string())
                    .with_args(args.log_args(&[])),
            );
            return Err(err);
        }
    };

    let failed = reports.iter().filter(|r| !r.is_success()).count();
    let completed = reports.len() - failed;
    info!(completed, failed, dry_run = args.dry_run, "sync finished");

    if !args.dry_run {
        let status = match (failed, completed) {
            (0, _) => OpStatus::Ok,
            (_, 0) => OpStatus::Error,
            _ => OpStatus::Partial,
        };
        let mut entry =
            OpEntry::new("sync", status, started.elapsed()).with_args(args.log_args(&reports));
        if failed > 0 {
            entry = entry.with_message(format!("{failed} of {} targets failed", reports.len()));
        }
        ctx.oplog.record(&entry);
    }

    if ctx.robot_mode {
        let data = serde_json::json!({
            "source": engine.source().display().to_string(),
            "dry_run": args.dry_run,
            "reports": reports,
        });
        if failed == 0 {
            emit_json(&robot_ok(data))?;
        } else {
            emit_json(&robot_partial(data, completed, failed))?;
        }
    } else if !ctx.quiet {
        print_reports(&reports, args.dry_run);
    }

    if failed > 0 {
        return Err(SkmError::SyncIncomplete {
            failed,
            total: reports.len(),
        });
    }
    Ok(())
}

fn outcome_counts(outcome: &TargetOutcome) -> serde_json::Value {
    match outcome {
        TargetOutcome::Whole(whole) => serde_json::json!({
            "action": whole.action,
            "migrated": whole.migrated.len(),
        }),
        TargetOutcome::Merge(report) => serde_json::json!({
            "linked": report.linked.len(),
            "updated": report.updated.len(),
            "skipped": report.skipped.len(),
            "pruned": report.pruned.len(),
            "errors": report.errors.len(),
        }),
        TargetOutcome::Failed { error } => serde_json::json!({ "error": error.code }),
    }
}

fn print_reports(reports: &[TargetReport], dry_run: bool) {
    if dry_run {
        println!("{}", "Dry run: nothing will be changed".yellow());
        println!();
    }
    for report in reports {
        match &report.outcome {
            TargetOutcome::Whole(whole) => print_whole(report, whole),
            TargetOutcome::Merge(merge) => print_merge(report, merge),
            TargetOutcome::Failed { error } => {
                println!("{} {}: {}", "✗".red(), report.name.bold(), error.message);
                println!("    {}", error.suggestion.dimmed());
            }
        }
    }
}

fn print_whole(report: &TargetReport, whole: &WholeOutcome) {
    let mark = if whole.changed() { "✓".green() } else { "·".dimmed() };
    let verb = if whole.dry_run && whole.changed() {
        format!("would be {}", whole.action.describe())
    } else {
        whole.action.describe().to_string()
    };
    println!(
        "{mark} {}: {verb} ({})",
        report.name.bold(),
        display_path(&report.path)
    );
    for name in &whole.migrated {
        println!("    moved {name} into source");
    }
}

fn print_merge(report: &TargetReport, merge: &MergeReport) {
    let mark = if !merge.is_clean() {
        "!".yellow()
    } else if merge.change_count() > 0 {
        "✓".green()
    } else {
        "·".dimmed()
    };
    let mut parts = vec![
        format!("{} linked", merge.linked.len()),
        format!("{} updated", merge.updated.len()),
        format!("{} pruned", merge.pruned.len()),
    ];
    if !merge.skipped.is_empty() {
        parts.push(format!("{} local", merge.skipped.len()));
    }
    if !merge.errors.is_empty() {
        parts.push(format!("{} failed", merge.errors.len()));
    }
    let prefix = if merge.dry_run { "would merge" } else { "merged" };
    println!(
        "{mark} {}: {prefix} ({})",
        report.name.bold(),
        parts.join(", ")
    );
    if merge.converted_from_link {
        println!("    converted from symlink mode");
    }
    for name in &merge.skipped {
        println!("    {} {name}: local copy kept", "=".dimmed());
    }
    for error in &merge.errors {
        println!("    {} {}: {}", "✗".red(), error.name, error.message);
    }
}
