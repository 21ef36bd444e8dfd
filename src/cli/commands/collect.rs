//! skm collect - Move local skills from targets into the source

use std::time::Instant;

use clap::Args;
use colored::Colorize;
use tracing::warn;

use crate::app::AppContext;
use crate::cli::output::{emit_json, robot_ok, robot_partial};
use crate::error::{Result, SkmError};
use crate::oplog::{OpEntry, OpStatus};
use crate::sync::{
    CollectOptions, CollectReport, LocalSkill, SyncEngine, Target, discover_units_with,
    find_local_skills,
};
use crate::utils::fs::display_path;

#[derive(Args, Debug, Default)]
pub struct CollectArgs {
    /// Collect from this target
    #[arg(value_name = "TARGET")]
    pub target: Option<String>,

    /// Collect from every configured target
    #[arg(long, conflicts_with = "target")]
    pub all: bool,

    /// Show what would be collected without moving anything
    #[arg(long, short = 'n')]
    pub dry_run: bool,

    /// Replace source entries that have the same name
    #[arg(long, short)]
    pub force: bool,
}

impl CollectArgs {
    fn log_args(&self, report: &CollectReport) -> serde_json::Value {
        serde_json::json!({
            "target": self.target,
            "all": self.all,
            "force": self.force,
            "collected": report.collected.iter().map(|s| format!("{}/{}", s.target, s.name)).collect::<Vec<_>>(),
            "skipped": report.skipped.len(),
            "failed": report.failed.len(),
        })
    }
}

/// Targets to collect from: the named one, or all of them with `--all`.
/// A lone configured target needs neither.
fn select_targets(ctx: &AppContext, args: &CollectArgs) -> Result<Vec<Target>> {
    if let Some(name) = args.target.as_deref() {
        return Ok(vec![ctx.config.target(name)?]);
    }
    let targets = ctx.config.targets();
    if args.all || targets.len() <= 1 {
        return Ok(targets);
    }
    let names: Vec<String> = targets.iter().map(|t| t.name.clone()).collect();
    Err(SkmError::Config(format!(
        "name a target to collect from or pass --all (configured: {})",
        names.join(", ")
    )))
}

pub fn run(ctx: &AppContext, args: &CollectArgs) -> Result<()> {
    let started = Instant::now();
    let source = ctx.config.source_path();
    if !source.is_dir() {
        return Err(SkmError::SourceMissing(source));
    }
    let targets = select_targets(ctx, args)?;
    let units = discover_units_with(&source, &ctx.config.discovery_options()?)?;

    let mut locals: Vec<LocalSkill> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();
    for target in &targets {
        match find_local_skills(target, &source, &units) {
            Ok(found) => locals.extend(found),
            Err(err) => {
                warn!(target = %target.name, error = %err, "cannot scan target");
                warnings.push(format!("{}: {err}", target.name));
            }
        }
    }

    let engine = SyncEngine::new(&source);
    let options = CollectOptions {
        dry_run: args.dry_run,
        force: args.force,
    };
    let report = match engine.collect(&locals, options) {
        Ok(report) => report,
        Err(err) => {
            ctx.oplog.record(
                &OpEntry::new("collect", OpStatus::Error, started.elapsed())
                    .with_message(err.to_string()),
            );
            return Err(err);
        }
    };

    let failed = report.failed.len();
    let completed = report.collected.len();
    if !args.dry_run && (completed > 0 || failed > 0) {
        let status = match (failed, completed) {
            (0, _) => OpStatus::Ok,
            (_, 0) => OpStatus::Error,
            _ => OpStatus::Partial,
        };
        let mut entry =
            OpEntry::new("collect", status, started.elapsed()).with_args(args.log_args(&report));
        if failed > 0 {
            entry = entry.with_message(format!("{failed} local skills not collected"));
        }
        ctx.oplog.record(&entry);
    }

    if ctx.robot_mode {
        let data = serde_json::json!({
            "source": source.display().to_string(),
            "report": report,
        });
        if failed == 0 {
            emit_json(&robot_ok(data).with_warnings(warnings))?;
        } else {
            emit_json(&robot_partial(data, completed, failed).with_warnings(warnings))?;
        }
    } else if !ctx.quiet {
        for warning in &warnings {
            println!("{} {warning}", "!".yellow());
        }
        print_report(&report, &source);
    }

    if failed > 0 {
        return Err(SkmError::CollectIncomplete {
            failed,
            total: completed + failed,
        });
    }
    Ok(())
}

fn print_report(report: &CollectReport, source: &std::path::Path) {
    if report.collected.is_empty() && report.skipped.is_empty() && report.failed.is_empty() {
        println!("{} No local skills to collect", "·".dimmed());
        return;
    }
    if report.dry_run {
        println!("{}", "Dry run: nothing will be changed".yellow());
        println!();
    }
    let verb = if report.dry_run { "would collect" } else { "collected" };
    for skill in &report.collected {
        println!(
            "{} {}/{}: {verb} into {}",
            "✓".green(),
            skill.target.bold(),
            skill.name,
            display_path(&source.join(&skill.name))
        );
    }
    for skip in &report.skipped {
        println!("{} {}: {}", "=".dimmed(), skip.name, skip.message.dimmed());
    }
    for error in &report.failed {
        println!("{} {}: {}", "✗".red(), error.name, error.message);
    }
}
