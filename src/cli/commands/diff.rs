//! skm diff - Preview what sync would change

use clap::Args;
use colored::{ColoredString, Colorize};

use crate::app::AppContext;
use crate::cli::output::{emit_json, robot_ok};
use crate::error::{Result, SkmError};
use crate::sync::{
    DiffKind, SkillUnit, SyncEngine, Target, TargetDiff, diff_target, discover_units_with,
};
use crate::utils::fs::display_path;

#[derive(Args, Debug, Default)]
pub struct DiffArgs {
    /// Only compare this target
    #[arg(value_name = "TARGET")]
    pub target: Option<String>,
}

pub fn run(ctx: &AppContext, args: &DiffArgs) -> Result<()> {
    let source = ctx.config.source_path();
    if !source.is_dir() {
        return Err(SkmError::SourceMissing(source));
    }
    let targets: Vec<Target> = match args.target.as_deref() {
        Some(name) => vec![ctx.config.target(name)?],
        None => ctx.config.targets(),
    };
    let units: Vec<SkillUnit> = discover_units_with(&source, &ctx.config.discovery_options()?)?;
    let engine = SyncEngine::new(&source);
    let diffs = targets
        .iter()
        .map(|target| diff_target(&engine, target, &units))
        .collect::<Result<Vec<_>>>()?;

    if ctx.robot_mode {
        let in_sync = diffs.iter().all(TargetDiff::is_in_sync);
        return emit_json(&robot_ok(serde_json::json!({
            "in_sync": in_sync,
            "targets": diffs,
        })));
    }

    for diff in &diffs {
        print_diff(diff);
    }
    Ok(())
}

fn marker(kind: DiffKind) -> ColoredString {
    let symbol = kind.symbol();
    match kind {
        DiffKind::Add => symbol.green(),
        DiffKind::Update => symbol.cyan(),
        DiffKind::Prune | DiffKind::Blocked => symbol.red(),
        DiffKind::LocalCopy | DiffKind::LocalOnly => symbol.dimmed(),
    }
}

fn print_diff(diff: &TargetDiff) {
    let header = format!("{} [{}] {}", diff.target.bold(), diff.mode, display_path(&diff.path).dimmed());
    if diff.is_in_sync() {
        println!("{header}: {}", "in sync".green());
    } else {
        println!("{header}:");
    }
    for item in &diff.items {
        println!("  {} {:<24} {}", marker(item.kind), item.name, item.detail.dimmed());
    }
}
