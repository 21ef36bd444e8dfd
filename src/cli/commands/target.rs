//! skm target - Manage configured targets

use std::time::Instant;

use clap::{Args, Subcommand};
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::output::{emit_json, robot_ok};
use crate::error::Result;
use crate::oplog::{OpEntry, OpStatus};
use crate::sync::SyncMode;
use crate::utils::fs::{display_path, expand_tilde};

#[derive(Args, Debug)]
pub struct TargetArgs {
    #[command(subcommand)]
    pub command: TargetCommand,
}

#[derive(Subcommand, Debug)]
pub enum TargetCommand {
    /// Add a target directory
    Add(AddArgs),
    /// Remove a target from the config (files on disk are left alone)
    Remove(RemoveArgs),
    /// List configured targets
    List,
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Target name
    pub name: String,
    /// Skills directory of the AI CLI
    pub path: String,
    /// Sync mode for this target (default: the global mode)
    #[arg(long)]
    pub mode: Option<SyncMode>,
}

#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Target name
    pub name: String,
}

pub fn run(ctx: &AppContext, args: &TargetArgs) -> Result<()> {
    match &args.command {
        TargetCommand::Add(add) => run_add(ctx, add),
        TargetCommand::Remove(remove) => run_remove(ctx, remove),
        TargetCommand::List => run_list(ctx),
    }
}

fn run_add(ctx: &AppContext, args: &AddArgs) -> Result<()> {
    let started = Instant::now();
    let mut config = ctx.config_on_disk()?;
    let path = display_path(&expand_tilde(&args.path));
    config.add_target(&args.name, path.clone(), args.mode)?;
    config.save(&ctx.config_path)?;
    let mode = config.resolve_mode(&config.targets[&args.name]);

    ctx.oplog.record(
        &OpEntry::new("target add", OpStatus::Ok, started.elapsed()).with_args(serde_json::json!({
            "name": args.name,
            "path": path,
            "mode": args.mode,
        })),
    );

    if ctx.robot_mode {
        return emit_json(&robot_ok(serde_json::json!({
            "name": args.name,
            "path": path,
            "mode": mode,
        })));
    }
    println!("{} Added target {} ({path}, {mode})", "✓".green(), args.name.bold());
    println!("  Run `skm sync {}` to link it", args.name);
    Ok(())
}

fn run_remove(ctx: &AppContext, args: &RemoveArgs) -> Result<()> {
    let started = Instant::now();
    let mut config = ctx.config_on_disk()?;
    let removed = config.remove_target(&args.name)?;
    config.save(&ctx.config_path)?;

    ctx.oplog.record(
        &OpEntry::new("target remove", OpStatus::Ok, started.elapsed())
            .with_args(serde_json::json!({ "name": args.name, "path": removed.path })),
    );

    if ctx.robot_mode {
        return emit_json(&robot_ok(serde_json::json!({
            "name": args.name,
            "path": removed.path,
        })));
    }
    println!("{} Removed target {}", "✓".green(), args.name.bold());
    println!(
        "  {}",
        format!("Links under {} were left in place", removed.path).dimmed()
    );
    Ok(())
}

fn run_list(ctx: &AppContext) -> Result<()> {
    let targets = ctx.config.targets();
    if ctx.robot_mode {
        return emit_json(&robot_ok(serde_json::json!({ "targets": targets })));
    }
    if targets.is_empty() {
        println!("{} No targets configured", "!".yellow());
        return Ok(());
    }
    for target in &targets {
        println!(
            "{:<10} {:<8} {}",
            target.name,
            target.mode.as_str(),
            display_path(&target.path)
        );
    }
    Ok(())
}
