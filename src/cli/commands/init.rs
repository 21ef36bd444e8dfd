//! skm init - Create the config file and source directory

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tracing::info;

use crate::app::AppContext;
use crate::cli::output::{emit_json, robot_ok};
use crate::config::{Config, default_targets};
use crate::error::{Result, SkmError};
use crate::oplog::{OpEntry, OpLog, OpStatus};
use crate::sync::SyncMode;
use crate::utils::fs::{display_path, ensure_dir, expand_tilde};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Source directory holding the skills (default: ~/.config/skm/skills)
    #[arg(long)]
    pub source: Option<String>,

    /// Global sync mode (merge or symlink)
    #[arg(long)]
    pub mode: Option<SyncMode>,

    /// Overwrite an existing config
    #[arg(long, short)]
    pub force: bool,
}

/// A known target location and whether it is usable on this machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectedTarget {
    pub name: String,
    pub path: PathBuf,
    /// The skills directory already exists. Otherwise only its parent does.
    pub found: bool,
}

impl DetectedTarget {
    fn label(&self) -> &'static str {
        if self.found { "found" } else { "available" }
    }
}

/// Keep candidates whose directory exists, or whose parent does (the CLI is
/// installed but has no skills yet).
#[must_use]
pub fn detect_targets(candidates: Vec<(String, PathBuf)>) -> Vec<DetectedTarget> {
    candidates
        .into_iter()
        .filter_map(|(name, path)| {
            if path.is_dir() {
                Some(DetectedTarget { name, path, found: true })
            } else if path.parent().is_some_and(Path::is_dir) {
                Some(DetectedTarget { name, path, found: false })
            } else {
                None
            }
        })
        .collect()
}

pub fn run(ctx: &AppContext, args: &InitArgs) -> Result<()> {
    run_without_context(ctx.robot_mode, Some(&ctx.config_path), args)
}

/// `init` runs before any config exists, so it cannot build an `AppContext`.
pub fn run_without_context(robot_mode: bool, config: Option<&Path>, args: &InitArgs) -> Result<()> {
    let started = Instant::now();
    let config_path = Config::resolve_path(config)?;
    if config_path.exists() && !args.force {
        return Err(SkmError::Config(format!(
            "already initialized at {} (use --force to overwrite)",
            config_path.display()
        )));
    }

    let source = match args.source.as_deref() {
        Some(raw) => expand_tilde(raw),
        None => Config::default_source()?,
    };
    let source_created = !source.is_dir();
    ensure_dir(&source)?;

    let detected = detect_targets(default_targets());
    let mut config = Config::new(display_path(&source), args.mode);
    for target in &detected {
        config.add_target(&target.name, display_path(&target.path), None)?;
    }
    config.save(&config_path)?;
    info!(config = %config_path.display(), targets = detected.len(), "initialized");

    OpLog::beside_config(&config_path).record(
        &OpEntry::new("init", OpStatus::Ok, started.elapsed()).with_args(serde_json::json!({
            "source": source.display().to_string(),
            "targets": detected.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
        })),
    );

    if robot_mode {
        return emit_json(&robot_ok(serde_json::json!({
            "config": config_path.display().to_string(),
            "source": source.display().to_string(),
            "source_created": source_created,
            "mode": args.mode,
            "targets": detected,
        })));
    }

    println!("{} Wrote {}", "✓".green(), display_path(&config_path));
    if source_created {
        println!("{} Created source {}", "✓".green(), display_path(&source));
    } else {
        println!("{} Using source {}", "✓".green(), display_path(&source));
    }
    if detected.is_empty() {
        println!(
            "{} No known targets detected. Add one with `skm target add <name> <path>`",
            "!".yellow()
        );
    } else {
        println!();
        println!("Targets:");
        for target in &detected {
            println!(
                "  {:<10} {} ({})",
                target.name,
                display_path(&target.path),
                target.label().dimmed()
            );
        }
    }
    println!();
    println!("Next: put skills in the source, then run `skm sync`");
    Ok(())
}
