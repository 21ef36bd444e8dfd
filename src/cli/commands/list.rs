//! skm list - List skills discovered in the source

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::output::{emit_json, robot_ok};
use crate::error::Result;
use crate::sync::{discover_units_with, tracked_repos};
use crate::utils::fs::display_path;

#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Show each skill's path in the source
    #[arg(long)]
    pub verbose: bool,
}

pub fn run(ctx: &AppContext, args: &ListArgs) -> Result<()> {
    let source = ctx.config.source_path();
    let units = discover_units_with(&source, &ctx.config.discovery_options()?)?;
    let repos = tracked_repos(&source)?;

    if ctx.robot_mode {
        return emit_json(&robot_ok(serde_json::json!({
            "source": source.display().to_string(),
            "count": units.len(),
            "skills": units,
            "tracked_repos": repos,
        })));
    }

    if units.is_empty() {
        println!(
            "{} No skills in {}",
            "!".yellow(),
            display_path(&source)
        );
        return Ok(());
    }

    println!(
        "{} skills in {}",
        units.len().to_string().bold(),
        display_path(&source)
    );
    println!();
    for unit in &units {
        let mut line = format!("  {}", unit.flat_name);
        if let Some(repo) = unit.repo_name() {
            line.push_str(&format!(" {}", format!("({repo})").dimmed()));
        }
        if args.verbose {
            line.push_str(&format!("  {}", display_path(&unit.source_path).dimmed()));
        }
        println!("{line}");
    }

    if !repos.is_empty() {
        println!();
        println!("Tracked repos:");
        for repo in &repos {
            let count = units
                .iter()
                .filter(|unit| unit.repo_name() == Some(repo.as_str()))
                .count();
            println!("  {repo} ({count} skills)");
        }
    }
    Ok(())
}
