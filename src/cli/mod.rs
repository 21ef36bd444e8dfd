//! CLI module - Command-line interface definitions and handlers
//!
//! Uses clap v4 with derive macros for argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod commands;
pub mod output;

/// Skill Mirror - keep AI CLI skill directories linked to one source
#[derive(Parser, Debug)]
#[command(name = "skm")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable JSON output for machine consumption
    #[arg(long, global = true)]
    pub robot: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file path (default: ~/.config/skm/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a config, the source directory, and detect known targets
    Init(commands::init::InitArgs),

    /// Link skills from the source into targets
    Sync(commands::sync::SyncArgs),

    /// Move local skills from targets into the source and link them back
    Collect(commands::collect::CollectArgs),

    /// Show the source and the state of every target
    Status(commands::status::StatusArgs),

    /// Show what sync would change, without changing anything
    Diff(commands::diff::DiffArgs),

    /// List skills discovered in the source
    List(commands::list::ListArgs),

    /// Manage configured targets
    Target(commands::target::TargetArgs),

    /// Check the source, targets, and link support for problems
    Doctor(commands::doctor::DoctorArgs),

    /// Show recent operations
    Log(commands::log::LogArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}
