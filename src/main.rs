//! skm - Skill Mirror
//!
//! Keep one canonical skills directory linked into every AI CLI.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use skm::Result;
use skm::SkmError;
use skm::app::AppContext;
use skm::cli::output::{emit_robot, robot_error_structured};
use skm::cli::{Cli, Commands};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.robot {
                // Sync and collect already printed their partial report as the single JSON payload
                if !matches!(
                    e,
                    SkmError::SyncIncomplete { .. } | SkmError::CollectIncomplete { .. }
                ) {
                    if let Err(emit_err) = emit_robot(&robot_error_structured(&e)) {
                        eprintln!("Error: {e} ({emit_err})");
                    }
                }
            } else {
                eprintln!("Error: {e}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Init(args) => {
            skm::cli::commands::init::run_without_context(cli.robot, cli.config.as_deref(), args)
        }
        Commands::Completions(args) => skm::cli::commands::completions::run(args),
        command => {
            let ctx = AppContext::from_cli(cli)?;
            skm::cli::commands::run(&ctx, command)
        }
    }
}

fn init_tracing(cli: &Cli) {
    if cli.quiet {
        return;
    }

    let filter = match cli.verbose {
        0 => "warn,skm=info",
        1 => "info,skm=debug",
        2 => "debug,skm=trace",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    if cli.robot {
        // JSON logging for robot mode
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
