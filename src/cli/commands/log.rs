//! skm log - Show recent operations

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::output::{emit_json, robot_ok};
use crate::error::Result;
use crate::oplog::OpStatus;

#[derive(Args, Debug)]
pub struct LogArgs {
    /// Number of entries to show
    #[arg(long, short = 'n', default_value_t = 20)]
    pub limit: usize,
}

pub fn run(ctx: &AppContext, args: &LogArgs) -> Result<()> {
    let entries = ctx.oplog.read_recent(args.limit)?;

    if ctx.robot_mode {
        return emit_json(&robot_ok(serde_json::json!({
            "path": ctx.oplog.path().display().to_string(),
            "entries": entries,
        })));
    }

    if entries.is_empty() {
        println!("No operations recorded yet");
        return Ok(());
    }
    for entry in &entries {
        let padded = format!("{:<8}", entry.status.as_str());
        let status = match entry.status {
            OpStatus::Ok => padded.green(),
            OpStatus::Partial => padded.yellow(),
            OpStatus::Error => padded.red(),
        };
        let mut line = format!(
            "{}  {:<14} {} {:>6}ms",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.command,
            status,
            entry.duration_ms
        );
        if let Some(message) = &entry.message {
            line.push_str(&format!("  {}", message.dimmed()));
        }
        println!("{line}");
    }
    Ok(())
}
