//! Command handlers, one module per subcommand.

use crate::app::AppContext;
use crate::cli::Commands;
use crate::error::Result;

pub mod collect;
pub mod completions;
pub mod diff;
pub mod doctor;
pub mod init;
pub mod list;
pub mod log;
pub mod status;
pub mod sync;
pub mod target;

pub fn run(ctx: &AppContext, command: &Commands) -> Result<()> {
    match command {
        Commands::Init(args) => init::run(ctx, args),
        Commands::Sync(args) => sync::run(ctx, args),
        Commands::Collect(args) => collect::run(ctx, args),
        Commands::Status(args) => status::run(ctx, args),
        Commands::Diff(args) => diff::run(ctx, args),
        Commands::List(args) => list::run(ctx, args),
        Commands::Target(args) => target::run(ctx, args),
        Commands::Doctor(args) => doctor::run(ctx, args),
        Commands::Log(args) => log::run(ctx, args),
        Commands::Completions(args) => completions::run(args),
    }
}
