//! Per-invocation application context.

use std::path::PathBuf;

use crate::cli::Cli;
use crate::config::Config;
use crate::error::Result;
use crate::oplog::OpLog;

/// Everything a command needs: the loaded config, where it came from, and
/// the global output flags.
#[derive(Debug)]
pub struct AppContext {
    pub config_path: PathBuf,
    pub config: Config,
    pub robot_mode: bool,
    pub verbosity: u8,
    pub quiet: bool,
    pub oplog: OpLog,
}

impl AppContext {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let config_path = Config::resolve_path(cli.config.as_deref())?;
        let config = Config::load_from(&config_path)?;
        Ok(Self::new(config_path, config, cli.robot, cli.verbose, cli.quiet))
    }

    #[must_use]
    pub fn new(
        config_path: PathBuf,
        config: Config,
        robot_mode: bool,
        verbosity: u8,
        quiet: bool,
    ) -> Self {
        let oplog = OpLog::beside_config(&config_path);
        Self {
            config_path,
            config,
            robot_mode,
            verbosity,
            quiet,
            oplog,
        }
    }

    /// Config as stored on disk, without environment overrides. Use this
    /// before modifying and saving.
    pub fn config_on_disk(&self) -> Result<Config> {
        Config::load_without_overrides(&self.config_path)
    }
}
