pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod oplog;
pub mod sync;
pub mod test_utils;
pub mod utils;

pub use error::{Result, SkmError};

/// Package version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
