//! Targets and their sync modes.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SkmError;

/// How a target mirrors the source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// The target is a real directory holding one link per skill.
    #[default]
    Merge,
    /// The target itself is a single link to the source.
    Symlink,
}

impl SyncMode {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Symlink => "symlink",
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncMode {
    type Err = SkmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "merge" => Ok(Self::Merge),
            "symlink" => Ok(Self::Symlink),
            other => Err(SkmError::InvalidMode(other.to_string())),
        }
    }
}

/// Effective mode: the target's own setting, then the global default, then
/// merge.
#[must_use]
pub fn resolve_mode(target_mode: Option<SyncMode>, global_mode: Option<SyncMode>) -> SyncMode {
    target_mode.or(global_mode).unwrap_or_default()
}

/// A configured target with its mode already resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    pub name: String,
    pub path: PathBuf,
    pub mode: SyncMode,
}

impl Target {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, mode: SyncMode) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            mode,
        }
    }
}
