//! Append-only operation log (`operations.jsonl` next to the config file).

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::Result;
use crate::utils::fs::{ensure_dir, read_optional};

pub const OPS_FILE: &str = "operations.jsonl";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpStatus {
    Ok,
    Partial,
    Error,
}

impl OpStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Partial => "partial",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpEntry {
    pub timestamp: DateTime<Utc>,
    pub command: String,
    pub status: OpStatus,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub args: Value,
}

impl OpEntry {
    pub fn new(command: impl Into<String>, status: OpStatus, duration: Duration) -> Self {
        Self {
            timestamp: Utc::now(),
            command: command.into(),
            status,
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            message: None,
            args: Value::Null,
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn with_args(mut self, args: Value) -> Self {
        self.args = args;
        self
    }
}

#[derive(Debug, Clone)]
pub struct OpLog {
    path: PathBuf,
}

impl OpLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Log stored beside the given config file.
    #[must_use]
    pub fn beside_config(config_path: &Path) -> Self {
        let dir = config_path.parent().unwrap_or_else(|| Path::new("."));
        Self::new(dir.join(OPS_FILE))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, entry: &OpEntry) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            ensure_dir(parent)?;
        }
        let line = serde_json::to_string(entry)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    /// Append, logging instead of failing. Commands call this so a full disk
    /// or read-only config directory never changes their outcome.
    pub fn record(&self, entry: &OpEntry) {
        if let Err(err) = self.append(entry) {
            warn!(path = %self.path.display(), error = %err, "could not write operation log");
        }
    }

    /// Newest entries first. Lines that do not parse are skipped.
    pub fn read_recent(&self, limit: usize) -> Result<Vec<OpEntry>> {
        let Some(raw) = read_optional(&self.path)? else {
            return Ok(Vec::new());
        };
        let mut entries: Vec<OpEntry> = raw
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect();
        entries.reverse();
        entries.truncate(limit);
        Ok(entries)
    }
}
