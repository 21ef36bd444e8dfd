//! Error handling for skm.
//!
//! This module provides:
//! - [`SkmError`]: The main error enum for all skm operations
//! - [`ErrorCode`]: Standardized error codes for machine parsing
//! - [`StructuredError`]: Rich error type with suggestions and context
//! - Suggestion helpers for context-aware error recovery hints

mod codes;
mod suggestions;

use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use codes::ErrorCode;
pub use suggestions::{suggest_for_error, suggest_similar_targets};

/// Main error type for skm operations.
#[derive(Error, Debug)]
pub enum SkmError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Source directory does not exist: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("Cannot access target '{target}': {reason}")]
    TargetAccess { target: String, reason: String },

    #[error("Failed to create link {} -> {}: {details}", .link.display(), .source_path.display())]
    LinkUnsupported {
        link: PathBuf,
        source_path: PathBuf,
        details: String,
    },

    #[error("Conflict: {} points to {} (use --force to override)", .target.display(), .points_to.display())]
    Conflict { target: PathBuf, points_to: PathBuf },

    #[error("Path already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("Target {} has unmanaged content: {}", .target.display(), .entries.join(", "))]
    UnmanagedContent { target: PathBuf, entries: Vec<String> },

    #[error("Cannot migrate {} into source: '{name}' already exists there", .target.display())]
    MigrationCollision { target: PathBuf, name: String },

    #[error("Skill name collision: '{flat_name}' is produced by both {first} and {second}")]
    NameCollision {
        flat_name: String,
        first: String,
        second: String,
    },

    #[error("{failed} of {total} targets did not sync")]
    SyncIncomplete { failed: usize, total: usize },

    #[error("{failed} of {total} local skills were not collected")]
    CollectIncomplete { failed: usize, total: usize },

    #[error("Target not found: {0}")]
    TargetNotFound(String),

    #[error("Invalid sync mode: {0} (expected merge|symlink)")]
    InvalidMode(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Missing required config: {0}")]
    MissingConfig(String),
}

impl SkmError {
    /// Get the error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::SerializationError,
            Self::SourceMissing(_) => ErrorCode::SourceMissing,
            Self::NameCollision { .. } => ErrorCode::NameCollision,
            Self::TargetAccess { .. } => ErrorCode::TargetAccessDenied,
            Self::Conflict { .. } => ErrorCode::TargetConflict,
            Self::UnmanagedContent { .. } => ErrorCode::TargetHasFiles,
            Self::MigrationCollision { .. } => ErrorCode::MigrationCollision,
            Self::SyncIncomplete { .. } => ErrorCode::SyncIncomplete,
            Self::CollectIncomplete { .. } => ErrorCode::CollectIncomplete,
            Self::TargetNotFound(_) => ErrorCode::TargetNotFound,
            Self::InvalidMode(_) => ErrorCode::ModeInvalid,
            Self::Config(_) => ErrorCode::ConfigInvalid,
            Self::MissingConfig(_) => ErrorCode::ConfigNotFound,
            Self::LinkUnsupported { .. } => ErrorCode::LinkUnsupported,
            Self::AlreadyExists(_) => ErrorCode::LinkAlreadyExists,
        }
    }

    /// Whether this error must stop a multi-target run instead of being
    /// recorded against the target that produced it.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::SourceMissing(_) | Self::LinkUnsupported { .. })
    }

    /// Get context information for this error as JSON.
    #[must_use]
    pub fn context(&self) -> Option<Value> {
        match self {
            Self::SourceMissing(path) => {
                Some(serde_json::json!({ "source": path.display().to_string() }))
            }
            Self::TargetAccess { target, reason } => {
                Some(serde_json::json!({ "target": target, "reason": reason }))
            }
            Self::Conflict { target, points_to } => Some(serde_json::json!({
                "target": target.display().to_string(),
                "points_to": points_to.display().to_string(),
            })),
            Self::UnmanagedContent { target, entries } => Some(serde_json::json!({
                "target": target.display().to_string(),
                "entries": entries,
            })),
            Self::MigrationCollision { target, name } => Some(serde_json::json!({
                "target": target.display().to_string(),
                "name": name,
            })),
            Self::NameCollision {
                flat_name,
                first,
                second,
            } => Some(serde_json::json!({
                "flat_name": flat_name,
                "first": first,
                "second": second,
            })),
            Self::SyncIncomplete { failed, total } | Self::CollectIncomplete { failed, total } => {
                Some(serde_json::json!({ "failed": failed, "total": total }))
            }
            Self::TargetNotFound(name) => Some(serde_json::json!({ "target": name })),
            Self::LinkUnsupported { details, .. } => {
                Some(serde_json::json!({ "details": details }))
            }
            Self::MissingConfig(key) => Some(serde_json::json!({ "config_key": key })),
            _ => None,
        }
    }

    /// Convert this error to a structured error.
    #[must_use]
    pub fn to_structured(&self) -> StructuredError {
        StructuredError::from_skm_error(self)
    }
}

/// A structured error with machine-readable code, suggestion, and context.
///
/// Robot mode prints this instead of the plain message so scripts can branch
/// on the code rather than parse text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// The error code (e.g., "TARGET_CONFLICT")
    pub code: ErrorCode,

    /// The numeric error code (e.g., 202)
    pub numeric_code: u16,

    /// Human-readable error message
    pub message: String,

    /// Actionable suggestion for recovery
    pub suggestion: String,

    /// Additional context for debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,

    /// Whether this error is potentially recoverable by the user
    pub recoverable: bool,

    /// Error category (e.g., "source", "target", "config")
    pub category: String,
}

impl StructuredError {
    /// Create a new structured error.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            numeric_code: code.numeric(),
            suggestion: code.suggestion().to_string(),
            context: None,
            recoverable: code.is_recoverable(),
            category: code.category().to_string(),
            code,
            message: message.into(),
        }
    }

    /// Create a structured error from an `SkmError`.
    #[must_use]
    pub fn from_skm_error(err: &SkmError) -> Self {
        let code = err.code();
        let context = err.context();
        let suggestion = suggest_for_error(code, context.as_ref());

        Self {
            code,
            numeric_code: code.numeric(),
            message: err.to_string(),
            suggestion,
            context,
            recoverable: code.is_recoverable(),
            category: code.category().to_string(),
        }
    }

    /// Add context to this error.
    #[must_use]
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self.suggestion = suggest_for_error(self.code, self.context.as_ref());
        self
    }
}

impl std::fmt::Display for StructuredError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl From<&SkmError> for StructuredError {
    fn from(err: &SkmError) -> Self {
        Self::from_skm_error(err)
    }
}

/// Result type alias using `SkmError`.
pub type Result<T> = std::result::Result<T, SkmError>;
