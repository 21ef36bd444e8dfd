//! Standardized error codes for machine-parseable output.
//!
//! Error codes follow a numeric taxonomy:
//! - 1xx: Source and discovery errors
//! - 2xx: Target errors
//! - 3xx: Config errors
//! - 4xx: Link errors
//! - 9xx: Internal errors

use serde::{Deserialize, Serialize};

/// Standardized error codes for robot mode output.
///
/// Each variant maps to a numeric code (e.g., `SourceMissing` -> E101).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================
    // Source errors (1xx)
    // ========================================
    /// E101: The configured source directory does not exist
    SourceMissing,
    /// E102: Two skills flatten to the same target name
    NameCollision,

    // ========================================
    // Target errors (2xx)
    // ========================================
    /// E201: No target with that name is configured
    TargetNotFound,
    /// E202: Target link points somewhere other than the source
    TargetConflict,
    /// E203: Target holds content skm does not manage
    TargetHasFiles,
    /// E204: Target cannot be read or written
    TargetAccessDenied,
    /// E205: Migrating target content would overwrite a source entry
    MigrationCollision,
    /// E206: One or more targets failed during a multi-target sync
    SyncIncomplete,
    /// E207: One or more local skills could not be collected into the source
    CollectIncomplete,

    // ========================================
    // Config errors (3xx)
    // ========================================
    /// E301: Config file not found
    ConfigNotFound,
    /// E302: Config file has invalid syntax or values
    ConfigInvalid,
    /// E303: Unknown sync mode
    ModeInvalid,

    // ========================================
    // Link errors (4xx)
    // ========================================
    /// E401: The platform refused every directory link mechanism
    LinkUnsupported,
    /// E402: Link path was occupied when creation was attempted
    LinkAlreadyExists,

    // ========================================
    // Internal errors (9xx)
    // ========================================
    /// E901: Serialization/deserialization failed
    SerializationError,
    /// E902: IO operation failed
    IoError,
}

impl ErrorCode {
    /// Get the numeric error code (e.g., `SourceMissing` -> 101).
    #[must_use]
    pub const fn numeric(&self) -> u16 {
        match self {
            Self::SourceMissing => 101,
            Self::NameCollision => 102,

            Self::TargetNotFound => 201,
            Self::TargetConflict => 202,
            Self::TargetHasFiles => 203,
            Self::TargetAccessDenied => 204,
            Self::MigrationCollision => 205,
            Self::SyncIncomplete => 206,
            Self::CollectIncomplete => 207,

            Self::ConfigNotFound => 301,
            Self::ConfigInvalid => 302,
            Self::ModeInvalid => 303,

            Self::LinkUnsupported => 401,
            Self::LinkAlreadyExists => 402,

            Self::SerializationError => 901,
            Self::IoError => 902,
        }
    }

    /// Get the error code as a formatted string (e.g., "E101").
    #[must_use]
    pub fn code_string(&self) -> String {
        format!("E{}", self.numeric())
    }

    /// Get the default suggestion for this error code.
    #[must_use]
    pub const fn suggestion(&self) -> &'static str {
        match self {
            Self::SourceMissing => "Create the source directory or point `source` in the config at an existing one. `skm init --source <path>` sets it up",
            Self::NameCollision => "Rename one of the colliding skill directories so their flattened names differ",

            Self::TargetNotFound => "Run `skm target list` to see configured targets, or add one with `skm target add <name> <path>`",
            Self::TargetConflict => "Inspect the existing link. Run `skm sync --force` to replace it with a link to the source",
            Self::TargetHasFiles => "Move the existing content into the source first, or run `skm sync --migrate` to do it automatically",
            Self::TargetAccessDenied => "Check that the target directory exists and is writable. Run `skm doctor` for details",
            Self::MigrationCollision => "A skill with the same name already exists in the source. Rename or remove one copy, then retry",
            Self::SyncIncomplete => "Review the per-target errors above, fix them, and re-run `skm sync`. Run `skm status` to see where each target stands",
            Self::CollectIncomplete => "Review the failed skills above. Anything already moved is in the source; re-run `skm collect` after fixing the rest",

            Self::ConfigNotFound => "Run `skm init` to create a configuration, or pass --config <path>",
            Self::ConfigInvalid => "Check TOML syntax and values in the config file",
            Self::ModeInvalid => "Use `merge` (one link per skill) or `symlink` (one link for the whole directory)",

            Self::LinkUnsupported => "Enable Developer Mode or run as Administrator on Windows, or check filesystem link support",
            Self::LinkAlreadyExists => "An entry appeared at the link path during sync. Re-run `skm sync`; if it persists, please report it",

            Self::SerializationError => "The data format may be corrupted. Check the file contents for validity",
            Self::IoError => "File operation failed. Check the path exists and permissions are correct",
        }
    }

    /// Check if this error is potentially recoverable by the user.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::SourceMissing
            | Self::NameCollision
            | Self::TargetNotFound
            | Self::TargetConflict
            | Self::TargetHasFiles
            | Self::TargetAccessDenied
            | Self::MigrationCollision
            | Self::SyncIncomplete
            | Self::CollectIncomplete
            | Self::ConfigNotFound
            | Self::ConfigInvalid
            | Self::ModeInvalid
            | Self::LinkUnsupported
            | Self::IoError => true,

            // Seeing these means skm itself got something wrong
            Self::LinkAlreadyExists | Self::SerializationError => false,
        }
    }

    /// Get the error category name.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self.numeric() / 100 {
            1 => "source",
            2 => "target",
            3 => "config",
            4 => "link",
            9 => "internal",
            _ => "unknown",
        }
    }

    /// Iterate over all error codes.
    pub fn all() -> impl Iterator<Item = Self> {
        [
            Self::SourceMissing,
            Self::NameCollision,
            Self::TargetNotFound,
            Self::TargetConflict,
            Self::TargetHasFiles,
            Self::TargetAccessDenied,
            Self::MigrationCollision,
            Self::SyncIncomplete,
            Self::CollectIncomplete,
            Self::ConfigNotFound,
            Self::ConfigInvalid,
            Self::ModeInvalid,
            Self::LinkUnsupported,
            Self::LinkAlreadyExists,
            Self::SerializationError,
            Self::IoError,
        ]
        .into_iter()
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_numeric() {
        assert_eq!(ErrorCode::SourceMissing.numeric(), 101);
        assert_eq!(ErrorCode::TargetNotFound.numeric(), 201);
        assert_eq!(ErrorCode::ConfigNotFound.numeric(), 301);
        assert_eq!(ErrorCode::LinkUnsupported.numeric(), 401);
        assert_eq!(ErrorCode::SerializationError.numeric(), 901);
    }

    #[test]
    fn test_error_code_string() {
        assert_eq!(ErrorCode::SourceMissing.code_string(), "E101");
        assert_eq!(ErrorCode::TargetConflict.code_string(), "E202");
    }

    #[test]
    fn test_all_codes_have_suggestions_and_categories() {
        for code in ErrorCode::all() {
            assert!(
                !code.suggestion().is_empty(),
                "ErrorCode::{code:?} has empty suggestion"
            );
            assert_ne!(code.category(), "unknown", "ErrorCode::{code:?}");
        }
    }

    #[test]
    fn test_error_code_serialization() {
        let json = serde_json::to_string(&ErrorCode::TargetHasFiles).unwrap();
        assert_eq!(json, "\"TARGET_HAS_FILES\"");

        let deserialized: ErrorCode = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, ErrorCode::TargetHasFiles);
    }

    #[test]
    fn test_recoverable_categorization() {
        assert!(ErrorCode::TargetConflict.is_recoverable());
        assert!(ErrorCode::SourceMissing.is_recoverable());
        assert!(!ErrorCode::LinkAlreadyExists.is_recoverable());
    }

    #[test]
    fn test_all_iterator_has_no_duplicates() {
        let mut seen = std::collections::HashSet::new();
        for code in ErrorCode::all() {
            assert!(
                seen.insert(code.numeric()),
                "Duplicate numeric code: {}",
                code.numeric()
            );
        }
        assert_eq!(seen.len(), 16);
    }
}
