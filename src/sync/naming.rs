//! Flat names for skills nested inside tracked repositories.
//!
//! A target directory is flat, so `_team/frontend/ui` in the source is
//! linked as `_team__frontend__ui` in every target.

/// Separator joining path segments of a nested skill into one flat name.
pub const NESTED_SEPARATOR: &str = "__";

/// Leading character marking a top-level source entry as a tracked repo.
pub const TRACKED_REPO_PREFIX: char = '_';

/// Convert a source-relative path into the flat name used inside targets.
///
/// Backslashes are treated as separators and leading/trailing separators are
/// dropped, so `\_team\ui\` and `_team/ui` encode identically. The source
/// root itself (`""` or `"."`) encodes to the empty string.
#[must_use]
pub fn encode(rel_path: &str) -> String {
    let normalized = rel_path.replace('\\', "/");
    let trimmed = normalized.trim_matches('/');
    if trimmed.is_empty() || trimmed == "." {
        return String::new();
    }
    trimmed
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join(NESTED_SEPARATOR)
}

/// Convert a flat name back into a `/`-separated relative path.
#[must_use]
pub fn decode(flat_name: &str) -> String {
    flat_name.replace(NESTED_SEPARATOR, "/")
}

/// True if the flat name came from a nested path.
#[must_use]
pub fn is_nested(flat_name: &str) -> bool {
    flat_name.contains(NESTED_SEPARATOR)
}

/// True if a top-level source entry is a tracked repository.
#[must_use]
pub fn is_tracked_repo_name(name: &str) -> bool {
    name.starts_with(TRACKED_REPO_PREFIX)
}

/// Hidden entries are skipped everywhere: discovery, classification, pruning.
#[must_use]
pub fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}
