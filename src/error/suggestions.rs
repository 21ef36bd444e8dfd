//! Context-aware error suggestions.
//!
//! Complements the static suggestions in the `codes` module with hints that
//! name the actual paths and entries involved.

use serde_json::Value;

use super::codes::ErrorCode;

/// Generate a context-aware suggestion for an error.
///
/// Falls back to the static [`ErrorCode::suggestion`] when the context does
/// not carry enough detail.
pub fn suggest_for_error(code: ErrorCode, context: Option<&Value>) -> String {
    match code {
        ErrorCode::SourceMissing => suggest_source_missing(context),
        ErrorCode::TargetConflict => suggest_target_conflict(context),
        ErrorCode::TargetHasFiles => suggest_target_has_files(context),
        ErrorCode::MigrationCollision => suggest_migration_collision(context),
        ErrorCode::NameCollision => suggest_name_collision(context),
        ErrorCode::TargetNotFound => suggest_target_not_found(context),
        _ => code.suggestion().to_string(),
    }
}

fn context_str<'a>(context: Option<&'a Value>, key: &str) -> Option<&'a str> {
    context.and_then(|c| c.get(key)).and_then(Value::as_str)
}

fn suggest_source_missing(context: Option<&Value>) -> String {
    match context_str(context, "source") {
        Some(source) => format!(
            "Source '{source}' does not exist. Create it with `mkdir -p {source}` or run `skm init --source <path> --force`"
        ),
        None => ErrorCode::SourceMissing.suggestion().to_string(),
    }
}

fn suggest_target_conflict(context: Option<&Value>) -> String {
    match (
        context_str(context, "target"),
        context_str(context, "points_to"),
    ) {
        (Some(target), Some(points_to)) => format!(
            "{target} is a link to {points_to}. If that link is no longer needed, run `skm sync --force` to point it at the source"
        ),
        _ => ErrorCode::TargetConflict.suggestion().to_string(),
    }
}

fn suggest_target_has_files(context: Option<&Value>) -> String {
    let entries = context
        .and_then(|c| c.get("entries"))
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    if entries.is_empty() {
        return ErrorCode::TargetHasFiles.suggestion().to_string();
    }

    let shown = entries.iter().take(5).copied().collect::<Vec<_>>().join(", ");
    let more = entries.len().saturating_sub(5);
    let tail = if more > 0 {
        format!(" and {more} more")
    } else {
        String::new()
    };
    format!(
        "Existing entries ({shown}{tail}) would be hidden by the link. Run `skm sync --migrate` to move them into the source, or switch the target to merge mode"
    )
}

fn suggest_migration_collision(context: Option<&Value>) -> String {
    match context_str(context, "name") {
        Some(name) => format!(
            "'{name}' exists in both the target and the source. Compare them, keep one, then re-run `skm sync --migrate`"
        ),
        None => ErrorCode::MigrationCollision.suggestion().to_string(),
    }
}

fn suggest_name_collision(context: Option<&Value>) -> String {
    match (
        context_str(context, "flat_name"),
        context_str(context, "first"),
        context_str(context, "second"),
    ) {
        (Some(flat), Some(first), Some(second)) => format!(
            "'{first}' and '{second}' both flatten to '{flat}'. Rename one of them; avoid '__' inside directory names"
        ),
        _ => ErrorCode::NameCollision.suggestion().to_string(),
    }
}

fn suggest_target_not_found(context: Option<&Value>) -> String {
    match context_str(context, "target") {
        Some(target) => format!(
            "No target named '{target}'. Run `skm target list` to see configured targets"
        ),
        None => ErrorCode::TargetNotFound.suggestion().to_string(),
    }
}

/// Suggest configured target names close to a misspelled one.
pub fn suggest_similar_targets(
    query: &str,
    available: &[&str],
    max_suggestions: usize,
) -> Vec<String> {
    let query_lower = query.to_lowercase();
    let mut scored: Vec<_> = available
        .iter()
        .map(|s| (s, similarity_score(&query_lower, &s.to_lowercase())))
        .filter(|(_, score)| *score > 0.3)
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored
        .into_iter()
        .take(max_suggestions)
        .map(|(s, _)| (*s).to_string())
        .collect()
}

/// Jaccard similarity over character trigrams, with a prefix fallback for
/// names too short to have trigrams.
fn similarity_score(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let a_trigrams: std::collections::HashSet<_> = trigrams(a).collect();
    let b_trigrams: std::collections::HashSet<_> = trigrams(b).collect();

    if a_trigrams.is_empty() || b_trigrams.is_empty() {
        if a.starts_with(b) || b.starts_with(a) {
            return 0.8;
        }
        if a.contains(b) || b.contains(a) {
            return 0.5;
        }
        return 0.0;
    }

    let intersection = a_trigrams.intersection(&b_trigrams).count();
    let union = a_trigrams.union(&b_trigrams).count();

    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

fn trigrams(s: &str) -> impl Iterator<Item = &str> {
    (0..s.len().saturating_sub(2)).filter_map(move |i| s.get(i..i + 3))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_suggest_conflict_with_context() {
        let context = json!({ "target": "/home/u/.claude/skills", "points_to": "/old/skills" });
        let suggestion = suggest_for_error(ErrorCode::TargetConflict, Some(&context));
        assert!(suggestion.contains("/old/skills"));
        assert!(suggestion.contains("--force"));
    }

    #[test]
    fn test_suggest_has_files_truncates_long_lists() {
        let context = json!({ "entries": ["a", "b", "c", "d", "e", "f", "g"] });
        let suggestion = suggest_for_error(ErrorCode::TargetHasFiles, Some(&context));
        assert!(suggestion.contains("a, b, c, d, e"));
        assert!(suggestion.contains("and 2 more"));
        assert!(suggestion.contains("--migrate"));
    }

    #[test]
    fn test_suggest_name_collision() {
        let context = json!({
            "flat_name": "_team__ui",
            "first": "_team/ui",
            "second": "_team__ui",
        });
        let suggestion = suggest_for_error(ErrorCode::NameCollision, Some(&context));
        assert!(suggestion.contains("_team/ui"));
        assert!(suggestion.contains("'__'"));
    }

    #[test]
    fn test_fallback_to_static_suggestion() {
        let suggestion = suggest_for_error(ErrorCode::IoError, None);
        assert_eq!(suggestion, ErrorCode::IoError.suggestion());

        let suggestion = suggest_for_error(ErrorCode::TargetConflict, None);
        assert_eq!(suggestion, ErrorCode::TargetConflict.suggestion());
    }

    #[test]
    fn test_suggest_similar_targets() {
        let available = vec!["claude", "codex", "cursor", "gemini"];
        let suggestions = suggest_similar_targets("claud", &available, 3);
        assert_eq!(suggestions.first().map(String::as_str), Some("claude"));
    }

    #[test]
    fn test_similarity_score() {
        assert!(similarity_score("claude", "claude-code") > 0.3);
        assert!(similarity_score("abc", "xyz") < 0.1);
        assert!(similarity_score("codex", "codex") > 0.9);
    }
}
