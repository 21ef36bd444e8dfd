//! skm status - Show the source and where each target stands

use std::path::{Path, PathBuf};

use clap::Args;
use colored::{ColoredString, Colorize};
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_json, robot_ok};
use crate::error::Result;
use crate::sync::{SyncMode, Target, TargetStatus, classify_merge, classify_whole, discover_units_with};
use crate::utils::fs::display_path;

#[derive(Args, Debug, Default)]
pub struct StatusArgs {}

#[derive(Debug, Clone, Serialize)]
pub struct SourceSummary {
    pub path: PathBuf,
    pub exists: bool,
    pub skills: Option<usize>,
    pub tracked: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TargetState {
    pub name: String,
    pub path: PathBuf,
    pub mode: SyncMode,
    pub status: TargetStatus,
    /// Managed links inside a merge-mode directory.
    pub linked: usize,
    /// Local real directories inside a merge-mode directory.
    pub local: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl TargetState {
    fn detail(&self) -> String {
        match (self.mode, self.status) {
            (SyncMode::Merge, TargetStatus::Merged | TargetStatus::HasFiles) => {
                format!("{} ({} shared, {} local)", self.status, self.linked, self.local)
            }
            _ => self.status.to_string(),
        }
    }
}

/// Classify one target the way its configured mode sees it.
#[must_use]
pub fn target_state(target: &Target, source: &Path) -> TargetState {
    let (status, linked, local) = match target.mode {
        SyncMode::Symlink => (classify_whole(&target.path, source), 0, 0),
        SyncMode::Merge => {
            let merge = classify_merge(&target.path, source);
            (merge.status, merge.linked, merge.local)
        }
    };
    TargetState {
        name: target.name.clone(),
        path: target.path.clone(),
        mode: target.mode,
        status,
        linked,
        local,
        hint: hint_for(target.mode, status).map(str::to_string),
    }
}

fn hint_for(mode: SyncMode, status: TargetStatus) -> Option<&'static str> {
    match (mode, status) {
        (SyncMode::Symlink, TargetStatus::Linked) | (SyncMode::Merge, TargetStatus::Merged) => None,
        (SyncMode::Symlink, TargetStatus::Merged) => {
            Some("needs sync: laid out for merge mode, configured for symlink")
        }
        (SyncMode::Merge, TargetStatus::Linked) => {
            Some("needs sync: a whole-directory link, configured for merge")
        }
        (_, TargetStatus::NotExist) => Some("run `skm sync` to create it"),
        (SyncMode::Symlink, TargetStatus::HasFiles) => {
            Some("holds unmanaged files; `skm sync --migrate` moves them into the source")
        }
        (SyncMode::Merge, TargetStatus::HasFiles) => Some("no skills linked yet; run `skm sync`"),
        (_, TargetStatus::Conflict) => Some("links elsewhere; `skm sync --force` replaces it"),
        (SyncMode::Symlink, TargetStatus::Broken) => Some("broken; run `skm sync` to repair"),
        (SyncMode::Merge, TargetStatus::Broken) => {
            Some("not a directory; remove it or run `skm sync --force`")
        }
    }
}

fn source_summary(ctx: &AppContext) -> SourceSummary {
    let path = ctx.config.source_path();
    let exists = path.is_dir();
    if !exists {
        return SourceSummary {
            path,
            exists,
            skills: None,
            tracked: None,
            error: None,
        };
    }
    let discovered = ctx
        .config
        .discovery_options()
        .and_then(|options| discover_units_with(&path, &options));
    match discovered {
        Ok(units) => SourceSummary {
            skills: Some(units.len()),
            tracked: Some(units.iter().filter(|u| u.from_tracked_repo).count()),
            path,
            exists,
            error: None,
        },
        Err(err) => SourceSummary {
            path,
            exists,
            skills: None,
            tracked: None,
            error: Some(err.to_string()),
        },
    }
}

fn styled_status(status: TargetStatus, label: String) -> ColoredString {
    match status {
        TargetStatus::Linked | TargetStatus::Merged => label.green(),
        TargetStatus::NotExist | TargetStatus::HasFiles => label.yellow(),
        TargetStatus::Broken | TargetStatus::Conflict => label.red(),
    }
}

pub fn run(ctx: &AppContext, _args: &StatusArgs) -> Result<()> {
    let source = source_summary(ctx);
    let states: Vec<TargetState> = ctx
        .config
        .targets()
        .iter()
        .map(|target| target_state(target, &source.path))
        .collect();

    if ctx.robot_mode {
        return emit_json(&robot_ok(serde_json::json!({
            "config": ctx.config_path.display().to_string(),
            "source": source,
            "targets": states,
        })));
    }

    let mut layout = HumanLayout::new();
    layout.title("skm status");
    layout.kv("Config", &display_path(&ctx.config_path));
    layout.kv("Source", &display_path(&source.path));
    let skills = match (&source.error, source.skills, source.exists) {
        (Some(err), _, _) => err.red().to_string(),
        (None, Some(count), _) => format!(
            "{count} ({} from tracked repos)",
            source.tracked.unwrap_or_default()
        ),
        (None, None, false) => "source directory missing".red().to_string(),
        (None, None, true) => "-".to_string(),
    };
    layout.kv("Skills", &skills);
    layout.blank();

    if states.is_empty() {
        layout.push_line("No targets configured. Add one with `skm target add <name> <path>`");
    } else {
        layout.section("Targets");
        for state in &states {
            layout.push_line(format!(
                "{:<10} {:<8} {}  {}",
                state.name,
                state.mode.as_str(),
                styled_status(state.status, state.detail()),
                display_path(&state.path).dimmed()
            ));
            if let Some(hint) = &state.hint {
                layout.push_line(format!("{:<19} {}", "", hint.dimmed()));
            }
        }
    }
    emit_human(layout);
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::test_utils::fixtures::SyncFixture;

    #[test]
    fn merge_target_counts_shared_and_local() {
        let fx = SyncFixture::new();
        fx.create_skill("a");
        let dir = fx.create_target_dir("codex");
        fx.symlink(&fx.source.join("a"), &dir.join("a"));
        fx.create_local_dir(&dir, "mine");

        let state = target_state(&Target::new("codex", &dir, SyncMode::Merge), &fx.source);

        assert_eq!(state.status, TargetStatus::Merged);
        assert_eq!((state.linked, state.local), (1, 1));
        assert_eq!(state.detail(), "merged (1 shared, 1 local)");
        assert!(state.hint.is_none());
    }

    #[test]
    fn mode_mismatch_needs_sync() {
        let fx = SyncFixture::new();
        let whole = fx.target_path("claude");
        fx.symlink(&fx.source, &whole);

        let as_merge = target_state(&Target::new("claude", &whole, SyncMode::Merge), &fx.source);
        let as_symlink =
            target_state(&Target::new("claude", &whole, SyncMode::Symlink), &fx.source);

        assert_eq!(as_merge.status, TargetStatus::Linked);
        assert!(as_merge.hint.unwrap().starts_with("needs sync"));
        assert!(as_symlink.hint.is_none());
    }

    #[test]
    fn missing_target_suggests_sync() {
        let fx = SyncFixture::new();
        let state = target_state(
            &Target::new("gemini", fx.target_path("gemini"), SyncMode::Symlink),
            &fx.source,
        );

        assert_eq!(state.status, TargetStatus::NotExist);
        assert!(state.hint.unwrap().contains("skm sync"));
    }
}
