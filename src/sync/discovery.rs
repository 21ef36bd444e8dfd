//! Skill discovery.
//!
//! Ordinary top-level directories are one skill each and are never recursed
//! into. Top-level directories named with the tracked-repo prefix are walked
//! to any depth and every directory inside becomes its own skill, flattened
//! with [`naming::encode`].

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use serde::Serialize;
use tracing::debug;
use walkdir::WalkDir;

use super::link::fold_case;
use super::naming;
use crate::error::{Result, SkmError};

/// One syncable skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkillUnit {
    /// Name used inside targets.
    pub flat_name: String,
    /// `/`-separated path under the source root.
    pub rel_path: String,
    /// Absolute path of the skill directory.
    pub source_path: PathBuf,
    pub from_tracked_repo: bool,
}

impl SkillUnit {
    /// Tracked repository this skill lives in, if any.
    #[must_use]
    pub fn repo_name(&self) -> Option<&str> {
        if !self.from_tracked_repo {
            return None;
        }
        self.rel_path.split('/').next()
    }
}

#[derive(Debug, Clone, Default)]
pub struct DiscoveryOptions {
    /// Glob patterns matched against each skill's relative path. A matching
    /// directory inside a tracked repo is skipped along with its subtree.
    pub ignore: Vec<Pattern>,
}

impl DiscoveryOptions {
    /// Compile ignore patterns from config strings.
    pub fn from_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let ignore = patterns
            .iter()
            .map(|raw| {
                Pattern::new(raw.as_ref()).map_err(|err| {
                    SkmError::Config(format!("invalid ignore pattern '{}': {err}", raw.as_ref()))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { ignore })
    }

    fn is_ignored(&self, rel_path: &str) -> bool {
        let options = MatchOptions {
            require_literal_separator: true,
            ..MatchOptions::new()
        };
        self.ignore
            .iter()
            .any(|pattern| pattern.matches_with(rel_path, options))
    }
}

/// Discover every skill under `root`.
pub fn discover_units(root: &Path) -> Result<Vec<SkillUnit>> {
    discover_units_with(root, &DiscoveryOptions::default())
}

/// Discover skills, applying ignore patterns.
///
/// Failing to read `root` is fatal (`SourceMissing` when it does not exist).
/// Unreadable entries below the root are skipped. Two skills that flatten to
/// the same name are a `NameCollision`. The result is sorted by flat name.
pub fn discover_units_with(root: &Path, options: &DiscoveryOptions) -> Result<Vec<SkillUnit>> {
    let entries = read_root(root)?;
    let mut units = UnitSet::default();

    for (name, path) in entries {
        if naming::is_hidden(&name) || options.is_ignored(&name) {
            continue;
        }
        // Top-level entries follow links so a linked-in skill directory counts.
        if !path.is_dir() {
            continue;
        }

        if naming::is_tracked_repo_name(&name) {
            walk_tracked_repo(root, &path, options, &mut units)?;
        } else {
            units.insert(SkillUnit {
                flat_name: name.clone(),
                rel_path: name,
                source_path: path,
                from_tracked_repo: false,
            })?;
        }
    }

    Ok(units.into_sorted())
}

/// Names of tracked repositories at the top of `root`, sorted.
pub fn tracked_repos(root: &Path) -> Result<Vec<String>> {
    let mut repos: Vec<String> = read_root(root)?
        .into_iter()
        .filter(|(name, path)| naming::is_tracked_repo_name(name) && path.is_dir())
        .map(|(name, _)| name)
        .collect();
    repos.sort();
    Ok(repos)
}

fn read_root(root: &Path) -> Result<Vec<(String, PathBuf)>> {
    let read = match fs::read_dir(root) {
        Ok(read) => read,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(SkmError::SourceMissing(root.to_path_buf()));
        }
        Err(err) => return Err(err.into()),
    };

    let mut entries = Vec::new();
    for entry in read {
        match entry {
            Ok(entry) => {
                let name = entry.file_name().to_string_lossy().into_owned();
                entries.push((name, entry.path()));
            }
            Err(err) => debug!(root = %root.display(), error = %err, "skipping unreadable entry"),
        }
    }
    Ok(entries)
}

fn walk_tracked_repo(
    root: &Path,
    repo: &Path,
    options: &DiscoveryOptions,
    units: &mut UnitSet,
) -> Result<()> {
    let mut walker = WalkDir::new(repo).min_depth(1).follow_links(false).into_iter();

    while let Some(next) = walker.next() {
        let entry = match next {
            Ok(entry) => entry,
            Err(err) => {
                debug!(repo = %repo.display(), error = %err, "skipping unreadable path");
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        let Some(rel_path) = relative_slash_path(root, entry.path()) else {
            continue;
        };
        if naming::is_hidden(&name) || options.is_ignored(&rel_path) {
            walker.skip_current_dir();
            continue;
        }

        units.insert(SkillUnit {
            flat_name: naming::encode(&rel_path),
            rel_path,
            source_path: entry.path().to_path_buf(),
            from_tracked_repo: true,
        })?;
    }
    Ok(())
}

fn relative_slash_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Units keyed by flat name under the platform case policy.
#[derive(Default)]
struct UnitSet {
    by_key: BTreeMap<String, SkillUnit>,
}

impl UnitSet {
    fn insert(&mut self, unit: SkillUnit) -> Result<()> {
        let key = fold_case(&unit.flat_name);
        if let Some(existing) = self.by_key.get(&key) {
            return Err(SkmError::NameCollision {
                flat_name: unit.flat_name,
                first: existing.rel_path.clone(),
                second: unit.rel_path,
            });
        }
        self.by_key.insert(key, unit);
        Ok(())
    }

    fn into_sorted(self) -> Vec<SkillUnit> {
        let mut units: Vec<SkillUnit> = self.by_key.into_values().collect();
        units.sort_by(|a, b| a.flat_name.cmp(&b.flat_name));
        units
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures::SyncFixture;

    fn names(units: &[SkillUnit]) -> Vec<&str> {
        units.iter().map(|u| u.flat_name.as_str()).collect()
    }

    #[test]
    fn flat_skills_are_not_recursed() {
        let fx = SyncFixture::new();
        fx.create_skill("alpha");
        fx.create_skill("beta");
        std::fs::create_dir_all(fx.source.join("alpha/nested/deeper")).unwrap();

        let units = discover_units(&fx.source).unwrap();

        assert_eq!(names(&units), vec!["alpha", "beta"]);
        assert!(units.iter().all(|u| !u.from_tracked_repo));
        assert_eq!(units[0].source_path, fx.source.join("alpha"));
    }

    #[test]
    fn tracked_repo_directories_flatten_at_every_depth() {
        let fx = SyncFixture::new();
        fx.create_tracked_skill("_team/frontend/ui");
        fx.create_tracked_skill("_team/backend");

        let units = discover_units(&fx.source).unwrap();

        assert_eq!(
            names(&units),
            vec![
                "_team__backend",
                "_team__frontend",
                "_team__frontend__ui"
            ]
        );
        let ui = units.iter().find(|u| u.flat_name == "_team__frontend__ui").unwrap();
        assert_eq!(ui.rel_path, "_team/frontend/ui");
        assert_eq!(ui.repo_name(), Some("_team"));
        assert!(units.iter().all(|u| u.flat_name != "_team"));
    }

    #[test]
    fn hidden_entries_are_skipped_at_every_level() {
        let fx = SyncFixture::new();
        fx.create_skill("visible");
        fx.create_skill(".hidden");
        fx.create_tracked_skill("_repo/.git/objects");
        fx.create_tracked_skill("_repo/skill");

        let units = discover_units(&fx.source).unwrap();

        assert_eq!(names(&units), vec!["_repo__skill", "visible"]);
    }

    #[test]
    fn plain_files_are_not_skills() {
        let fx = SyncFixture::new();
        fx.create_skill("alpha");
        std::fs::write(fx.source.join("README.md"), "notes").unwrap();
        std::fs::write(fx.source.join("_repo"), "not a dir").unwrap();

        let units = discover_units(&fx.source).unwrap();

        assert_eq!(names(&units), vec!["alpha"]);
    }

    #[test]
    fn missing_root_is_source_missing() {
        let fx = SyncFixture::new();
        let err = discover_units(&fx.root().join("nope")).unwrap_err();
        assert!(matches!(err, SkmError::SourceMissing(_)));
    }

    #[test]
    fn separator_inside_directory_name_collides() {
        let fx = SyncFixture::new();
        fx.create_tracked_skill("_team/a/b");
        fx.create_tracked_skill("_team/a__b");

        let err = discover_units(&fx.source).unwrap_err();

        match err {
            SkmError::NameCollision { flat_name, .. } => assert_eq!(flat_name, "_team__a__b"),
            other => panic!("expected NameCollision, got {other:?}"),
        }
    }

    #[test]
    fn ignore_patterns_skip_units_and_subtrees() {
        let fx = SyncFixture::new();
        fx.create_skill("keep");
        fx.create_skill("scratch");
        fx.create_tracked_skill("_team/drafts/wip");
        fx.create_tracked_skill("_team/ready");

        let options = DiscoveryOptions::from_patterns(&["scratch", "_team/drafts"]).unwrap();
        let units = discover_units_with(&fx.source, &options).unwrap();

        assert_eq!(names(&units), vec!["_team__ready", "keep"]);
    }

    #[test]
    fn invalid_ignore_pattern_is_config_error() {
        let err = DiscoveryOptions::from_patterns(&["[unclosed"]).unwrap_err();
        assert!(matches!(err, SkmError::Config(_)));
    }

    #[test]
    fn tracked_repos_are_listed() {
        let fx = SyncFixture::new();
        fx.create_tracked_skill("_team/ui");
        fx.create_tracked_skill("_personal/notes");
        fx.create_skill("plain");

        assert_eq!(
            tracked_repos(&fx.source).unwrap(),
            vec!["_personal".to_string(), "_team".to_string()]
        );
    }
}
