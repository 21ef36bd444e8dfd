use std::path::{Path, PathBuf};

use tempfile::TempDir;
use walkdir::WalkDir;

/// Isolated source and targets tree for sync tests.
///
/// Layout: `<tmp>/source` holds skills, `<tmp>/targets/<name>` are targets.
pub struct SyncFixture {
    pub temp_dir: TempDir,
    pub source: PathBuf,
    pub targets: PathBuf,
}

impl SyncFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let source = temp_dir.path().join("source");
        let targets = temp_dir.path().join("targets");
        std::fs::create_dir_all(&source).expect("Failed to create source dir");
        std::fs::create_dir_all(&targets).expect("Failed to create targets dir");

        println!("[FIXTURE] Created sync tree: {:?}", temp_dir.path());

        Self {
            temp_dir,
            source,
            targets,
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create `source/<name>/SKILL.md`.
    pub fn create_skill(&self, name: &str) -> PathBuf {
        let dir = self.source.join(name);
        write_skill(&dir, name);
        dir
    }

    /// Create a nested skill inside a tracked repo, e.g. `_team/frontend/ui`.
    pub fn create_tracked_skill(&self, rel_path: &str) -> PathBuf {
        let dir = self.source.join(rel_path);
        write_skill(&dir, rel_path);
        dir
    }

    /// Path for a target under the fixture, not created.
    pub fn target_path(&self, name: &str) -> PathBuf {
        self.targets.join(name)
    }

    pub fn create_target_dir(&self, name: &str) -> PathBuf {
        let dir = self.target_path(name);
        std::fs::create_dir_all(&dir).expect("Failed to create target dir");
        dir
    }

    /// A real (unmanaged) skill directory inside a target.
    pub fn create_local_dir(&self, target: &Path, name: &str) -> PathBuf {
        let dir = target.join(name);
        write_skill(&dir, &format!("local {name}"));
        dir
    }

    #[cfg(unix)]
    pub fn symlink(&self, points_to: &Path, link: &Path) {
        if let Some(parent) = link.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create link parent");
        }
        std::os::unix::fs::symlink(points_to, link).expect("Failed to create symlink");
    }

    /// Every entry under `dir` (links not followed) with its kind and link
    /// target, for before/after comparisons.
    pub fn snapshot(&self, dir: &Path) -> Vec<(PathBuf, String)> {
        WalkDir::new(dir)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .map(|entry| {
                let rel = entry
                    .path()
                    .strip_prefix(dir)
                    .unwrap_or(entry.path())
                    .to_path_buf();
                let kind = if entry.path_is_symlink() {
                    let target = std::fs::read_link(entry.path()).unwrap_or_default();
                    format!("link -> {}", target.display())
                } else if entry.file_type().is_dir() {
                    "dir".to_string()
                } else {
                    let content = std::fs::read_to_string(entry.path()).unwrap_or_default();
                    format!("file ({content})")
                };
                (rel, kind)
            })
            .collect()
    }
}

impl Default for SyncFixture {
    fn default() -> Self {
        Self::new()
    }
}

fn write_skill(dir: &Path, title: &str) {
    std::fs::create_dir_all(dir).expect("Failed to create skill dir");
    std::fs::write(dir.join("SKILL.md"), format!("# {title}\n")).expect("Failed to write SKILL.md");
}
