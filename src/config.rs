use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SkmError, suggest_similar_targets};
use crate::sync::{DiscoveryOptions, SyncMode, Target, resolve_mode};
use crate::utils::fs::{ensure_dir, expand_tilde, read_optional};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "SKM_CONFIG";
/// Environment override for the source directory.
pub const SOURCE_ENV: &str = "SKM_SOURCE";
/// Environment override for the global mode.
pub const MODE_ENV: &str = "SKM_MODE";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Source directory, `~` allowed.
    pub source: String,
    /// Global mode for targets that do not set their own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<SyncMode>,
    /// Glob patterns over skill relative paths.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore: Vec<String>,
    #[serde(default)]
    pub targets: BTreeMap<String, TargetConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConfig {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<SyncMode>,
}

impl Config {
    /// Fresh config for `init`.
    pub fn new(source: impl Into<String>, mode: Option<SyncMode>) -> Self {
        Self {
            source: source.into(),
            mode,
            ignore: vec!["**/.DS_Store".to_string()],
            targets: BTreeMap::new(),
        }
    }

    /// Config file location: explicit path, then `SKM_CONFIG`, then the
    /// platform config directory.
    pub fn resolve_path(explicit_path: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit_path {
            return Ok(path.to_path_buf());
        }
        if let Some(path) = env_string(CONFIG_ENV).filter(|p| !p.is_empty()) {
            return Ok(expand_tilde(&path));
        }
        Self::default_path()
    }

    pub fn default_path() -> Result<PathBuf> {
        let dir = dirs::config_dir()
            .ok_or_else(|| SkmError::MissingConfig("config directory not found".to_string()))?;
        Ok(dir.join("skm").join("config.toml"))
    }

    /// Default source directory offered by `init`.
    pub fn default_source() -> Result<PathBuf> {
        let dir = dirs::config_dir()
            .ok_or_else(|| SkmError::MissingConfig("config directory not found".to_string()))?;
        Ok(dir.join("skm").join("skills"))
    }

    /// Load the config file and apply environment overrides.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = Self::resolve_path(explicit_path)?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::load_without_overrides(path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load the file as written. Commands that save the config back use this
    /// so environment overrides never end up on disk.
    pub fn load_without_overrides(path: &Path) -> Result<Self> {
        let config = Self::load_file(path)?.ok_or_else(|| {
            SkmError::MissingConfig(format!(
                "no config at {} (run `skm init` first)",
                path.display()
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    fn load_file(path: &Path) -> Result<Option<Self>> {
        let Some(raw) = read_optional(path)
            .map_err(|err| SkmError::Config(format!("read config {}: {err}", path.display())))?
        else {
            return Ok(None);
        };
        let config = toml::from_str(&raw)
            .map_err(|err| SkmError::Config(format!("parse config {}: {err}", path.display())))?;
        Ok(Some(config))
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(env_string)
    }

    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(source) = lookup(SOURCE_ENV).filter(|s| !s.is_empty()) {
            self.source = source;
        }
        if let Some(mode) = lookup(MODE_ENV).filter(|s| !s.is_empty()) {
            self.mode = Some(mode.parse()?);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.source.trim().is_empty() {
            return Err(SkmError::Config("`source` must not be empty".to_string()));
        }
        for (name, target) in &self.targets {
            if target.path.trim().is_empty() {
                return Err(SkmError::Config(format!("target '{name}' has an empty path")));
            }
        }
        Ok(())
    }

    /// Write pretty TOML, creating the parent directory.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            ensure_dir(parent)?;
        }
        let raw = toml::to_string_pretty(self)
            .map_err(|err| SkmError::Config(format!("serialize config: {err}")))?;
        std::fs::write(path, raw)?;
        Ok(())
    }

    #[must_use]
    pub fn source_path(&self) -> PathBuf {
        expand_tilde(&self.source)
    }

    /// Effective mode for one target: its own, then global, then merge.
    #[must_use]
    pub fn resolve_mode(&self, target: &TargetConfig) -> SyncMode {
        resolve_mode(target.mode, self.mode)
    }

    /// All targets with paths expanded and modes resolved, in name order.
    #[must_use]
    pub fn targets(&self) -> Vec<Target> {
        self.targets
            .iter()
            .map(|(name, target)| self.resolved(name, target))
            .collect()
    }

    /// One target by name.
    pub fn target(&self, name: &str) -> Result<Target> {
        self.targets
            .get(name)
            .map(|target| self.resolved(name, target))
            .ok_or_else(|| SkmError::TargetNotFound(self.describe_missing(name)))
    }

    fn resolved(&self, name: &str, target: &TargetConfig) -> Target {
        Target::new(name, expand_tilde(&target.path), self.resolve_mode(target))
    }

    fn describe_missing(&self, name: &str) -> String {
        let names: Vec<&str> = self.targets.keys().map(String::as_str).collect();
        let similar = suggest_similar_targets(name, &names, 3);
        if similar.is_empty() {
            name.to_string()
        } else {
            format!("{name} (did you mean: {}?)", similar.join(", "))
        }
    }

    pub fn discovery_options(&self) -> Result<DiscoveryOptions> {
        DiscoveryOptions::from_patterns(&self.ignore)
    }

    pub fn add_target(
        &mut self,
        name: &str,
        path: impl Into<String>,
        mode: Option<SyncMode>,
    ) -> Result<()> {
        if name.trim().is_empty() {
            return Err(SkmError::Config("target name must not be empty".to_string()));
        }
        if self.targets.contains_key(name) {
            return Err(SkmError::Config(format!("target '{name}' already exists")));
        }
        self.targets.insert(
            name.to_string(),
            TargetConfig {
                path: path.into(),
                mode,
            },
        );
        Ok(())
    }

    pub fn remove_target(&mut self, name: &str) -> Result<TargetConfig> {
        self.targets
            .remove(name)
            .ok_or_else(|| SkmError::TargetNotFound(self.describe_missing(name)))
    }
}

/// Well-known AI CLI skill directories, relative to the home directory.
const KNOWN_TARGETS: &[(&str, &str)] = &[
    ("claude", ".claude/skills"),
    ("codex", ".codex/skills"),
    ("copilot", ".copilot/skills"),
    ("cursor", ".cursor/skills"),
    ("gemini", ".gemini/skills"),
    ("opencode", ".config/opencode/skills"),
    ("windsurf", ".codeium/windsurf/skills"),
];

/// Known target locations under the current home directory.
#[must_use]
pub fn default_targets() -> Vec<(String, PathBuf)> {
    dirs::home_dir().map_or_else(Vec::new, |home| default_targets_in(&home))
}

/// Known target locations under `home`.
#[must_use]
pub fn default_targets_in(home: &Path) -> Vec<(String, PathBuf)> {
    KNOWN_TARGETS
        .iter()
        .map(|(name, rel)| ((*name).to_string(), home.join(rel)))
        .collect()
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
