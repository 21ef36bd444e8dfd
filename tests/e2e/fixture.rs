//! E2E test fixture with step logging and checkpointing.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use tempfile::TempDir;

/// Checkpoint snapshot for test debugging.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    pub name: String,
    pub timestamp: Duration,
    pub step_count: usize,
    /// Every path under the root with its kind ("dir", "file", "link -> x").
    pub entries: Vec<String>,
}

/// Step result for report generation.
#[derive(Debug, Clone)]
pub struct StepResult {
    pub name: String,
    pub success: bool,
    pub duration: Duration,
    pub output_summary: String,
}

/// Isolated home directory with its own config, source and targets.
pub struct E2EFixture {
    pub scenario_name: String,
    pub temp_dir: TempDir,
    /// Fake home directory (temp_dir path)
    pub root: PathBuf,
    pub config_path: PathBuf,
    pub source: PathBuf,
    start_time: Instant,
    step_count: usize,
    checkpoints: Vec<Checkpoint>,
    step_results: Vec<StepResult>,
}

impl E2EFixture {
    pub fn new(scenario_name: &str) -> Self {
        let start_time = Instant::now();
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path().to_path_buf();
        let config_path = root.join(".config/skm/config.toml");
        let source = root.join("skills");

        println!();
        println!("{}", "█".repeat(70));
        println!("█ E2E SCENARIO: {scenario_name}");
        println!("{}", "█".repeat(70));
        println!("[E2E] Home: {root:?}");
        println!("[E2E] Config: {config_path:?}");
        println!("[E2E] Source: {source:?}");

        Self {
            scenario_name: scenario_name.to_string(),
            temp_dir,
            root,
            config_path,
            source,
            start_time,
            step_count: 0,
            checkpoints: Vec::new(),
            step_results: Vec::new(),
        }
    }

    pub fn log_step(&mut self, description: &str) {
        self.step_count += 1;
        let elapsed = self.start_time.elapsed();

        println!();
        println!("┌{}", "─".repeat(68));
        println!("│ STEP {}: {}", self.step_count, description);
        println!("│ Time: {elapsed:?}");
        println!("└{}", "─".repeat(68));
    }

    pub fn checkpoint(&mut self, name: &str) {
        let entries: Vec<String> = walkdir::WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| !e.path().starts_with(self.config_path.parent().unwrap()))
            .map(|e| {
                let rel = e.path().strip_prefix(&self.root).unwrap().display().to_string();
                if e.path_is_symlink() {
                    let to = std::fs::read_link(e.path()).unwrap_or_default();
                    format!("{rel} -> {}", to.display())
                } else if e.file_type().is_dir() {
                    format!("{rel}/")
                } else {
                    rel
                }
            })
            .collect();

        println!();
        println!("[CHECKPOINT] {name} ({} entries)", entries.len());
        for entry in &entries {
            println!("[CHECKPOINT]   {entry}");
        }

        self.checkpoints.push(Checkpoint {
            name: name.to_string(),
            timestamp: self.start_time.elapsed(),
            step_count: self.step_count,
            entries,
        });
    }

    /// Entries recorded by a named checkpoint.
    pub fn checkpoint_entries(&self, name: &str) -> &[String] {
        self.checkpoints
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.entries.as_slice())
            .unwrap_or_else(|| panic!("no checkpoint named {name}"))
    }

    pub fn run_skm(&mut self, args: &[&str]) -> CommandOutput {
        let step_name = format!("skm {}", args.join(" "));
        let start = Instant::now();
        println!();
        println!("[CMD] {step_name}");

        let output = Command::new(env!("CARGO_BIN_EXE_skm"))
            .args(args)
            .env("HOME", &self.root)
            .env("XDG_CONFIG_HOME", self.root.join(".config"))
            .env("SKM_CONFIG", &self.config_path)
            .env_remove("SKM_SOURCE")
            .env_remove("SKM_MODE")
            .env_remove("RUST_LOG")
            .current_dir(&self.root)
            .output()
            .expect("Failed to execute skm");

        let elapsed = start.elapsed();
        let result = CommandOutput {
            success: output.status.success(),
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            elapsed,
        };

        println!("[CMD] Exit: {} ({elapsed:?})", result.exit_code);
        if !result.stdout.is_empty() {
            println!("[STDOUT] {}", truncate(&result.stdout, 500));
        }
        if !result.stderr.is_empty() {
            println!("[STDERR] {}", result.stderr);
        }

        let summary = if result.success {
            format!("OK ({})", truncate(&result.stdout, 50))
        } else {
            format!("FAIL: {}", truncate(&result.stderr, 100))
        };
        self.step_results.push(StepResult {
            name: step_name,
            success: result.success,
            duration: elapsed,
            output_summary: summary,
        });

        result
    }

    /// `skm init` with the fixture's source.
    pub fn init(&mut self) -> CommandOutput {
        let source = self.source.display().to_string();
        self.run_skm(&["--robot", "init", "--source", &source])
    }

    pub fn add_target(&mut self, name: &str, path: &Path, mode: Option<&str>) -> CommandOutput {
        let path = path.display().to_string();
        let mut args = vec!["target", "add", name, path.as_str()];
        if let Some(mode) = mode {
            args.extend(["--mode", mode]);
        }
        self.run_skm(&args)
    }

    pub fn create_skill(&self, rel_path: &str) -> PathBuf {
        let dir = self.source.join(rel_path);
        std::fs::create_dir_all(&dir).expect("Failed to create skill dir");
        std::fs::write(dir.join("SKILL.md"), format!("# {rel_path}\n")).expect("Failed to write skill");
        println!("[SKILL] Created '{rel_path}'");
        dir
    }

    /// A directory under the fake home, created.
    pub fn home_dir(&self, rel_path: &str) -> PathBuf {
        let dir = self.root.join(rel_path);
        std::fs::create_dir_all(&dir).expect("Failed to create dir");
        dir
    }

    pub fn assert_success(&self, output: &CommandOutput, operation: &str) {
        assert!(
            output.success,
            "[E2E] {operation} failed with exit code {}: {}",
            output.exit_code,
            output.stderr
        );
        println!("[ASSERT] {operation} - SUCCESS");
    }

    pub fn assert_failure(&self, output: &CommandOutput, operation: &str) {
        assert!(
            !output.success,
            "[E2E] {operation} unexpectedly succeeded: {}",
            truncate(&output.stdout, 500)
        );
        println!("[ASSERT] {operation} - FAILED AS EXPECTED");
    }

    pub fn assert_output_contains(&self, output: &CommandOutput, expected: &str) {
        let found = output.stdout.contains(expected) || output.stderr.contains(expected);
        assert!(
            found,
            "[E2E] Output does not contain '{expected}'\nStdout: {}\nStderr: {}",
            truncate(&output.stdout, 500),
            truncate(&output.stderr, 500)
        );
        println!("[ASSERT] Output contains '{expected}' - PASSED");
    }

    pub fn generate_report(&self) {
        println!();
        println!("{}", "█".repeat(70));
        println!("█ E2E REPORT: {}", self.scenario_name);
        println!("{}", "█".repeat(70));
        println!("Total Steps: {}", self.step_count);
        println!("Checkpoints: {}", self.checkpoints.len());
        println!("Total Time:  {:?}", self.start_time.elapsed());
        println!();
        for (i, step) in self.step_results.iter().enumerate() {
            let status = if step.success { "✓" } else { "✗" };
            println!("{:2}. {status} {} ({:?})", i + 1, step.name, step.duration);
            if !step.success {
                println!("     └─ {}", step.output_summary);
            }
        }
        for checkpoint in &self.checkpoints {
            println!(
                "  [{:?}] {} (step {}, {} entries)",
                checkpoint.timestamp,
                checkpoint.name,
                checkpoint.step_count,
                checkpoint.entries.len()
            );
        }
    }
}

impl Drop for E2EFixture {
    fn drop(&mut self) {
        println!();
        println!("█ E2E CLEANUP: {} ({:?})", self.scenario_name, self.start_time.elapsed());
        println!("█ Temp dir: {:?}", self.temp_dir.path());
    }
}

pub struct CommandOutput {
    pub success: bool,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl CommandOutput {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.stdout).expect("stdout should be valid JSON")
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let head: String = s.chars().take(max_len).collect();
    format!("{head}...")
}
