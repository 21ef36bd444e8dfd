//! E2E Scenario: Sync Workflow
//!
//! Drives the binary through merge and symlink targets:
//! - First sync creates per-skill links and a whole-directory link
//! - Removing a skill prunes its link, local directories survive
//! - Re-running sync and dry runs leave the tree untouched
//! - Existing target content is refused, then migrated
//! - Switching a target's mode converts its layout
//! - Collecting a local skill moves it into the source for every target

use std::fs;

use super::fixture::E2EFixture;

#[test]
fn test_merge_and_symlink_lifecycle() {
    let mut fixture = E2EFixture::new("merge_and_symlink_lifecycle");

    fixture.log_step("Initialize and create skills");
    let output = fixture.init();
    fixture.assert_success(&output, "init");
    fixture.create_skill("review");
    fixture.create_skill("_team/ui");
    fixture.create_skill("_team/ui/forms");

    fixture.log_step("Add a merge target and a symlink target");
    let codex = fixture.root.join(".codex/skills");
    let claude = fixture.root.join(".claude/skills");
    let output = fixture.add_target("codex", &codex, None);
    fixture.assert_success(&output, "target add codex");
    let output = fixture.add_target("claude", &claude, Some("symlink"));
    fixture.assert_success(&output, "target add claude");

    fixture.log_step("First sync");
    let output = fixture.run_skm(&["sync"]);
    fixture.assert_success(&output, "sync");
    assert_eq!(fs::read_link(&claude).unwrap(), fixture.source);
    assert_eq!(
        fs::read_link(codex.join("review")).unwrap(),
        fixture.source.join("review")
    );
    assert_eq!(
        fs::read_link(codex.join("_team__ui__forms")).unwrap(),
        fixture.source.join("_team/ui/forms")
    );
    assert!(codex.join("_team__ui").is_symlink());
    assert!(!codex.join("_team").exists());
    fixture.checkpoint("first_sync");

    fixture.log_step("Second sync is a no-op");
    let output = fixture.run_skm(&["sync"]);
    fixture.assert_success(&output, "sync again");
    fixture.checkpoint("second_sync");
    assert_eq!(
        fixture.checkpoint_entries("first_sync"),
        fixture.checkpoint_entries("second_sync")
    );

    fixture.log_step("Remove a skill and add a local one");
    fs::remove_dir_all(fixture.source.join("review")).unwrap();
    fixture.home_dir(".codex/skills/mine");
    let output = fixture.run_skm(&["--robot", "sync", "codex"]);
    fixture.assert_success(&output, "sync codex");
    let json = output.json();
    let report = &json["data"]["reports"][0]["outcome"];
    assert_eq!(report["result"], "merge");
    assert_eq!(report["pruned"][0], "review");
    assert!(!codex.join("review").exists());
    assert!(codex.join("mine").is_dir());

    fixture.generate_report();
}

#[test]
fn test_dry_run_changes_nothing() {
    let mut fixture = E2EFixture::new("dry_run_changes_nothing");
    let output = fixture.init();
    fixture.assert_success(&output, "init");
    fixture.create_skill("review");
    let codex = fixture.root.join(".codex/skills");
    fixture.add_target("codex", &codex, None);
    fixture.add_target("claude", &fixture.root.join(".claude/skills"), Some("symlink"));
    fixture.checkpoint("before");

    fixture.log_step("Dry run");
    let output = fixture.run_skm(&["--robot", "sync", "--dry-run"]);
    fixture.assert_success(&output, "sync --dry-run");
    let json = output.json();
    assert_eq!(json["data"]["dry_run"], true);
    assert_eq!(json["data"]["reports"][1]["outcome"]["linked"][0], "review");
    fixture.checkpoint("after");

    assert_eq!(
        fixture.checkpoint_entries("before"),
        fixture.checkpoint_entries("after")
    );
    assert!(!codex.exists());
    fixture.generate_report();
}

#[test]
fn test_existing_content_is_refused_then_migrated() {
    let mut fixture = E2EFixture::new("existing_content_migration");
    let output = fixture.init();
    fixture.assert_success(&output, "init");
    fixture.create_skill("review");
    let claude = fixture.home_dir(".claude/skills");
    fs::create_dir_all(claude.join("legacy")).unwrap();
    fs::write(claude.join("legacy/SKILL.md"), "# legacy\n").unwrap();
    fixture.add_target("claude", &claude, Some("symlink"));

    fixture.log_step("Plain sync refuses");
    let output = fixture.run_skm(&["sync"]);
    fixture.assert_failure(&output, "sync");
    fixture.assert_output_contains(&output, "legacy");
    assert!(claude.join("legacy/SKILL.md").is_file());
    assert!(!claude.is_symlink());

    fixture.log_step("Sync with --migrate");
    let output = fixture.run_skm(&["sync", "--migrate"]);
    fixture.assert_success(&output, "sync --migrate");
    assert!(claude.is_symlink());
    assert_eq!(
        fs::read_to_string(fixture.source.join("legacy/SKILL.md")).unwrap(),
        "# legacy\n"
    );
    assert!(claude.join("review").is_dir());
    fixture.generate_report();
}

#[test]
fn test_mode_switch_converts_layout() {
    let mut fixture = E2EFixture::new("mode_switch");
    let output = fixture.init();
    fixture.assert_success(&output, "init");
    fixture.create_skill("review");
    let target = fixture.root.join(".gemini/skills");
    fixture.add_target("gemini", &target, None);
    let output = fixture.run_skm(&["sync"]);
    fixture.assert_success(&output, "sync merge");
    assert!(target.join("review").is_symlink());

    fixture.log_step("Switch to symlink mode");
    fixture.run_skm(&["target", "remove", "gemini"]);
    fixture.add_target("gemini", &target, Some("symlink"));
    let output = fixture.run_skm(&["--robot", "sync"]);
    fixture.assert_success(&output, "sync symlink");
    assert_eq!(
        output.json()["data"]["reports"][0]["outcome"]["action"],
        "converted_from_merge"
    );
    assert_eq!(fs::read_link(&target).unwrap(), fixture.source);

    fixture.log_step("Switch back to merge mode");
    fixture.run_skm(&["target", "remove", "gemini"]);
    fixture.add_target("gemini", &target, Some("merge"));
    let output = fixture.run_skm(&["--robot", "sync"]);
    fixture.assert_success(&output, "sync merge again");
    assert_eq!(
        output.json()["data"]["reports"][0]["outcome"]["converted_from_link"],
        true
    );
    assert!(!target.is_symlink());
    assert!(target.join("review").is_symlink());
    fixture.generate_report();
}

#[test]
fn test_collect_then_sync_shares_local_skill() {
    let mut fixture = E2EFixture::new("collect_then_sync");

    fixture.log_step("Two merge targets, one local skill");
    let output = fixture.init();
    fixture.assert_success(&output, "init");
    fixture.create_skill("review");
    let codex = fixture.root.join(".codex/skills");
    let gemini = fixture.root.join(".gemini/skills");
    fixture.add_target("codex", &codex, None);
    fixture.add_target("gemini", &gemini, None);
    fixture.run_skm(&["sync"]);
    let mine = fixture.home_dir(".codex/skills/mine");
    fs::write(mine.join("SKILL.md"), "# mine").unwrap();

    fixture.log_step("Collect without a target name is refused");
    let output = fixture.run_skm(&["collect"]);
    fixture.assert_failure(&output, "collect without target");

    fixture.log_step("Collect from every target");
    let output = fixture.run_skm(&["--robot", "collect", "--all"]);
    fixture.assert_success(&output, "collect --all");
    let json = output.json();
    assert_eq!(json["data"]["report"]["collected"][0]["target"], "codex");
    assert_eq!(
        fs::read_link(codex.join("mine")).unwrap(),
        fixture.source.join("mine")
    );
    fixture.checkpoint("collected");

    fixture.log_step("Sync shares it with the other target");
    let output = fixture.run_skm(&["sync"]);
    fixture.assert_success(&output, "sync after collect");
    assert_eq!(
        fs::read_link(gemini.join("mine")).unwrap(),
        fixture.source.join("mine")
    );

    fixture.log_step("Nothing left to collect");
    let output = fixture.run_skm(&["--robot", "collect", "--all"]);
    fixture.assert_success(&output, "collect again");
    let collected = output.json()["data"]["report"]["collected"].clone();
    assert_eq!(collected.as_array().map(Vec::len), Some(0));

    fixture.generate_report();
}
