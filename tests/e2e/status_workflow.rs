//! E2E Scenario: Inspection commands
//!
//! status, diff, list, doctor and log against a partly synced setup.

use std::fs;

use super::fixture::E2EFixture;

fn prepared(name: &str) -> E2EFixture {
    let mut fixture = E2EFixture::new(name);
    let output = fixture.init();
    fixture.assert_success(&output, "init");
    fixture.create_skill("review");
    fixture.create_skill("_team/ui");
    let codex = fixture.root.join(".codex/skills");
    fixture.add_target("codex", &codex, None);
    fixture.add_target("claude", &fixture.root.join(".claude/skills"), Some("symlink"));
    fixture
}

#[test]
fn test_status_before_and_after_sync() {
    let mut fixture = prepared("status_before_after");

    fixture.log_step("Status before sync");
    let output = fixture.run_skm(&["--robot", "status"]);
    fixture.assert_success(&output, "status");
    let json = output.json();
    assert_eq!(json["data"]["source"]["skills"], 2);
    assert_eq!(json["data"]["source"]["tracked"], 1);
    let targets = json["data"]["targets"].as_array().unwrap();
    assert_eq!(targets[0]["name"], "claude");
    assert_eq!(targets[0]["status"], "not_exist");
    assert_eq!(targets[1]["status"], "not_exist");

    fixture.log_step("Sync then status");
    fixture.run_skm(&["sync"]);
    let output = fixture.run_skm(&["status"]);
    fixture.assert_success(&output, "status human");
    fixture.assert_output_contains(&output, "linked");
    fixture.assert_output_contains(&output, "merged (2 shared, 0 local)");
    fixture.generate_report();
}

#[test]
fn test_diff_lists_pending_changes() {
    let mut fixture = prepared("diff_pending");
    fixture.run_skm(&["sync"]);
    fs::remove_dir_all(fixture.source.join("review")).unwrap();
    fixture.create_skill("debug");

    let output = fixture.run_skm(&["--robot", "diff", "codex"]);
    fixture.assert_success(&output, "diff");
    let json = output.json();
    assert_eq!(json["data"]["in_sync"], false);
    let items = json["data"]["targets"][0]["items"].as_array().unwrap();
    let kinds: Vec<(&str, &str)> = items
        .iter()
        .map(|item| (item["kind"].as_str().unwrap(), item["name"].as_str().unwrap()))
        .collect();
    assert_eq!(kinds, vec![("add", "debug"), ("prune", "review")]);

    fixture.run_skm(&["sync"]);
    let output = fixture.run_skm(&["--robot", "diff"]);
    assert_eq!(output.json()["data"]["in_sync"], true);
    fixture.generate_report();
}

#[test]
fn test_list_doctor_and_log() {
    let mut fixture = prepared("list_doctor_log");

    let output = fixture.run_skm(&["--robot", "list"]);
    fixture.assert_success(&output, "list");
    let json = output.json();
    assert_eq!(json["data"]["count"], 2);
    assert_eq!(json["data"]["tracked_repos"][0], "_team");
    assert_eq!(json["data"]["skills"][0]["flat_name"], "_team__ui");

    fixture.run_skm(&["sync"]);
    let output = fixture.run_skm(&["--robot", "doctor"]);
    fixture.assert_success(&output, "doctor");
    assert_eq!(output.json()["data"]["errors"], 0);

    let output = fixture.run_skm(&["--robot", "log", "--limit", "1"]);
    fixture.assert_success(&output, "log");
    let json = output.json();
    let entries = json["data"]["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["command"], "sync");
    assert_eq!(entries[0]["status"], "ok");
    fixture.generate_report();
}
