use std::collections::BTreeSet;

use proptest::prelude::*;

use skm::sync::{SyncEngine, SyncOptions, discover_units};
use skm::test_utils::fixtures::SyncFixture;

/// What occupies a skill's name inside the target before sync.
#[derive(Debug, Clone, Copy)]
enum Slot {
    Empty,
    CorrectLink,
    StaleLink,
    Local,
}

fn slot() -> impl Strategy<Value = Slot> {
    prop_oneof![
        Just(Slot::Empty),
        Just(Slot::CorrectLink),
        Just(Slot::StaleLink),
        Just(Slot::Local),
    ]
}

/// Skill names mapped to their target slot, plus orphaned link names.
fn layout() -> impl Strategy<Value = (Vec<(String, Slot)>, BTreeSet<String>)> {
    (
        prop::collection::btree_map("[a-z]{1,8}", slot(), 1..6),
        prop::collection::btree_set("orphan-[a-z]{1,4}", 0..3),
    )
        .prop_map(|(skills, orphans)| (skills.into_iter().collect(), orphans))
}

fn build(fx: &SyncFixture, skills: &[(String, Slot)], orphans: &BTreeSet<String>) -> std::path::PathBuf {
    let target = fx.create_target_dir("codex");
    for (name, slot) in skills {
        fx.create_skill(name);
        match slot {
            Slot::Empty => {}
            Slot::CorrectLink => fx.symlink(&fx.source.join(name), &target.join(name)),
            Slot::StaleLink => fx.symlink(&fx.source.join("moved-away"), &target.join(name)),
            Slot::Local => {
                fx.create_local_dir(&target, name);
            }
        }
    }
    for orphan in orphans {
        fx.symlink(&fx.source.join(orphan), &target.join(orphan));
    }
    target
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn dry_run_never_touches_the_target((skills, orphans) in layout()) {
        let fx = SyncFixture::new();
        let target = build(&fx, &skills, &orphans);
        let units = discover_units(&fx.source).unwrap();
        let before = fx.snapshot(fx.root());

        let options = SyncOptions { dry_run: true, ..SyncOptions::default() };
        let report = SyncEngine::new(&fx.source)
            .sync_merge("codex", &target, &units, &options)
            .unwrap();

        prop_assert_eq!(fx.snapshot(fx.root()), before);
        prop_assert_eq!(report.pruned.len(), orphans.len());
    }

    #[test]
    fn local_directories_always_win((skills, orphans) in layout()) {
        let fx = SyncFixture::new();
        let target = build(&fx, &skills, &orphans);
        let units = discover_units(&fx.source).unwrap();
        let locals: Vec<&String> = skills
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Local))
            .map(|(name, _)| name)
            .collect();
        let local_content: Vec<_> = locals
            .iter()
            .map(|name| fx.snapshot(&target.join(name)))
            .collect();

        let report = SyncEngine::new(&fx.source)
            .sync_merge("codex", &target, &units, &SyncOptions::default())
            .unwrap();

        prop_assert_eq!(report.skipped.iter().collect::<Vec<_>>(), locals.clone());
        for (name, content) in locals.iter().zip(&local_content) {
            let path = target.join(name);
            prop_assert!(!path.is_symlink());
            prop_assert_eq!(&fx.snapshot(&path), content);
        }
        for (name, slot) in &skills {
            if !matches!(slot, Slot::Local) {
                prop_assert_eq!(std::fs::read_link(target.join(name)).unwrap(), fx.source.join(name));
            }
        }
        for orphan in &orphans {
            prop_assert!(std::fs::symlink_metadata(target.join(orphan)).is_err());
        }
    }

    #[test]
    fn second_sync_changes_nothing((skills, orphans) in layout()) {
        let fx = SyncFixture::new();
        let target = build(&fx, &skills, &orphans);
        let units = discover_units(&fx.source).unwrap();
        let engine = SyncEngine::new(&fx.source);

        engine.sync_merge("codex", &target, &units, &SyncOptions::default()).unwrap();
        let settled = fx.snapshot(fx.root());
        let again = engine.sync_merge("codex", &target, &units, &SyncOptions::default()).unwrap();

        prop_assert_eq!(again.change_count(), 0);
        prop_assert_eq!(fx.snapshot(fx.root()), settled);
    }
}
