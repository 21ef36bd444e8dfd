//! Skill reconciliation: discovery, link handling, classification and sync.
//!
//! The engine keeps no state between calls. Every operation re-reads the
//! filesystem, so two skm processes working on the same target at once are
//! last-writer-wins; nothing coordinates them.

pub mod collect;
pub mod diff;
pub mod discovery;
pub mod engine;
pub mod link;
pub mod naming;
pub mod status;
pub mod target;

pub use collect::{CollectOptions, CollectReport, LocalSkill, find_local_skills};
pub use diff::{DiffItem, DiffKind, TargetDiff, diff_target};
pub use discovery::{DiscoveryOptions, SkillUnit, discover_units, discover_units_with, tracked_repos};
pub use engine::{
    EntryError, HasFilesPolicy, MergeReport, SyncEngine, SyncOptions, TargetOutcome, TargetReport,
    WholeAction, WholeOutcome, sync_merge, sync_whole,
};
pub use link::{LinkEntry, LinkStrategy, create_link, inspect, resolves_to};
pub use status::{MergeStatus, TargetStatus, classify_merge, classify_whole};
pub use target::{SyncMode, Target, resolve_mode};
