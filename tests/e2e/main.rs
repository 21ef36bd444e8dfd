//! E2E test suite entry point.

mod fixture;
#[cfg(unix)]
mod status_workflow;
#[cfg(unix)]
mod sync_workflow;
