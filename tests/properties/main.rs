//! Property-based tests.

mod naming_props;
#[cfg(unix)]
mod sync_props;
