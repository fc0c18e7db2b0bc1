//! Display formatting for terminal output
//!
//! Provides utilities for formatting snapshots, restores and settings for
//! terminal display.

pub mod format;
pub mod restore;
pub mod snapshot;

pub use format::{format_duration, format_size};
pub use restore::{format_diff, format_preview, format_restore_summary, format_versions};
pub use snapshot::{format_snapshot_list, format_sync_report};

use crate::config::Settings;

/// Settings as an aligned key/value listing
pub fn format_settings(settings: &Settings) -> String {
    let rows = settings.rows();
    let width = rows.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    rows.iter()
        .map(|(key, value)| format!("  {:<width$}  {}\n", key, value))
        .collect()
}
