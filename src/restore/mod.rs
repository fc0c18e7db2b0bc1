//! Restore for AeonSync
//!
//! - `RestoreResolver`: maps (file, date) requests to snapshots, lists
//!   versions, diffs and previews, and runs the copy
//! - `RestoreWizard`: interactive state machine producing a `RestorePlan`
//! - `RestoreJournal`: JSONL record of completed restores

mod diff;
mod journal;
mod resolver;
mod wizard;

pub use diff::{
    diff_bytes, is_binary, preview_bytes, FileDiff, Preview, DIFF_READ_LIMIT, PREVIEW_BYTES,
    PREVIEW_LINES,
};
pub use journal::{RestoreJournal, RestoreRecord};
pub use resolver::{default_destination, map_path, RestorePlan, RestoreResolver};
pub use wizard::{Inspection, Prompter, RestoreWizard, WizardState};
