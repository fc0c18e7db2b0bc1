//! Backup cycle for AeonSync
//!
//! - `SyncPlanner`: allocates the next snapshot, links it against the latest
//!   one and drives the transfer
//! - `RetentionEnforcer`: removes snapshots older than the retention period,
//!   never the latest restorable one

mod planner;
mod retention;

pub use planner::{SyncPlanner, SyncReport, SyncStatus};
pub use retention::{expired, RetentionEnforcer};
