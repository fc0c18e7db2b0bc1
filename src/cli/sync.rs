//! Sync CLI command
//!
//! Runs one backup cycle, then prunes expired snapshots.

use std::path::PathBuf;

use chrono::{Local, Utc};
use clap::Args;

use super::{resolve_config, TargetArgs};
use crate::backup::{RetentionEnforcer, SyncPlanner, SyncStatus};
use crate::catalog::Catalog;
use crate::config::{AeonPaths, Settings};
use crate::display::format_sync_report;
use crate::error::AeonResult;
use crate::storage::open_store;
use crate::transfer::RsyncTransfer;

/// Arguments for `aeonsync sync`
#[derive(Args, Debug, Clone, Default)]
pub struct SyncArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Source directory to back up (repeatable; replaces the configured list)
    #[arg(long = "source", value_name = "DIR")]
    pub sources: Vec<PathBuf>,

    /// Show what would be transferred without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Keep at most one snapshot per day
    #[arg(long)]
    pub daily: bool,

    /// Days to keep snapshots
    #[arg(long, value_name = "DAYS")]
    pub retention_period: Option<i64>,
}

/// Handle `aeonsync sync`
pub fn handle_sync_command(
    paths: &AeonPaths,
    settings: &Settings,
    args: SyncArgs,
    verbose: bool,
) -> AeonResult<()> {
    let mut overrides = args.target.overrides(verbose);
    overrides.sources = args.sources;
    overrides.dry_run = args.dry_run;
    overrides.daily = args.daily;
    overrides.retention_days = args.retention_period;

    let config = resolve_config(paths, settings, &overrides)?;
    let store = open_store(&config);
    let transfer = RsyncTransfer::for_config(&config);

    println!("Backing up to {}", store.location());

    let catalog = Catalog::load(store.as_ref())?;
    let planner = SyncPlanner::new(store.as_ref(), &transfer, &config);
    let report = planner.sync(&catalog, Local::now().date_naive(), Utc::now())?;

    print!("{}", format_sync_report(&report));

    if matches!(report.status, SyncStatus::Created(_)) {
        let catalog = Catalog::load(store.as_ref())?;
        let removed = RetentionEnforcer::new(store.as_ref(), config.retention)
            .enforce(&catalog, Utc::now())?;

        if !removed.is_empty() {
            println!(
                "Removed {} expired snapshot(s) (retention: {} days):",
                removed.len(),
                config.retention.days
            );
            for id in removed {
                println!("  {}", id);
            }
        }
    }

    Ok(())
}
