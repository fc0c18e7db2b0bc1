//! List-backups CLI command

use super::{resolve_config, TargetArgs};
use crate::catalog::Catalog;
use crate::config::{AeonPaths, Settings};
use crate::display::format_snapshot_list;
use crate::error::AeonResult;
use crate::storage::open_store;

/// Handle `aeonsync list-backups`
pub fn handle_list_command(
    paths: &AeonPaths,
    settings: &Settings,
    target: TargetArgs,
    verbose: bool,
) -> AeonResult<()> {
    let config = resolve_config(paths, settings, &target.overrides(verbose))?;
    let store = open_store(&config);
    let catalog = Catalog::load(store.as_ref())?;

    print!("{}", format_snapshot_list(&catalog, &store.location()));
    if catalog.is_empty() {
        println!();
        println!("Create one with: aeonsync sync");
    }

    Ok(())
}
