//! Restore CLI command
//!
//! Non-interactive restores resolve a single (file, date) request. With
//! `--interactive` the restore wizard walks through file, version,
//! inspection and destination on the terminal.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::Args;

use super::{absolute_path, confirm, parse_date, prompt_string, resolve_config, TargetArgs};
use crate::catalog::Catalog;
use crate::config::{AeonPaths, BackupConfig, Settings};
use crate::display::{format_diff, format_preview, format_restore_summary, format_versions};
use crate::error::{AeonError, AeonResult};
use crate::models::SnapshotId;
use crate::restore::{
    default_destination, map_path, FileDiff, Inspection, Preview, Prompter, RestoreJournal,
    RestorePlan, RestoreResolver, RestoreWizard,
};
use crate::storage::open_store;
use crate::transfer::RsyncTransfer;

/// Arguments for `aeonsync restore`
#[derive(Args, Debug, Clone, Default)]
pub struct RestoreArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// File or directory to restore, as a local path
    pub file: Option<PathBuf>,

    /// Restore the version as of this date (YYYY-MM-DD)
    #[arg(short, long, value_parser = parse_date)]
    pub date: Option<NaiveDate>,

    /// Write the restored copy into this directory instead of its original place
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Show a diff against the current local file before restoring
    #[arg(long)]
    pub diff: bool,

    /// Show the first lines of the snapshot copy before restoring
    #[arg(long)]
    pub preview: bool,

    /// List the snapshots holding the file and exit
    #[arg(long)]
    pub versions: bool,

    /// Choose file, version and destination step by step
    #[arg(short, long)]
    pub interactive: bool,

    /// Do not ask for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

/// Handle `aeonsync restore`
pub fn handle_restore_command(
    paths: &AeonPaths,
    settings: &Settings,
    args: RestoreArgs,
    verbose: bool,
) -> AeonResult<()> {
    let config = resolve_config(paths, settings, &args.target.overrides(verbose))?;
    let store = open_store(&config);
    let catalog = Catalog::load(store.as_ref())?;
    let resolver = RestoreResolver::new(store.as_ref(), &catalog);

    let output_dir = args
        .output_dir
        .as_deref()
        .map(absolute_path)
        .transpose()?;

    let plan = if args.interactive {
        catalog.require_latest()?;
        let wizard = RestoreWizard::new(&resolver, &config.sources, output_dir.as_deref());
        let mut prompter = StdinPrompter::new(&catalog);
        match wizard.run(&mut prompter)? {
            Some(plan) => plan,
            None => {
                println!("Restore cancelled.");
                return Ok(());
            }
        }
    } else {
        let Some(file) = args.file.as_deref() else {
            return Err(AeonError::Validation(
                "No file given. Pass a path or use --interactive".into(),
            ));
        };
        match plan_direct(&resolver, &config, &args, file, output_dir.as_deref())? {
            Some(plan) => plan,
            None => return Ok(()),
        }
    };

    execute(&resolver, &config, &plan)
}

/// Resolve a restore from the command-line arguments alone
///
/// Returns `None` when the command ends without restoring.
fn plan_direct(
    resolver: &RestoreResolver<'_>,
    config: &BackupConfig,
    args: &RestoreArgs,
    file: &Path,
    output_dir: Option<&Path>,
) -> AeonResult<Option<RestorePlan>> {
    let local = absolute_path(file)?;
    let relative = map_path(&config.sources, &local)?;

    if args.versions {
        let versions = resolver.list_versions(&relative)?;
        if versions.is_empty() {
            println!("No snapshot contains {}.", relative.display());
        } else {
            println!("Versions of {}:", relative.display());
            print!("{}", format_versions(&versions, resolver.catalog()));
        }
        return Ok(None);
    }

    let id = resolver.resolve_version(&relative, args.date)?;

    if args.preview {
        println!("Preview of {} in {}:", relative.display(), id);
        print!("{}", format_preview(&resolver.preview(&relative, &id)?));
        println!();
    }
    if args.diff {
        if local.is_file() {
            print!("{}", format_diff(&resolver.diff_local(&relative, &id, &local)?));
        } else {
            println!("{} does not exist locally, nothing to compare.", local.display());
        }
        println!();
    }

    let plan = resolver.plan(&relative, id, default_destination(&local, output_dir))?;

    print!("{}", format_restore_summary(&plan));
    if plan.destination.exists() {
        println!("Warning: {} exists and will be overwritten.", plan.destination.display());
    }

    if !args.yes && !confirm("Proceed with restore?")? {
        println!("Restore cancelled.");
        return Ok(None);
    }

    Ok(Some(plan))
}

fn execute(resolver: &RestoreResolver<'_>, config: &BackupConfig, plan: &RestorePlan) -> AeonResult<()> {
    let transfer = RsyncTransfer::for_config(config);
    let journal = RestoreJournal::new(config.restore_log.clone());

    let record = resolver.restore(plan, &transfer, &journal, config.verbose)?;
    println!(
        "Restored {} from snapshot {} to {}",
        record.source.display(),
        record.snapshot,
        record.destination.display()
    );
    Ok(())
}

/// Terminal front end for the restore wizard
struct StdinPrompter<'a> {
    catalog: &'a Catalog,
    /// Versions most recently offered, for resolving numbered answers
    offered: Vec<SnapshotId>,
}

impl<'a> StdinPrompter<'a> {
    fn new(catalog: &'a Catalog) -> Self {
        Self {
            catalog,
            offered: Vec::new(),
        }
    }

    /// A list number or a snapshot id
    fn pick(&self, answer: &str) -> Option<SnapshotId> {
        if let Ok(n) = answer.parse::<usize>() {
            return n.checked_sub(1).and_then(|i| self.offered.get(i)).copied();
        }
        SnapshotId::parse(answer).ok()
    }
}

impl Prompter for StdinPrompter<'_> {
    fn select_file(&mut self) -> AeonResult<Option<PathBuf>> {
        let answer = prompt_string("File or directory to restore (empty to quit): ")?;
        if answer.is_empty() {
            return Ok(None);
        }
        absolute_path(Path::new(&answer)).map(Some)
    }

    fn select_version(&mut self, file: &Path, versions: &[SnapshotId]) -> AeonResult<Option<SnapshotId>> {
        self.offered = versions.to_vec();
        println!();
        println!("Versions of {}:", file.display());
        print!("{}", format_versions(versions, self.catalog));

        loop {
            let answer = prompt_string("Version number or id [latest, q to quit]: ")?;
            match answer.as_str() {
                "" => return Ok(versions.last().copied()),
                "q" => return Ok(None),
                other => match self.pick(other) {
                    Some(id) => return Ok(Some(id)),
                    None => println!("Not a listed version: {}", other),
                },
            }
        }
    }

    fn inspect(&mut self, _file: &Path, version: &SnapshotId) -> AeonResult<Inspection> {
        loop {
            let answer = prompt_string(&format!(
                "{}: [p]review, [d]iff with another version, diff with [l]ocal, [b]ack, Enter to continue: ",
                version
            ))?;
            match answer.as_str() {
                "" => return Ok(Inspection::Continue),
                "p" => return Ok(Inspection::Preview),
                "l" => return Ok(Inspection::DiffLocal),
                "b" => return Ok(Inspection::Back),
                "d" => {
                    let other = prompt_string("Compare with version number or id: ")?;
                    match self.pick(&other) {
                        Some(id) => return Ok(Inspection::DiffWith(id)),
                        None => println!("Not a listed version: {}", other),
                    }
                }
                other => println!("Unknown choice: {}", other),
            }
        }
    }

    fn show_preview(&mut self, preview: &Preview) {
        print!("{}", format_preview(preview));
    }

    fn show_diff(&mut self, diff: &FileDiff) {
        print!("{}", format_diff(diff));
    }

    fn select_destination(&mut self, default: &Path) -> AeonResult<Option<PathBuf>> {
        let answer = prompt_string(&format!("Restore to [{}]: ", default.display()))?;
        if answer.is_empty() {
            return Ok(Some(default.to_path_buf()));
        }
        absolute_path(Path::new(&answer)).map(Some)
    }

    fn confirm(&mut self, plan: &RestorePlan) -> AeonResult<bool> {
        println!();
        print!("{}", format_restore_summary(plan));
        if plan.destination.exists() {
            println!("Warning: {} exists and will be overwritten.", plan.destination.display());
        }
        confirm("Proceed with restore?")
    }

    fn notify(&mut self, message: &str) {
        println!("{}", message);
    }
}
