use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use aeonsync::cli::{
    handle_config_command, handle_list_command, handle_restore_command, handle_sync_command,
    ConfigArgs, RestoreArgs, SyncArgs, TargetArgs,
};
use aeonsync::config::{AeonPaths, Settings};
use aeonsync::AeonError;

#[derive(Parser)]
#[command(
    name = "aeonsync",
    version,
    about = "Incremental remote backups with point-in-time restore",
    long_about = "AeonSync keeps dated, hard-linked snapshots of your directories on a \
                  remote host or mounted disk, prunes them after a retention period, \
                  and restores any file as it was on a given day."
)]
struct Cli {
    /// Verbose output and transfer progress
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new snapshot and prune expired ones
    Sync(SyncArgs),

    /// Restore a file or directory from a snapshot
    Restore(RestoreArgs),

    /// List the snapshots on the backup root
    #[command(alias = "list")]
    ListBackups(TargetArgs),

    /// Show or change the configuration
    Config(ConfigArgs),
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(cli) {
        eprintln!("Error: {}", err);
        let code = err.downcast_ref::<AeonError>().map_or(1, AeonError::exit_code);
        std::process::exit(code);
    }
}

fn run(cli: Cli) -> Result<()> {
    let paths = AeonPaths::new()?;
    let settings = Settings::load_or_create(&paths)?;

    match cli.command {
        Some(Commands::Sync(args)) => handle_sync_command(&paths, &settings, args, cli.verbose)?,
        Some(Commands::Restore(args)) => {
            handle_restore_command(&paths, &settings, args, cli.verbose)?
        }
        Some(Commands::ListBackups(target)) => {
            handle_list_command(&paths, &settings, target, cli.verbose)?
        }
        Some(Commands::Config(args)) => handle_config_command(&paths, settings, args)?,
        None => {
            println!("AeonSync - incremental remote backups");
            println!();
            println!("Run 'aeonsync --help' for usage information.");
            println!("Run 'aeonsync config --remote [user@]host:path' to get started.");
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
