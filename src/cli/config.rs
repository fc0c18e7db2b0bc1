//! Config CLI command
//!
//! Edits the persisted settings. Each flag changes one setting; the file is
//! only rewritten when something actually changed.

use std::path::PathBuf;

use clap::Args;

use crate::config::{absolute_path, AeonPaths, RemoteTarget, Settings};
use crate::display::format_settings;
use crate::error::{AeonError, AeonResult};
use crate::models::MAX_RETENTION_DAYS;

/// Arguments for `aeonsync config`
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Hostname directory to use on the backup root
    #[arg(long)]
    pub hostname: Option<String>,

    /// Backup root: [user@]host:path or an absolute local path
    #[arg(long)]
    pub remote: Option<String>,

    /// SSH port of the backup host
    #[arg(long)]
    pub remote_port: Option<u16>,

    /// SSH identity file
    #[arg(long)]
    pub ssh_key: Option<PathBuf>,

    /// Days to keep snapshots
    #[arg(long, value_name = "DAYS")]
    pub retention_period: Option<i64>,

    /// Enable or disable verbose output by default
    #[arg(long, value_name = "BOOL")]
    pub set_verbose: Option<bool>,

    /// Enable or disable one-snapshot-per-day mode by default
    #[arg(long, value_name = "BOOL")]
    pub set_daily: Option<bool>,

    /// Restore journal location
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Add a directory to back up
    #[arg(long, value_name = "DIR")]
    pub add_source_dir: Vec<PathBuf>,

    /// Stop backing up a directory
    #[arg(long, value_name = "DIR")]
    pub remove_source_dir: Vec<PathBuf>,

    /// Add an exclusion pattern
    #[arg(long, value_name = "PATTERN")]
    pub add_exclusion: Vec<String>,

    /// Remove an exclusion pattern
    #[arg(long, value_name = "PATTERN")]
    pub remove_exclusion: Vec<String>,

    /// Print the configuration
    #[arg(long)]
    pub show: bool,
}

/// Handle `aeonsync config`
pub fn handle_config_command(
    paths: &AeonPaths,
    mut settings: Settings,
    args: ConfigArgs,
) -> AeonResult<()> {
    let changed = apply(&mut settings, args)?;

    if changed {
        settings.save(paths)?;
        println!("Configuration updated.");
    } else {
        println!("No changes.");
    }

    println!();
    println!("Config file: {}", paths.settings_file().display());
    print!("{}", format_settings(&settings));

    Ok(())
}

/// Apply the requested edits; returns whether anything changed
///
/// Nothing is applied unless every value is valid.
pub fn apply(settings: &mut Settings, args: ConfigArgs) -> AeonResult<bool> {
    if let Some(remote) = &args.remote {
        RemoteTarget::parse(remote)?;
    }
    if let Some(hostname) = &args.hostname {
        if hostname.trim().is_empty() || hostname.contains('/') {
            return Err(AeonError::Config(format!("Invalid hostname '{}'", hostname)));
        }
    }
    if let Some(days) = args.retention_period {
        if !(1..=MAX_RETENTION_DAYS).contains(&days) {
            return Err(AeonError::Validation(format!(
                "Retention period must be between 1 and {} days, got {}",
                MAX_RETENTION_DAYS, days
            )));
        }
    }

    let mut changed = false;

    if let Some(hostname) = args.hostname {
        changed |= replace(&mut settings.hostname, Some(hostname.trim().to_string()));
    }
    if let Some(remote) = args.remote {
        changed |= replace(&mut settings.remote, remote.trim().to_string());
    }
    if let Some(port) = args.remote_port {
        changed |= replace(&mut settings.remote_port, Some(port));
    }
    if let Some(key) = args.ssh_key {
        changed |= replace(&mut settings.ssh_key, Some(absolute_path(&key)?));
    }
    if let Some(days) = args.retention_period {
        changed |= replace(&mut settings.retention_period, days);
    }
    if let Some(verbose) = args.set_verbose {
        changed |= replace(&mut settings.verbose, verbose);
    }
    if let Some(daily) = args.set_daily {
        changed |= replace(&mut settings.daily, daily);
    }
    if let Some(log_file) = args.log_file {
        changed |= replace(&mut settings.log_file, Some(absolute_path(&log_file)?));
    }

    for dir in args.add_source_dir {
        changed |= settings.add_source_dir(absolute_path(&dir)?);
    }
    for dir in args.remove_source_dir {
        changed |= settings.remove_source_dir(absolute_path(&dir)?);
    }
    for pattern in args.add_exclusion {
        changed |= settings.add_exclusion(&pattern);
    }
    for pattern in args.remove_exclusion {
        changed |= settings.remove_exclusion(&pattern);
    }

    Ok(changed)
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_edits() {
        let mut settings = Settings::default();
        let args = ConfigArgs {
            remote: Some("backup@nas:/volume1/aeonsync".into()),
            retention_period: Some(30),
            set_daily: Some(true),
            add_source_dir: vec![PathBuf::from("/srv/www")],
            add_exclusion: vec!["*.iso".into()],
            ..ConfigArgs::default()
        };

        assert!(apply(&mut settings, args).unwrap());
        assert_eq!(settings.remote, "backup@nas:/volume1/aeonsync");
        assert_eq!(settings.retention_period, 30);
        assert!(settings.daily);
        assert!(settings.source_dirs.contains(&PathBuf::from("/srv/www")));
        assert!(settings.exclusions.contains(&"*.iso".to_string()));
    }

    #[test]
    fn test_unchanged_values_report_no_change() {
        let mut settings = Settings {
            retention_period: 30,
            ..Settings::default()
        };
        let args = ConfigArgs {
            retention_period: Some(30),
            set_verbose: Some(false),
            show: true,
            ..ConfigArgs::default()
        };
        assert!(!apply(&mut settings, args).unwrap());
    }

    #[test]
    fn test_invalid_values_change_nothing() {
        let mut settings = Settings::default();
        let before = settings.clone();

        let args = ConfigArgs {
            retention_period: Some(14),
            remote: Some("no-path-here".into()),
            ..ConfigArgs::default()
        };
        assert!(matches!(apply(&mut settings, args), Err(AeonError::Config(_))));

        let args = ConfigArgs {
            hostname: Some("a/b".into()),
            ..ConfigArgs::default()
        };
        assert!(matches!(apply(&mut settings, args), Err(AeonError::Config(_))));

        for days in [0, MAX_RETENTION_DAYS + 1, 200_000_000_000_000] {
            let args = ConfigArgs {
                retention_period: Some(days),
                ..ConfigArgs::default()
            };
            assert!(matches!(apply(&mut settings, args), Err(AeonError::Validation(_))));
        }

        assert_eq!(settings, before);
    }
}
