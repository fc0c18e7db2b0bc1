//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the backup and restore layers.

pub mod config;
pub mod list;
pub mod restore;
pub mod sync;

pub use config::{handle_config_command, ConfigArgs};
pub use list::handle_list_command;
pub use restore::{handle_restore_command, RestoreArgs};
pub use sync::{handle_sync_command, SyncArgs};

use std::io::{self, Write};
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Args;

pub use crate::config::absolute_path;
use crate::config::{AeonPaths, BackupConfig, ConfigOverrides, Settings};
use crate::error::{AeonError, AeonResult};

/// Options selecting the backup target, shared by every command that
/// talks to it
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Backup root: [user@]host:path or an absolute local path
    #[arg(long, env = "AEONSYNC_REMOTE")]
    pub remote: Option<String>,

    /// SSH identity file
    #[arg(long, env = "AEONSYNC_SSH_KEY")]
    pub ssh_key: Option<PathBuf>,

    /// SSH port of the backup host
    #[arg(long, visible_alias = "port")]
    pub remote_port: Option<u16>,

    /// Hostname directory to use on the backup root
    #[arg(long)]
    pub hostname: Option<String>,
}

impl TargetArgs {
    /// Command-line layer of the configuration
    pub fn overrides(&self, verbose: bool) -> ConfigOverrides {
        ConfigOverrides {
            remote: self.remote.clone(),
            hostname: self.hostname.clone(),
            ssh_key: self.ssh_key.clone(),
            remote_port: self.remote_port,
            verbose,
            ..ConfigOverrides::default()
        }
    }
}

/// Resolve the effective configuration for one invocation
pub fn resolve_config(
    paths: &AeonPaths,
    settings: &Settings,
    overrides: &ConfigOverrides,
) -> AeonResult<BackupConfig> {
    BackupConfig::resolve(settings, overrides, paths)
}

/// Parse a `YYYY-MM-DD` argument
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| format!("invalid date '{}', expected YYYY-MM-DD", s))
}

/// Prompt for a string input
pub fn prompt_string(prompt: &str) -> AeonResult<String> {
    print!("{}", prompt);
    io::stdout().flush().map_err(|e| AeonError::Io(e.to_string()))?;

    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .map_err(|e| AeonError::Io(e.to_string()))?;

    Ok(input.trim().to_string())
}

/// Ask a yes/no question; anything but yes is no
pub fn confirm(prompt: &str) -> AeonResult<bool> {
    let answer = prompt_string(&format!("{} (yes/no) [no]: ", prompt))?;
    Ok(matches!(answer.to_lowercase().as_str(), "y" | "yes"))
}
