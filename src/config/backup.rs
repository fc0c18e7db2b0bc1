//! Effective configuration for a single invocation
//!
//! Layers the built-in defaults, the persisted [`Settings`] and the
//! command-line overrides into one immutable [`BackupConfig`]. Precedence,
//! lowest first: default, settings file, command-line flag.

use std::path::{Path, PathBuf};

use super::paths::AeonPaths;
use super::remote::RemoteTarget;
use super::settings::{system_hostname, Settings};
use crate::error::{AeonError, AeonResult};
use crate::models::{RetentionPolicy, MAX_RETENTION_DAYS};

/// Values given on the command line; `None`/empty means "not given"
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub remote: Option<String>,
    pub hostname: Option<String>,
    pub ssh_key: Option<PathBuf>,
    pub remote_port: Option<u16>,
    pub sources: Vec<PathBuf>,
    pub retention_days: Option<i64>,
    pub daily: bool,
    pub dry_run: bool,
    pub verbose: bool,
}

/// Fully resolved configuration, passed by reference into each component
#[derive(Debug, Clone)]
pub struct BackupConfig {
    pub target: RemoteTarget,
    pub hostname: String,
    pub sources: Vec<PathBuf>,
    pub exclusions: Vec<String>,
    pub ssh_key: Option<PathBuf>,
    pub remote_port: Option<u16>,
    pub retention: RetentionPolicy,
    pub daily: bool,
    pub dry_run: bool,
    pub verbose: bool,
    pub restore_log: PathBuf,
}

impl BackupConfig {
    /// Resolve the effective configuration
    pub fn resolve(
        settings: &Settings,
        overrides: &ConfigOverrides,
        paths: &AeonPaths,
    ) -> AeonResult<Self> {
        let remote = overrides.remote.as_deref().unwrap_or(&settings.remote);
        let target = RemoteTarget::parse(remote)?;

        let hostname = overrides
            .hostname
            .clone()
            .or_else(|| settings.hostname.clone())
            .unwrap_or_else(system_hostname);
        if hostname.is_empty() || hostname.contains('/') {
            return Err(AeonError::Config(format!("Invalid hostname '{}'", hostname)));
        }

        let sources = if overrides.sources.is_empty() {
            &settings.source_dirs
        } else {
            &overrides.sources
        };
        let sources = sources
            .iter()
            .map(|p| absolute_path(p))
            .collect::<AeonResult<Vec<_>>>()?;

        let retention =
            RetentionPolicy::new(overrides.retention_days.unwrap_or(settings.retention_period));
        if !retention.is_within_bounds() {
            return Err(AeonError::Validation(format!(
                "Retention period must be within {} days, got {}",
                MAX_RETENTION_DAYS, retention.days
            )));
        }

        Ok(Self {
            target,
            hostname,
            sources,
            exclusions: settings.exclusions.clone(),
            ssh_key: overrides.ssh_key.clone().or_else(|| settings.ssh_key.clone()),
            remote_port: overrides.remote_port.or(settings.remote_port),
            retention,
            daily: overrides.daily || settings.daily,
            dry_run: overrides.dry_run,
            verbose: overrides.verbose || settings.verbose,
            restore_log: settings
                .log_file
                .clone()
                .unwrap_or_else(|| paths.restore_log()),
        })
    }

    /// Path of this machine's directory on the backup target
    pub fn host_root(&self) -> String {
        format!("{}/{}", self.target.root_path().trim_end_matches('/'), self.hostname)
    }
}

/// Make a path absolute against the current directory
pub fn absolute_path(path: &Path) -> AeonResult<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir()
        .map_err(|e| AeonError::Io(format!("Failed to read current directory: {}", e)))?;
    Ok(cwd.join(path))
}
