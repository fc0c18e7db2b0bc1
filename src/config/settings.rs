//! User settings for AeonSync
//!
//! Manages the persisted configuration: where backups go, what gets backed
//! up, what gets skipped and how long snapshots are retained.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::paths::AeonPaths;
use crate::error::AeonError;
use crate::storage::file_io::write_json_atomic;

/// Retention period used when nothing else is configured
pub const DEFAULT_RETENTION_DAYS: i64 = 7;

/// Exclusion patterns applied to every fresh configuration
pub const DEFAULT_EXCLUSIONS: &[&str] = &[
    ".cache",
    "*/caches/*",
    ".local/share/Trash",
    "*/node_modules",
    "*/.venv",
    "*/venv",
    "*/__pycache__",
    "*/.gradle",
    "*/build",
    "*/target",
    "*/.cargo",
    "*/dist",
    "*/.npm",
    "*/.yarn",
    "*/.pub-cache",
];

/// User settings for AeonSync
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Hostname used as the per-machine directory on the backup root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    /// Backup root, `[user@]host:path` or an absolute local path
    #[serde(default)]
    pub remote: String,

    /// SSH port of the backup host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_port: Option<u16>,

    /// SSH identity file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_key: Option<PathBuf>,

    /// Directories to back up
    #[serde(default = "default_source_dirs")]
    pub source_dirs: Vec<PathBuf>,

    /// Exclusion glob patterns handed to rsync
    #[serde(default = "default_exclusions")]
    pub exclusions: Vec<String>,

    /// Number of days snapshots are kept
    #[serde(default = "default_retention_period")]
    pub retention_period: i64,

    /// At most one snapshot per day
    #[serde(default)]
    pub daily: bool,

    /// Verbose logging and transfer progress
    #[serde(default)]
    pub verbose: bool,

    /// Restore journal location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

fn default_schema_version() -> u32 {
    1
}

fn default_source_dirs() -> Vec<PathBuf> {
    directories::UserDirs::new()
        .map(|dirs| vec![dirs.home_dir().to_path_buf()])
        .unwrap_or_default()
}

fn default_exclusions() -> Vec<String> {
    DEFAULT_EXCLUSIONS.iter().map(|s| s.to_string()).collect()
}

fn default_retention_period() -> i64 {
    DEFAULT_RETENTION_DAYS
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            hostname: None,
            remote: String::new(),
            remote_port: None,
            ssh_key: None,
            source_dirs: default_source_dirs(),
            exclusions: default_exclusions(),
            retention_period: default_retention_period(),
            daily: false,
            verbose: false,
            log_file: None,
        }
    }
}

impl Settings {
    /// Load settings from disk, or create default settings if file doesn't exist
    pub fn load_or_create(paths: &AeonPaths) -> Result<Self, AeonError> {
        let settings_path = paths.settings_file();

        if settings_path.exists() {
            let contents = std::fs::read_to_string(&settings_path)
                .map_err(|e| AeonError::Io(format!("Failed to read settings file: {}", e)))?;

            let settings: Settings = serde_json::from_str(&contents).map_err(|e| {
                AeonError::Config(format!("Failed to parse settings file: {}", e))
            })?;

            Ok(settings)
        } else {
            // Don't save yet - let caller decide when to persist
            Ok(Settings::default())
        }
    }

    /// Save settings to disk
    pub fn save(&self, paths: &AeonPaths) -> Result<(), AeonError> {
        paths.ensure_directories()?;
        write_json_atomic(paths.settings_file(), self)
    }

    /// Add a source directory; returns false if it was already listed
    pub fn add_source_dir(&mut self, dir: impl AsRef<Path>) -> bool {
        add_unique(&mut self.source_dirs, dir.as_ref().to_path_buf())
    }

    /// Remove a source directory; returns false if it was not listed
    pub fn remove_source_dir(&mut self, dir: impl AsRef<Path>) -> bool {
        remove_item(&mut self.source_dirs, dir.as_ref())
    }

    /// Add an exclusion pattern; returns false if it was already listed
    pub fn add_exclusion(&mut self, pattern: &str) -> bool {
        add_unique(&mut self.exclusions, pattern.to_string())
    }

    /// Remove an exclusion pattern; returns false if it was not listed
    pub fn remove_exclusion(&mut self, pattern: &str) -> bool {
        remove_item(&mut self.exclusions, pattern)
    }

    /// Settings as (key, value) rows for display
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        let join_paths = |items: &[PathBuf]| {
            items
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };

        vec![
            ("hostname", self.hostname.clone().unwrap_or_else(|| format!("{} (system)", system_hostname()))),
            ("remote", if self.remote.is_empty() { "(not set)".into() } else { self.remote.clone() }),
            ("remote_port", self.remote_port.map_or_else(|| "(default)".into(), |p| p.to_string())),
            ("ssh_key", self.ssh_key.as_ref().map_or_else(|| "(default)".into(), |p| p.display().to_string())),
            ("source_dirs", join_paths(&self.source_dirs)),
            ("exclusions", self.exclusions.join(", ")),
            ("retention_period", format!("{} days", self.retention_period)),
            ("daily", self.daily.to_string()),
            ("verbose", self.verbose.to_string()),
            ("log_file", self.log_file.as_ref().map_or_else(|| "(default)".into(), |p| p.display().to_string())),
        ]
    }
}

fn add_unique<T: PartialEq>(items: &mut Vec<T>, item: T) -> bool {
    if items.contains(&item) {
        return false;
    }
    items.push(item);
    true
}

fn remove_item<T, Q>(items: &mut Vec<T>, item: &Q) -> bool
where
    T: PartialEq<Q>,
    Q: ?Sized,
{
    let before = items.len();
    items.retain(|existing| existing != item);
    items.len() != before
}

/// Best-effort hostname of this machine
pub fn system_hostname() -> String {
    if let Ok(name) = std::env::var("HOSTNAME") {
        if !name.trim().is_empty() {
            return name.trim().to_string();
        }
    }

    if let Ok(name) = std::fs::read_to_string("/etc/hostname") {
        if !name.trim().is_empty() {
            return name.trim().to_string();
        }
    }

    std::process::Command::new("hostname")
        .output()
        .ok()
        .filter(|out| out.status.success())
        .map(|out| String::from_utf8_lossy(&out.stdout).trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.retention_period, 7);
        assert!(!settings.daily);
        assert!(settings.exclusions.contains(&"*/node_modules".to_string()));
        assert!(settings.remote.is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let paths = AeonPaths::with_base_dir(temp_dir.path().to_path_buf());

        let mut settings = Settings::default();
        settings.remote = "backup@nas:/volume1/aeonsync".into();
        settings.retention_period = 30;
        settings.remote_port = Some(2222);

        settings.save(&paths).unwrap();

        let loaded = Settings::load_or_create(&paths).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let paths = AeonPaths::with_base_dir(temp_dir.path().to_path_buf());
        paths.ensure_directories().unwrap();
        std::fs::write(paths.settings_file(), r#"{"remote": "/mnt/backups"}"#).unwrap();

        let loaded = Settings::load_or_create(&paths).unwrap();
        assert_eq!(loaded.remote, "/mnt/backups");
        assert_eq!(loaded.retention_period, DEFAULT_RETENTION_DAYS);
        assert_eq!(loaded.exclusions.len(), DEFAULT_EXCLUSIONS.len());
    }

    #[test]
    fn test_corrupt_settings_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let paths = AeonPaths::with_base_dir(temp_dir.path().to_path_buf());
        paths.ensure_directories().unwrap();
        std::fs::write(paths.settings_file(), "not json").unwrap();

        let err = Settings::load_or_create(&paths).unwrap_err();
        assert!(matches!(err, AeonError::Config(_)));
    }

    #[test]
    fn test_list_edits() {
        let mut settings = Settings::default();

        assert!(settings.add_source_dir("/srv/www"));
        assert!(!settings.add_source_dir("/srv/www"));
        assert!(settings.source_dirs.contains(&PathBuf::from("/srv/www")));
        assert!(settings.remove_source_dir("/srv/www"));
        assert!(!settings.remove_source_dir("/srv/www"));

        assert!(settings.add_exclusion("*.tmp"));
        assert!(settings.exclusions.contains(&"*.tmp".to_string()));
        assert!(settings.remove_exclusion("*.tmp"));
        assert!(!settings.exclusions.contains(&"*.tmp".to_string()));
    }
}
