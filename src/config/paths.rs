//! Path management for AeonSync
//!
//! Resolves where the persisted configuration and the restore journal live.
//!
//! ## Path Resolution Order
//!
//! 1. `AEONSYNC_CONFIG_DIR` environment variable (if set)
//! 2. The platform config directory from `directories`
//!    (`~/.config/aeonsync` on Linux, `~/Library/Application Support/aeonsync` on macOS,
//!    `%APPDATA%\aeonsync\config` on Windows)

use std::path::PathBuf;

use directories::ProjectDirs;

use crate::error::AeonError;

/// Environment variable overriding the config directory
pub const CONFIG_DIR_ENV: &str = "AEONSYNC_CONFIG_DIR";

/// Manages all local paths used by AeonSync
#[derive(Debug, Clone)]
pub struct AeonPaths {
    /// Directory holding config.json and the restore journal
    base_dir: PathBuf,
}

impl AeonPaths {
    /// Create a new AeonPaths instance
    ///
    /// # Errors
    ///
    /// Returns an error if no home directory can be determined.
    pub fn new() -> Result<Self, AeonError> {
        let base_dir = match std::env::var_os(CONFIG_DIR_ENV) {
            Some(custom) if !custom.is_empty() => PathBuf::from(custom),
            _ => ProjectDirs::from("", "", "aeonsync")
                .map(|dirs| dirs.config_dir().to_path_buf())
                .ok_or_else(|| {
                    AeonError::Config("Could not determine the configuration directory".into())
                })?,
        };

        Ok(Self { base_dir })
    }

    /// Create AeonPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the path to the settings file
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the default path of the restore journal
    pub fn restore_log(&self) -> PathBuf {
        self.base_dir.join("restore.log")
    }

    /// Ensure the config directory exists
    pub fn ensure_directories(&self) -> Result<(), AeonError> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| AeonError::Io(format!("Failed to create config directory: {}", e)))
    }
}
