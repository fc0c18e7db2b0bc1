//! Configuration module for AeonSync
//!
//! This module provides configuration management including:
//! - Config directory resolution
//! - Persisted user settings
//! - Backup target parsing
//! - Layered resolution of the effective per-invocation configuration

pub mod backup;
pub mod paths;
pub mod remote;
pub mod settings;

pub use backup::{absolute_path, BackupConfig, ConfigOverrides};
pub use paths::AeonPaths;
pub use remote::RemoteTarget;
pub use settings::Settings;
