//! Backup target parsing
//!
//! A target is either `[user@]host:path` (reached over SSH) or an absolute
//! path on a locally mounted filesystem.

use std::fmt;
use std::path::PathBuf;

use crate::error::AeonError;

/// Where the backup root lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteTarget {
    /// Absolute path on this machine
    Local(PathBuf),
    /// Path on an SSH-reachable host
    Ssh {
        user: Option<String>,
        host: String,
        path: String,
    },
}

impl RemoteTarget {
    /// Parse a target string
    pub fn parse(s: &str) -> Result<Self, AeonError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AeonError::Config(
                "No backup target configured. Set one with: aeonsync config --remote [user@]host:path"
                    .into(),
            ));
        }

        if s.starts_with('/') {
            return Ok(Self::Local(PathBuf::from(s)));
        }

        let invalid = || AeonError::Config(format!("Invalid remote '{}'. Use [user@]host:path", s));

        let (login, path) = s.split_once(':').ok_or_else(invalid)?;
        if path.is_empty() {
            return Err(invalid());
        }

        let (user, host) = match login.split_once('@') {
            Some((user, host)) if !user.is_empty() => (Some(user.to_string()), host),
            Some(_) => return Err(invalid()),
            None => (None, login),
        };

        if host.is_empty() || host.contains('/') {
            return Err(invalid());
        }

        Ok(Self::Ssh {
            user,
            host: host.to_string(),
            path: path.to_string(),
        })
    }

    /// `user@host` or `host`, as ssh and rsync expect it
    pub fn login(&self) -> Option<String> {
        match self {
            Self::Local(_) => None,
            Self::Ssh { user: Some(user), host, .. } => Some(format!("{}@{}", user, host)),
            Self::Ssh { user: None, host, .. } => Some(host.clone()),
        }
    }

    /// Path of the backup root on the target filesystem
    pub fn root_path(&self) -> String {
        match self {
            Self::Local(path) => path.display().to_string(),
            Self::Ssh { path, .. } => path.clone(),
        }
    }
}

impl fmt::Display for RemoteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Ssh { path, .. } => write!(f, "{}:{}", self.login().unwrap_or_default(), path),
        }
    }
}
