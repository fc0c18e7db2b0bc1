//! Remote command execution over SSH
//!
//! Authentication is left entirely to `ssh` itself (agent, identity file,
//! known hosts). The only thing interpreted here is ssh's own exit status
//! 255, which means the connection could not be made.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::{AeonError, AeonResult};

/// Exit status ssh uses for its own (connection) failures
const SSH_CONNECTION_FAILED: i32 = 255;

/// Result of a remote command that reached the host
#[derive(Debug, Clone)]
pub struct RemoteOutput {
    pub status: i32,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

impl RemoteOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Runs shell snippets on the backup host
#[derive(Debug, Clone)]
pub struct SshExecutor {
    login: String,
    port: Option<u16>,
    identity: Option<PathBuf>,
}

impl SshExecutor {
    pub fn new(login: impl Into<String>, port: Option<u16>, identity: Option<PathBuf>) -> Self {
        Self {
            login: login.into(),
            port,
            identity,
        }
    }

    /// `user@host` or `host`
    pub fn login(&self) -> &str {
        &self.login
    }

    /// ssh options shared by remote commands and rsync's `-e`
    pub fn ssh_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(identity) = &self.identity {
            args.push("-i".to_string());
            args.push(identity.display().to_string());
        }
        if let Some(port) = self.port {
            args.push("-p".to_string());
            args.push(port.to_string());
        }
        args
    }

    /// Remote shell command line for `rsync -e`
    pub fn rsync_shell(&self) -> String {
        let mut parts = vec!["ssh".to_string()];
        parts.extend(self.ssh_args().iter().map(|a| shell_quote(a)));
        parts.join(" ")
    }

    /// Run a script on the host, optionally feeding it stdin
    ///
    /// Returns the output for any exit status the script itself produced;
    /// a failed connection is `RemoteUnreachable`.
    pub fn run(&self, script: &str, stdin: Option<&[u8]>) -> AeonResult<RemoteOutput> {
        let mut cmd = Command::new("ssh");
        cmd.args(self.ssh_args()).arg(&self.login).arg(script);
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        cmd.stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });

        debug!("Running remote command on {}: {}", self.login, script);

        let mut child = cmd
            .spawn()
            .map_err(|e| AeonError::Command(format!("Failed to start ssh: {}", e)))?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input)
                .map_err(|e| AeonError::Command(format!("Failed to send data over ssh: {}", e)))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| AeonError::Command(format!("Failed to wait for ssh: {}", e)))?;

        let status = output.status.code().unwrap_or(-1);
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if status == SSH_CONNECTION_FAILED {
            return Err(AeonError::RemoteUnreachable(format!("{}: {}", self.login, stderr)));
        }

        Ok(RemoteOutput {
            status,
            stdout: output.stdout,
            stderr,
        })
    }

    /// Run a script and fail on any non-zero exit status
    pub fn run_checked(&self, script: &str, stdin: Option<&[u8]>) -> AeonResult<RemoteOutput> {
        let output = self.run(script, stdin)?;
        if !output.success() {
            return Err(AeonError::Command(format!(
                "Remote command failed with status {}: {}",
                output.status, output.stderr
            )));
        }
        Ok(output)
    }
}

/// Quote a string for a POSIX shell
pub fn shell_quote(s: &str) -> String {
    if !s.is_empty()
        && s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"/._-+:@=,".contains(&b))
    {
        return s.to_string();
    }
    format!("'{}'", s.replace('\'', "'\\''"))
}
