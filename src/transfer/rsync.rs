//! rsync-backed transfer
//!
//! Backups run `rsync -az --delete --stats` with `--link-dest` pointing at
//! the previous snapshot, so unchanged files become hard links. Remote
//! targets go through `-e "ssh ..."`.

use std::process::Command;

use tracing::{debug, info};

use super::{FetchRequest, PushRequest, Transfer, TransferOutcome};
use crate::config::BackupConfig;
use crate::error::{AeonError, AeonResult};
use crate::models::{TransferStats, INCOMPLETE_MARKER_NAME, METADATA_FILE_NAME};
use crate::storage::{ssh_executor, SshExecutor};

/// Some files could not be transferred
const PARTIAL_TRANSFER: i32 = 23;
/// Source files vanished during the transfer
const VANISHED_FILES: i32 = 24;
/// The remote shell could not connect
const REMOTE_SHELL_FAILED: i32 = 255;

/// Runs the `rsync` binary
#[derive(Debug, Clone, Default)]
pub struct RsyncTransfer {
    /// Value for `-e`, set for remote targets
    remote_shell: Option<String>,
}

impl RsyncTransfer {
    /// Transfer between local paths
    pub fn local() -> Self {
        Self::default()
    }

    /// Transfer to and from a host reached through `executor`'s ssh options
    pub fn over_ssh(executor: &SshExecutor) -> Self {
        Self {
            remote_shell: Some(executor.rsync_shell()),
        }
    }

    /// Transfer matching a configured backup target
    pub fn for_config(config: &BackupConfig) -> Self {
        match ssh_executor(config) {
            Some(executor) => Self::over_ssh(&executor),
            None => Self::local(),
        }
    }

    /// Arguments for a backup run, without the program name
    pub fn push_args(&self, request: &PushRequest) -> Vec<String> {
        let mut args = vec!["-az".to_string(), "--delete".to_string(), "--stats".to_string()];

        // The snapshot's own bookkeeping must survive --delete
        for name in [METADATA_FILE_NAME, INCOMPLETE_MARKER_NAME] {
            args.push(format!("--filter=P /{}", name));
        }
        for pattern in &request.exclusions {
            args.push(format!("--exclude={}", pattern));
        }
        if let Some(link) = &request.link_source {
            args.push(format!("--link-dest={}", link));
        }
        if request.dry_run {
            args.push("--dry-run".to_string());
        }
        if request.verbose {
            args.push("--verbose".to_string());
            args.push("--progress".to_string());
        }
        self.push_shell(&mut args);

        args.extend(request.sources.iter().map(|s| s.display().to_string()));
        args.push(format!("{}/", request.destination.trim_end_matches('/')));
        args
    }

    /// Arguments for a restore run, without the program name
    pub fn fetch_args(&self, request: &FetchRequest) -> Vec<String> {
        let mut args = vec!["-a".to_string()];
        if request.verbose {
            args.push("--verbose".to_string());
            args.push("--progress".to_string());
        }
        self.push_shell(&mut args);

        if request.is_dir {
            args.push(format!("{}/", request.source.trim_end_matches('/')));
            args.push(format!("{}/", request.destination.display()));
        } else {
            args.push(request.source.clone());
            args.push(request.destination.display().to_string());
        }
        args
    }

    fn push_shell(&self, args: &mut Vec<String>) {
        if let Some(shell) = &self.remote_shell {
            args.push("-e".to_string());
            args.push(shell.clone());
        }
    }

    fn run(&self, args: &[String]) -> AeonResult<TransferOutcome> {
        debug!("Running rsync {}", args.join(" "));

        let output = Command::new("rsync")
            .args(args)
            .output()
            .map_err(|e| AeonError::Command(format!("Failed to start rsync: {}", e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        classify(output.status.code().unwrap_or(-1), &stdout, &stderr)
    }
}

impl Transfer for RsyncTransfer {
    fn push(&self, request: &PushRequest) -> AeonResult<TransferOutcome> {
        info!(
            "Syncing {} source(s) to {}",
            request.sources.len(),
            request.destination
        );
        self.run(&self.push_args(request))
    }

    fn fetch(&self, request: &FetchRequest) -> AeonResult<TransferOutcome> {
        info!(
            "Fetching {} to {}",
            request.source,
            request.destination.display()
        );
        self.run(&self.fetch_args(request))
    }
}

/// Map rsync's exit status and output to an outcome
pub fn classify(status: i32, stdout: &str, stderr: &str) -> AeonResult<TransferOutcome> {
    let stats = parse_stats(stdout);
    match status {
        0 => Ok(TransferOutcome::Success(stats)),
        PARTIAL_TRANSFER | VANISHED_FILES => Ok(TransferOutcome::Partial {
            stats,
            warnings: count_warnings(stderr),
        }),
        REMOTE_SHELL_FAILED => Err(AeonError::RemoteUnreachable(last_line(stderr))),
        _ => Ok(TransferOutcome::Failed(format!(
            "rsync exited with status {}: {}",
            status,
            last_line(stderr)
        ))),
    }
}

/// Pull file count and total size out of the `--stats` block
pub fn parse_stats(stdout: &str) -> TransferStats {
    let mut stats = TransferStats::default();
    for line in stdout.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("Number of files:") {
            stats.file_count = leading_number(rest).unwrap_or(0);
        } else if let Some(rest) = line.strip_prefix("Total file size:") {
            stats.total_size = leading_number(rest).unwrap_or(0);
        }
    }
    stats
}

/// First number in `s`, ignoring thousands separators
fn leading_number(s: &str) -> Option<u64> {
    let digits: String = s
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ',')
        .filter(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

fn count_warnings(stderr: &str) -> u32 {
    let count = stderr
        .lines()
        .filter(|l| l.starts_with("rsync:") || l.contains("file has vanished"))
        .count();
    u32::try_from(count).unwrap_or(u32::MAX).max(1)
}

fn last_line(stderr: &str) -> String {
    stderr
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("no error output")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const STATS: &str = "\
Number of files: 1,234 (reg: 1,000, dir: 234)
Number of created files: 12
Number of regular files transferred: 12
Total file size: 5,678,901 bytes
Total transferred file size: 42 bytes
";

    fn push_request() -> PushRequest {
        PushRequest {
            sources: vec![PathBuf::from("/home/user"), PathBuf::from("/srv/www")],
            destination: "backup@nas:/volume1/aeonsync/laptop/2024-03-14".into(),
            link_source: Some("/volume1/aeonsync/laptop/2024-03-13".into()),
            exclusions: vec!["*/node_modules".into(), ".cache".into()],
            verbose: false,
            dry_run: false,
        }
    }

    #[test]
    fn test_push_args() {
        let executor = SshExecutor::new("backup@nas", Some(2222), None);
        let args = RsyncTransfer::over_ssh(&executor).push_args(&push_request());

        assert_eq!(&args[..3], &["-az", "--delete", "--stats"]);
        assert!(args.contains(&"--filter=P /backup_metadata.json".to_string()));
        assert!(args.contains(&"--exclude=*/node_modules".to_string()));
        assert!(args.contains(&"--link-dest=/volume1/aeonsync/laptop/2024-03-13".to_string()));
        assert!(!args.contains(&"--dry-run".to_string()));

        let e = args.iter().position(|a| a == "-e").unwrap();
        assert_eq!(args[e + 1], "ssh -p 2222");

        let n = args.len();
        assert_eq!(args[n - 3], "/home/user");
        assert_eq!(args[n - 2], "/srv/www");
        assert_eq!(args[n - 1], "backup@nas:/volume1/aeonsync/laptop/2024-03-14/");
    }

    #[test]
    fn test_push_args_first_snapshot_dry_run() {
        let request = PushRequest {
            link_source: None,
            dry_run: true,
            verbose: true,
            destination: "/mnt/backups/laptop/2024-03-14".into(),
            ..push_request()
        };
        let args = RsyncTransfer::local().push_args(&request);

        assert!(!args.iter().any(|a| a.starts_with("--link-dest")));
        assert!(!args.contains(&"-e".to_string()));
        assert!(args.contains(&"--dry-run".to_string()));
        assert!(args.contains(&"--progress".to_string()));
    }

    #[test]
    fn test_fetch_args_directory_copies_contents() {
        let request = FetchRequest {
            source: "/mnt/backups/laptop/2024-03-14/user/docs".into(),
            destination: PathBuf::from("/home/user/docs"),
            is_dir: true,
            verbose: false,
        };
        let args = RsyncTransfer::local().fetch_args(&request);
        assert_eq!(
            args,
            vec!["-a", "/mnt/backups/laptop/2024-03-14/user/docs/", "/home/user/docs/"]
        );
    }

    #[test]
    fn test_parse_stats() {
        let stats = parse_stats(STATS);
        assert_eq!(stats.file_count, 1234);
        assert_eq!(stats.total_size, 5_678_901);
        assert_eq!(parse_stats("nothing here"), TransferStats::default());
    }

    #[test]
    fn test_classify_exit_codes() {
        assert!(matches!(classify(0, STATS, "").unwrap(), TransferOutcome::Success(_)));

        let partial = classify(
            24,
            STATS,
            "file has vanished: \"/home/user/tmp/a\"\nrsync warning: some files vanished (code 24)\n",
        )
        .unwrap();
        assert!(matches!(partial, TransferOutcome::Partial { warnings: 1, .. }));

        let partial = classify(23, "", "").unwrap();
        assert!(matches!(partial, TransferOutcome::Partial { warnings: 1, .. }));

        let failed = classify(11, "", "rsync error: error in file IO (code 11)\n").unwrap();
        assert_eq!(
            failed,
            TransferOutcome::Failed(
                "rsync exited with status 11: rsync error: error in file IO (code 11)".into()
            )
        );

        let err = classify(255, "", "ssh: connect to host nas port 22: Connection refused\n")
            .unwrap_err();
        assert!(matches!(err, AeonError::RemoteUnreachable(_)));
    }
}
