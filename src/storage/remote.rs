//! Store on an SSH-reachable host
//!
//! Each operation is one short POSIX shell snippet run through
//! [`SshExecutor`]. The scan prints every snapshot directory together with
//! its metadata and marker files in a single round trip, framed with ASCII
//! record (0x1E) and group (0x1D) separators.

use std::path::Path;

use chrono::{DateTime, Utc};

use super::ssh::{shell_quote, SshExecutor};
use super::store::{join_remote, PathInfo, RawEntry, SnapshotStore, LATEST_ALIAS};
use crate::error::{AeonError, AeonResult};
use crate::models::{SnapshotId, INCOMPLETE_MARKER_NAME, METADATA_FILE_NAME};

const RECORD_SEP: char = '\u{1e}';
const SECTION_SEP: char = '\u{1d}';

/// Exit status the create script uses for "directory already exists"
const EXISTS_STATUS: i32 = 73;

/// Exit status the stat script uses for "no such path"
const MISSING_STATUS: i32 = 3;

/// Snapshot store on a remote host directory
#[derive(Debug, Clone)]
pub struct RemoteStore {
    executor: SshExecutor,
    host_root: String,
}

impl RemoteStore {
    /// Create a store for `<backup root>/<hostname>` on the executor's host
    pub fn new(executor: SshExecutor, host_root: impl Into<String>) -> Self {
        Self {
            executor,
            host_root: host_root.into(),
        }
    }

    fn dir(&self, id: &SnapshotId) -> String {
        format!("{}/{}", self.host_root.trim_end_matches('/'), id)
    }

    fn scan_script(&self) -> String {
        format!(
            "root={root}; [ -d \"$root\" ] || exit 0; cd \"$root\" || exit 1; \
             for d in */; do d=\"${{d%/}}\"; [ -d \"$d\" ] || continue; [ -L \"$d\" ] && continue; \
             printf '\\036%s\\n' \"$d\"; \
             if [ -f \"$d/{meta}\" ]; then printf '\\035M\\n'; cat \"$d/{meta}\"; fi; \
             if [ -f \"$d/{marker}\" ]; then printf '\\035I\\n'; cat \"$d/{marker}\"; fi; \
             done",
            root = shell_quote(&self.host_root),
            meta = METADATA_FILE_NAME,
            marker = INCOMPLETE_MARKER_NAME,
        )
    }

    fn create_script(&self, id: &SnapshotId) -> String {
        let dir = shell_quote(&self.dir(id));
        format!(
            "mkdir -p {root} && mkdir {dir} 2>/dev/null || {{ [ -e {dir} ] && exit {exists}; exit 1; }}",
            root = shell_quote(&self.host_root),
            dir = dir,
            exists = EXISTS_STATUS,
        )
    }

    fn stat_script(&self, path: &str) -> String {
        let path = shell_quote(path);
        format!(
            "[ -e {p} ] || exit {missing}; if [ -d {p} ]; then t=d; else t=f; fi; \
             printf '%s ' \"$t\"; stat -c '%s %Y' {p}",
            p = path,
            missing = MISSING_STATUS,
        )
    }
}

impl SnapshotStore for RemoteStore {
    fn location(&self) -> String {
        format!("{}:{}", self.executor.login(), self.host_root)
    }

    fn scan(&self) -> AeonResult<Vec<RawEntry>> {
        let output = self.executor.run_checked(&self.scan_script(), None)?;
        Ok(parse_scan_output(&String::from_utf8_lossy(&output.stdout)))
    }

    fn create_snapshot_dir(&self, id: &SnapshotId) -> AeonResult<()> {
        let output = self.executor.run(&self.create_script(id), None)?;
        match output.status {
            0 => Ok(()),
            EXISTS_STATUS => Err(AeonError::ConcurrentSync(self.location_of(id))),
            status => Err(AeonError::Command(format!(
                "Failed to create snapshot directory {} (status {}): {}",
                self.location_of(id),
                status,
                output.stderr
            ))),
        }
    }

    fn write_file(&self, id: &SnapshotId, name: &str, contents: &[u8]) -> AeonResult<()> {
        let dest = format!("{}/{}", self.dir(id), name);
        let temp = format!("{}.tmp", dest);
        let script = format!(
            "cat > {tmp} && mv -f {tmp} {dest}",
            tmp = shell_quote(&temp),
            dest = shell_quote(&dest),
        );
        self.executor.run_checked(&script, Some(contents))?;
        Ok(())
    }

    fn remove_file(&self, id: &SnapshotId, name: &str) -> AeonResult<()> {
        let path = format!("{}/{}", self.dir(id), name);
        self.executor
            .run_checked(&format!("rm -f {}", shell_quote(&path)), None)?;
        Ok(())
    }

    fn remove_snapshot(&self, id: &SnapshotId) -> AeonResult<()> {
        self.executor
            .run_checked(&format!("rm -rf {}", shell_quote(&self.dir(id))), None)?;
        Ok(())
    }

    fn update_latest(&self, id: &SnapshotId) -> AeonResult<()> {
        let alias = format!("{}/{}", self.host_root.trim_end_matches('/'), LATEST_ALIAS);
        let script = format!(
            "ln -snf {} {}",
            shell_quote(&id.to_string()),
            shell_quote(&alias)
        );
        self.executor.run_checked(&script, None)?;
        Ok(())
    }

    fn stat(&self, id: &SnapshotId, rel: &Path) -> AeonResult<Option<PathInfo>> {
        let path = join_remote(&self.dir(id), rel);
        let output = self.executor.run(&self.stat_script(&path), None)?;
        match output.status {
            0 => parse_stat_output(&String::from_utf8_lossy(&output.stdout))
                .map(Some)
                .ok_or_else(|| AeonError::Command(format!("Unexpected stat output for {}", path))),
            MISSING_STATUS => Ok(None),
            status => Err(AeonError::Command(format!(
                "Failed to stat {} (status {}): {}",
                path, status, output.stderr
            ))),
        }
    }

    fn read(&self, id: &SnapshotId, rel: &Path, limit: usize) -> AeonResult<Vec<u8>> {
        let path = join_remote(&self.dir(id), rel);
        let script = format!("head -c {} {}", limit, shell_quote(&path));
        Ok(self.executor.run_checked(&script, None)?.stdout)
    }

    fn snapshot_path(&self, id: &SnapshotId) -> String {
        self.dir(id)
    }

    fn transfer_location(&self, id: &SnapshotId, rel: Option<&Path>) -> String {
        let path = match rel {
            Some(rel) => join_remote(&self.dir(id), rel),
            None => self.dir(id),
        };
        format!("{}:{}", self.executor.login(), path)
    }
}

impl RemoteStore {
    fn location_of(&self, id: &SnapshotId) -> String {
        format!("{}:{}", self.executor.login(), self.dir(id))
    }
}

/// Split the framed scan output into entries
pub fn parse_scan_output(output: &str) -> Vec<RawEntry> {
    output
        .split(RECORD_SEP)
        .skip(1)
        .filter_map(|record| {
            let mut sections = record.split(SECTION_SEP);
            let name = sections.next()?.trim_end_matches('\n').to_string();
            if name.is_empty() {
                return None;
            }

            let mut entry = RawEntry {
                name,
                ..RawEntry::default()
            };
            for section in sections {
                let (tag, body) = section.split_once('\n').unwrap_or((section, ""));
                match tag {
                    "M" => entry.metadata = Some(body.to_string()),
                    "I" => entry.marker = Some(body.to_string()),
                    _ => {}
                }
            }
            Some(entry)
        })
        .collect()
}

/// Parse `<d|f> <size> <mtime>`
fn parse_stat_output(output: &str) -> Option<PathInfo> {
    let mut parts = output.split_whitespace();
    let is_dir = match parts.next()? {
        "d" => true,
        "f" => false,
        _ => return None,
    };
    let size = parts.next()?.parse().ok()?;
    let modified = parts
        .next()
        .and_then(|s| s.parse::<i64>().ok())
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));

    Some(PathInfo {
        is_dir,
        size,
        modified,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> RemoteStore {
        RemoteStore::new(
            SshExecutor::new("backup@nas", None, None),
            "/volume1/aeonsync/laptop",
        )
    }

    #[test]
    fn test_parse_scan_output() {
        let output = "\u{1e}2024-03-13\n\u{1d}M\n{\"id\": \"2024-03-13\"}\n\
                      \u{1e}2024-03-14\n\u{1d}I\n{\"state\": \"failed\"}\
                      \u{1e}2024-03-15\n\
                      \u{1e}*\n";

        let entries = parse_scan_output(output);

        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0].name, "2024-03-13");
        assert_eq!(entries[0].metadata.as_deref(), Some("{\"id\": \"2024-03-13\"}\n"));
        assert!(entries[0].marker.is_none());
        assert_eq!(entries[1].marker.as_deref(), Some("{\"state\": \"failed\"}"));
        assert!(entries[2].metadata.is_none());
        assert_eq!(entries[3].name, "*");
    }

    #[test]
    fn test_parse_scan_output_empty() {
        assert!(parse_scan_output("").is_empty());
    }

    #[test]
    fn test_parse_stat_output() {
        let info = parse_stat_output("f 1024 1609459200\n").unwrap();
        assert!(!info.is_dir);
        assert_eq!(info.size, 1024);
        assert_eq!(info.modified.unwrap().to_rfc3339(), "2021-01-01T00:00:00+00:00");

        assert!(parse_stat_output("d 4096 1609459200").unwrap().is_dir);
        assert!(parse_stat_output("garbage").is_none());
    }

    #[test]
    fn test_locations() {
        let store = store();
        let id = SnapshotId::parse("2024-03-13.1").unwrap();

        assert_eq!(store.location(), "backup@nas:/volume1/aeonsync/laptop");
        assert_eq!(store.snapshot_path(&id), "/volume1/aeonsync/laptop/2024-03-13.1");
        assert_eq!(
            store.transfer_location(&id, Some(Path::new("user/notes.txt"))),
            "backup@nas:/volume1/aeonsync/laptop/2024-03-13.1/user/notes.txt"
        );
    }

    #[test]
    fn test_create_script_reports_existing_dir() {
        let id = SnapshotId::parse("2024-03-13").unwrap();
        let script = store().create_script(&id);
        assert!(script.contains("mkdir /volume1/aeonsync/laptop/2024-03-13"));
        assert!(script.contains("exit 73"));
    }
}
