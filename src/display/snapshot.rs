//! Snapshot display formatting
//!
//! Formats the catalog for terminal output in table and detail views.

use super::format::{format_duration, format_size};
use crate::backup::{SyncReport, SyncStatus};
use crate::catalog::{Catalog, CatalogEntry};

const NOT_AVAILABLE: &str = "n/a";

struct Row {
    id: String,
    state: String,
    hostname: String,
    sources: String,
    files: String,
    size: String,
    duration: String,
    expires: String,
}

impl Row {
    fn from_entry(entry: &CatalogEntry) -> Self {
        let na = || NOT_AVAILABLE.to_string();
        match entry.metadata() {
            Some(m) => Self {
                id: entry.id.to_string(),
                state: entry.state_label(),
                hostname: m.hostname.clone(),
                sources: m
                    .sources
                    .iter()
                    .map(|s| s.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
                files: m.file_count.to_string(),
                size: format_size(m.total_size),
                duration: format_duration(m.duration()),
                expires: m.expires_on.to_string(),
            },
            None => Self {
                id: entry.id.to_string(),
                state: entry.state_label(),
                hostname: na(),
                sources: na(),
                files: na(),
                size: na(),
                duration: na(),
                expires: na(),
            },
        }
    }
}

/// Format the catalog as a table, oldest first, with totals
pub fn format_snapshot_list(catalog: &Catalog, location: &str) -> String {
    if catalog.is_empty() {
        return format!("No backups found in {}.", location);
    }

    let rows: Vec<Row> = catalog.iter().map(Row::from_entry).collect();
    let id_w = column_width(rows.iter().map(|r| r.id.len()), "Snapshot");
    let state_w = column_width(rows.iter().map(|r| r.state.len()), "State");
    let host_w = column_width(rows.iter().map(|r| r.hostname.len()), "Host");
    let files_w = column_width(rows.iter().map(|r| r.files.len()), "Files");
    let size_w = column_width(rows.iter().map(|r| r.size.len()), "Size");
    let dur_w = column_width(rows.iter().map(|r| r.duration.len()), "Duration");
    let exp_w = column_width(rows.iter().map(|r| r.expires.len()), "Expires");

    let mut output = format!("Backups in {}:\n\n", location);
    output.push_str(&format!(
        "{:<id_w$}  {:<state_w$}  {:<host_w$}  {:>files_w$}  {:>size_w$}  {:>dur_w$}  {:<exp_w$}  {}\n",
        "Snapshot", "State", "Host", "Files", "Size", "Duration", "Expires", "Sources",
    ));
    output.push_str(&format!(
        "{:-<id_w$}  {:-<state_w$}  {:-<host_w$}  {:->files_w$}  {:->size_w$}  {:->dur_w$}  {:-<exp_w$}  {:-<7}\n",
        "", "", "", "", "", "", "", "",
    ));

    for r in &rows {
        output.push_str(&format!(
            "{:<id_w$}  {:<state_w$}  {:<host_w$}  {:>files_w$}  {:>size_w$}  {:>dur_w$}  {:<exp_w$}  {}\n",
            r.id, r.state, r.hostname, r.files, r.size, r.duration, r.expires, r.sources,
        ));
    }

    let total_size: u64 = catalog
        .iter()
        .filter_map(|e| e.metadata())
        .map(|m| m.total_size)
        .sum();
    output.push_str(&format!(
        "\n{} snapshot(s), {} restorable, {} recorded\n",
        catalog.len(),
        catalog.restorable().count(),
        format_size(total_size)
    ));
    output.push_str(&format!(
        "Latest: {}\n",
        catalog
            .latest()
            .map_or_else(|| "none".to_string(), |id| id.to_string())
    ));

    output
}

fn column_width(lengths: impl Iterator<Item = usize>, header: &str) -> usize {
    lengths.max().unwrap_or(0).max(header.len())
}

/// One-paragraph summary of a sync
pub fn format_sync_report(report: &SyncReport) -> String {
    let link = report
        .link_source
        .map_or_else(|| "none (full copy)".to_string(), |id| id.to_string());

    match &report.status {
        SyncStatus::Created(m) => format!(
            "Backup completed: {}\n  Linked against: {}\n  Files: {}\n  Size: {}\n  Duration: {}\n  Expires: {}\n",
            report.id,
            link,
            m.file_count,
            format_size(m.total_size),
            format_duration(m.duration()),
            m.expires_on,
        ),
        SyncStatus::AlreadyCurrent => format!(
            "Snapshot {} already exists for today (daily mode); latest now points to it.\n",
            report.id
        ),
        SyncStatus::DryRun(stats) => format!(
            "Dry run: would create {}\n  Linked against: {}\n  Files: {}\n  Size: {}\n",
            report.id,
            link,
            stats.file_count,
            format_size(stats.total_size),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::{complete, id, incomplete, unknown};
    use crate::models::TransferStats;

    #[test]
    fn test_empty_list() {
        assert_eq!(
            format_snapshot_list(&Catalog::default(), "/mnt/backups/laptop"),
            "No backups found in /mnt/backups/laptop."
        );
    }

    #[test]
    fn test_list_table() {
        let catalog = Catalog::from_entries(vec![
            complete("2024-03-13"),
            unknown("2024-03-14"),
            incomplete("2024-03-15"),
        ]);
        let output = format_snapshot_list(&catalog, "nas:/backups/laptop");

        let lines: Vec<&str> = output.lines().collect();
        assert!(lines[2].starts_with("Snapshot"));
        assert!(lines[4].starts_with("2024-03-13"));
        assert!(lines[4].contains("complete"));
        assert!(lines[4].contains("2.00 KB"));
        assert!(lines[4].contains("3m 0s"));
        assert!(lines[4].contains("/home/user"));
        assert!(lines[5].contains("no metadata"));
        assert!(lines[5].contains("n/a"));
        assert!(lines[6].contains("failed"));
        assert!(output.contains("3 snapshot(s), 2 restorable"));
        assert!(output.contains("Latest: 2024-03-14"));
    }

    #[test]
    fn test_sync_report() {
        let report = SyncReport {
            id: id("2024-03-14"),
            link_source: None,
            status: SyncStatus::DryRun(TransferStats {
                file_count: 12,
                total_size: 2048,
            }),
        };
        let text = format_sync_report(&report);
        assert!(text.contains("would create 2024-03-14"));
        assert!(text.contains("full copy"));
        assert!(text.contains("2.00 KB"));
    }
}
