//! Restore display formatting

use chrono::Local;

use super::format::format_size;
use crate::catalog::Catalog;
use crate::models::SnapshotId;
use crate::restore::{FileDiff, Preview, RestorePlan};

/// Summary shown before a restore is confirmed
pub fn format_restore_summary(plan: &RestorePlan) -> String {
    let kind = if plan.info.is_dir { "Directory" } else { "File" };
    let modified = plan.info.modified.map_or_else(
        || "unknown".to_string(),
        |t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string(),
    );

    let mut output = String::new();
    output.push_str("Restore summary\n");
    output.push_str(&format!("  Snapshot:    {}\n", plan.snapshot));
    output.push_str(&format!("  {:<12} {}\n", format!("{}:", kind), plan.source.display()));
    output.push_str(&format!("  Destination: {}\n", plan.destination.display()));
    if !plan.info.is_dir {
        output.push_str(&format!("  Size:        {}\n", format_size(plan.info.size)));
    }
    output.push_str(&format!("  Modified:    {}\n", modified));
    output
}

/// Numbered version list for selection
pub fn format_versions(versions: &[SnapshotId], catalog: &Catalog) -> String {
    versions
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let created = catalog
                .get(id)
                .and_then(|e| e.metadata())
                .map(|m| m.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            let line = format!("{:>3}. {:<14} {}", i + 1, id.to_string(), created);
            format!("{}\n", line.trim_end())
        })
        .collect()
}

pub fn format_preview(preview: &Preview) -> String {
    match preview {
        Preview::Text { text, truncated } => {
            let mut output = format!("{}\n", text);
            if *truncated {
                output.push_str("... (truncated)\n");
            }
            output
        }
        Preview::NotPreviewable => "Binary file, preview not available.\n".to_string(),
    }
}

pub fn format_diff(diff: &FileDiff) -> String {
    match diff {
        FileDiff::Identical => "No differences.\n".to_string(),
        FileDiff::Changed(text) => text.clone(),
        FileDiff::Binary => "Binary files differ.\n".to_string(),
        FileDiff::TooLarge { old_size, new_size } => format!(
            "Files too large to diff ({} and {}).\n",
            format_size(*old_size),
            format_size(*new_size)
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::{complete, id, unknown};
    use crate::storage::PathInfo;
    use std::path::PathBuf;

    #[test]
    fn test_restore_summary() {
        let plan = RestorePlan {
            snapshot: id("2024-03-13.1"),
            source: PathBuf::from("user/notes.txt"),
            destination: PathBuf::from("/tmp/notes.txt"),
            info: PathInfo {
                is_dir: false,
                size: 1536,
                modified: None,
            },
        };
        let text = format_restore_summary(&plan);
        assert!(text.contains("Snapshot:    2024-03-13.1"));
        assert!(text.contains("File:"));
        assert!(text.contains("Size:        1.50 KB"));
        assert!(text.contains("Modified:    unknown"));
    }

    #[test]
    fn test_versions_are_numbered() {
        let catalog = Catalog::from_entries(vec![complete("2024-03-13"), unknown("2024-03-14")]);
        let text = format_versions(&[id("2024-03-13"), id("2024-03-14")], &catalog);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("  1. 2024-03-13"));
        assert_eq!(lines[1], "  2. 2024-03-14");
    }

    #[test]
    fn test_preview_and_diff_text() {
        let truncated = Preview::Text {
            text: "a\nb".into(),
            truncated: true,
        };
        assert_eq!(format_preview(&truncated), "a\nb\n... (truncated)\n");
        assert!(format_preview(&Preview::NotPreviewable).contains("Binary"));
        assert_eq!(format_diff(&FileDiff::Identical), "No differences.\n");
        assert_eq!(
            format_diff(&FileDiff::TooLarge {
                old_size: 2 * 1024 * 1024,
                new_size: 512
            }),
            "Files too large to diff (2.00 MB and 512 B).\n"
        );
    }
}
