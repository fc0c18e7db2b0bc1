//! Line diffs and previews of snapshot files

use similar::TextDiff;

/// Bytes inspected when sniffing for binary content
const BINARY_PROBE_BYTES: usize = 8192;

/// Bytes read for a preview
pub const PREVIEW_BYTES: usize = 4096;

/// Lines shown in a preview
pub const PREVIEW_LINES: usize = 40;

/// Largest file, in bytes, that is loaded for a diff
pub const DIFF_READ_LIMIT: usize = 1024 * 1024;

const CONTEXT_LINES: usize = 3;

/// Check if content is binary (contains null bytes in first 8KB)
pub fn is_binary(content: &[u8]) -> bool {
    content.iter().take(BINARY_PROBE_BYTES).any(|&b| b == 0)
}

/// Comparison of two versions of a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileDiff {
    Identical,
    /// Unified diff text
    Changed(String),
    /// At least one side is binary and differs
    Binary,
    /// At least one side exceeds [`DIFF_READ_LIMIT`] and was not compared
    TooLarge { old_size: u64, new_size: u64 },
}

/// Compare two byte buffers as text
pub fn diff_bytes(old: &[u8], new: &[u8], old_label: &str, new_label: &str) -> FileDiff {
    if old == new {
        return FileDiff::Identical;
    }
    if is_binary(old) || is_binary(new) {
        return FileDiff::Binary;
    }

    let old_text = String::from_utf8_lossy(old);
    let new_text = String::from_utf8_lossy(new);
    let diff = TextDiff::from_lines(&old_text, &new_text);

    FileDiff::Changed(
        diff.unified_diff()
            .context_radius(CONTEXT_LINES)
            .header(old_label, new_label)
            .to_string(),
    )
}

/// Bounded excerpt of a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preview {
    Text { text: String, truncated: bool },
    /// Content is not text
    NotPreviewable,
}

/// Build a preview from the first bytes of a file
///
/// `prefix` may be longer than [`PREVIEW_BYTES`]; anything past the byte or
/// line cap marks the preview as truncated.
pub fn preview_bytes(prefix: &[u8]) -> Preview {
    if is_binary(prefix) {
        return Preview::NotPreviewable;
    }

    let mut truncated = false;
    let mut end = prefix.len();
    if end > PREVIEW_BYTES {
        truncated = true;
        end = PREVIEW_BYTES;
        // Never split a UTF-8 sequence at the cap
        while end > 0 && prefix[end] & 0xC0 == 0x80 && PREVIEW_BYTES - end < 3 {
            end -= 1;
        }
    }
    let text = String::from_utf8_lossy(&prefix[..end]);

    let mut lines: Vec<&str> = text.lines().collect();
    if lines.len() > PREVIEW_LINES {
        lines.truncate(PREVIEW_LINES);
        truncated = true;
    }

    Preview::Text {
        text: lines.join("\n"),
        truncated,
    }
}
