//! Blob-level diff: line-by-line comparison of file contents.
//!
//! Uses the `similar` crate (Myers diff algorithm) to produce hunks with
//! three lines of context.

use similar::{ChangeTag, TextDiff};

/// The result of diffing two blobs (file contents).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlobDiff {
    pub hunks: Vec<DiffHunk>,
    /// Total number of lines in the old content.
    pub old_lines: usize,
    /// Total number of lines in the new content.
    pub new_lines: usize,
    /// `true` if either side is not valid UTF-8. Binary diffs carry no hunks.
    pub binary: bool,
}

impl BlobDiff {
    /// Returns `true` if the two blobs are identical.
    pub fn is_empty(&self) -> bool {
        !self.binary && self.hunks.is_empty()
    }

    /// Inserted and removed lines in order, without context.
    pub fn changed_lines(&self) -> impl Iterator<Item = &DiffLine> {
        self.hunks
            .iter()
            .flat_map(|h| &h.lines)
            .filter(|l| !matches!(l, DiffLine::Context(_)))
    }

    /// Total number of lines added across all hunks.
    pub fn additions(&self) -> usize {
        self.changed_lines()
            .filter(|l| matches!(l, DiffLine::Added(_)))
            .count()
    }

    /// Total number of lines removed across all hunks.
    pub fn deletions(&self) -> usize {
        self.changed_lines()
            .filter(|l| matches!(l, DiffLine::Removed(_)))
            .count()
    }
}

/// A contiguous region of changes in a diff.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiffHunk {
    /// Line number in the old content where this hunk starts (1-based).
    pub old_start: usize,
    pub old_count: usize,
    /// Line number in the new content where this hunk starts (1-based).
    pub new_start: usize,
    pub new_count: usize,
    pub lines: Vec<DiffLine>,
}

/// A single line in a diff hunk, without its line terminator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiffLine {
    Context(String),
    Added(String),
    Removed(String),
}

/// Compute a line-by-line diff between two byte slices.
///
/// Content that is not valid UTF-8 on either side is treated as binary: the
/// result has `binary` set and no hunks, unless both sides are equal.
pub fn diff_blobs(old: &[u8], new: &[u8]) -> BlobDiff {
    let (Ok(old_str), Ok(new_str)) = (std::str::from_utf8(old), std::str::from_utf8(new)) else {
        return BlobDiff {
            hunks: Vec::new(),
            old_lines: 0,
            new_lines: 0,
            binary: old != new,
        };
    };

    let old_lines = old_str.lines().count();
    let new_lines = new_str.lines().count();
    if old_str == new_str {
        return BlobDiff {
            hunks: Vec::new(),
            old_lines,
            new_lines,
            binary: false,
        };
    }

    let text_diff = TextDiff::from_lines(old_str, new_str);
    let mut hunks = Vec::new();

    for group in text_diff.grouped_ops(3) {
        let Some(first) = group.first() else {
            continue;
        };
        let mut hunk = DiffHunk {
            old_start: first.old_range().start + 1,
            old_count: 0,
            new_start: first.new_range().start + 1,
            new_count: 0,
            lines: Vec::new(),
        };

        for op in &group {
            for change in text_diff.iter_changes(op) {
                let text = change.value().trim_end_matches(['\n', '\r']).to_string();
                match change.tag() {
                    ChangeTag::Equal => {
                        hunk.lines.push(DiffLine::Context(text));
                        hunk.old_count += 1;
                        hunk.new_count += 1;
                    }
                    ChangeTag::Delete => {
                        hunk.lines.push(DiffLine::Removed(text));
                        hunk.old_count += 1;
                    }
                    ChangeTag::Insert => {
                        hunk.lines.push(DiffLine::Added(text));
                        hunk.new_count += 1;
                    }
                }
            }
        }
        hunks.push(hunk);
    }

    BlobDiff {
        hunks,
        old_lines,
        new_lines,
        binary: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_blobs_no_diff() {
        let content = b"hello\nworld\n";
        let diff = diff_blobs(content, content);
        assert!(diff.is_empty());
        assert_eq!(diff.additions(), 0);
    }

    #[test]
    fn single_line_addition() {
        let diff = diff_blobs(b"line1\nline2\n", b"line1\nline2\nline3\n");
        assert_eq!(diff.additions(), 1);
        assert_eq!(diff.deletions(), 0);
        let changed: Vec<&DiffLine> = diff.changed_lines().collect();
        assert_eq!(changed, vec![&DiffLine::Added("line3".into())]);
    }

    #[test]
    fn modification_shows_remove_and_add() {
        let diff = diff_blobs(b"hello world\n", b"hello universe\n");
        assert_eq!(diff.deletions(), 1);
        assert_eq!(diff.additions(), 1);
    }

    #[test]
    fn empty_to_content() {
        let diff = diff_blobs(b"", b"new content\n");
        assert_eq!(diff.additions(), 1);
        assert_eq!(diff.old_lines, 0);
    }

    #[test]
    fn binary_content_detection() {
        let diff = diff_blobs(&[0u8, 1, 0xFF, 0xFE], &[4u8, 0xFF, 0xFD]);
        assert!(diff.binary);
        assert!(!diff.is_empty());
        assert!(diff.hunks.is_empty());

        let same = diff_blobs(&[0xFF], &[0xFF]);
        assert!(same.is_empty());
    }

    #[test]
    fn hunk_keeps_context_and_line_numbers() {
        let old = b"a\nb\nc\nd\ne\nf\ng\nh\ni\nj\n";
        let new = b"a\nb\nc\nd\nX\nf\ng\nh\ni\nj\n";
        let diff = diff_blobs(old, new);
        assert_eq!(diff.hunks.len(), 1);
        let hunk = &diff.hunks[0];
        assert_eq!(hunk.old_start, 2);
        assert!(hunk.lines.iter().any(|l| matches!(l, DiffLine::Context(_))));
        assert_eq!(diff.changed_lines().count(), 2);
    }

    #[test]
    fn crlf_terminators_are_stripped() {
        let diff = diff_blobs(b"a\r\n", b"a\r\nb\r\n");
        let changed: Vec<&DiffLine> = diff.changed_lines().collect();
        assert_eq!(changed, vec![&DiffLine::Added("b".into())]);
    }
}
