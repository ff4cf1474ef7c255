//! Line-based three-way merge of file contents.
//!
//! Both sides are diffed against the base (Myers, via `similar`). Edits are
//! replayed in base order; two edits from different sides conflict when
//! their base ranges overlap or touch, unless they are the same edit.

use std::ops::Range;

use similar::{capture_diff_slices, Algorithm, DiffTag};

/// Result of merging one file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlobMerge {
    Clean(Vec<u8>),
    Conflict,
}

#[derive(Debug, PartialEq, Eq)]
struct Edit<'a> {
    /// Replaced range of base lines. Empty for pure insertions.
    base: Range<usize>,
    lines: &'a [&'a str],
}

impl Edit<'_> {
    fn touches(&self, other: &Edit<'_>) -> bool {
        self.base.start <= other.base.end && other.base.start <= self.base.end
    }
}

fn edits<'a>(base: &[&str], side: &'a [&'a str]) -> Vec<Edit<'a>> {
    let mut out: Vec<Edit<'a>> = Vec::new();
    let mut previous_changed = false;
    for op in capture_diff_slices(Algorithm::Myers, base, side) {
        if op.tag() == DiffTag::Equal {
            previous_changed = false;
            continue;
        }
        let (old, new) = (op.old_range(), op.new_range());
        if previous_changed {
            if let Some(last) = out.last_mut() {
                let new_start = new.start - last.lines.len();
                last.base = last.base.start..old.end;
                last.lines = &side[new_start..new.end];
                continue;
            }
        }
        out.push(Edit {
            base: old,
            lines: &side[new],
        });
        previous_changed = true;
    }
    out
}

/// Three-way merge of UTF-8 text.
///
/// Returns `None` on conflict.
pub fn merge_text(base: &str, ours: &str, theirs: &str) -> Option<String> {
    if ours == theirs || base == theirs {
        return Some(ours.to_string());
    }
    if base == ours {
        return Some(theirs.to_string());
    }

    let base_lines: Vec<&str> = base.split_inclusive('\n').collect();
    let our_lines: Vec<&str> = ours.split_inclusive('\n').collect();
    let their_lines: Vec<&str> = theirs.split_inclusive('\n').collect();
    let ours_edits = edits(&base_lines, &our_lines);
    let theirs_edits = edits(&base_lines, &their_lines);

    let mut merged = String::with_capacity(ours.len().max(theirs.len()));
    let mut pos = 0;
    let (mut i, mut j) = (0, 0);

    loop {
        let next = match (ours_edits.get(i), theirs_edits.get(j)) {
            (None, None) => break,
            (Some(a), Some(b)) if a.touches(b) => {
                if a != b {
                    return None;
                }
                i += 1;
                j += 1;
                a
            }
            (Some(a), Some(b)) if a.base.start < b.base.start => {
                i += 1;
                a
            }
            (_, Some(b)) => {
                j += 1;
                b
            }
            (Some(a), None) => {
                i += 1;
                a
            }
        };
        merged.extend(base_lines[pos..next.base.start].iter().copied());
        merged.extend(next.lines.iter().copied());
        pos = next.base.end;
    }
    merged.extend(base_lines[pos..].iter().copied());
    Some(merged)
}

/// Three-way merge of file contents.
///
/// Content that is not valid UTF-8 only merges when one side left it
/// unchanged.
pub fn merge_blobs(base: &[u8], ours: &[u8], theirs: &[u8]) -> BlobMerge {
    if ours == theirs || base == theirs {
        return BlobMerge::Clean(ours.to_vec());
    }
    if base == ours {
        return BlobMerge::Clean(theirs.to_vec());
    }
    let texts = (
        std::str::from_utf8(base),
        std::str::from_utf8(ours),
        std::str::from_utf8(theirs),
    );
    match texts {
        (Ok(base), Ok(ours), Ok(theirs)) => match merge_text(base, ours, theirs) {
            Some(text) => BlobMerge::Clean(text.into_bytes()),
            None => BlobMerge::Conflict,
        },
        _ => BlobMerge::Conflict,
    }
}
