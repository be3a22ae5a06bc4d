//! Visual boundary detection over an accumulating text buffer.
//!
//! The orchestrator asks one question of the unprocessed suffix: is there a
//! visual element ahead, and if so, has it finished arriving? [`scan`]
//! answers with a tri-state so text in front of an unfinished element can
//! still be narrated while the element itself is held back.
//!
//! Candidates are ranked by earliest start; ties go to paired HTML/XML
//! tags, then fenced blocks, then inline elements.

mod matchers;

use lectern_core::VisualKind;

/// A complete visual element inside a scanned suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualMatch {
    /// Byte offset of the first character of the element.
    pub start: usize,
    /// Byte offset just past the element.
    pub end: usize,
    pub kind: VisualKind,
    /// Raw element text, trailing whitespace removed.
    pub content: String,
}

/// Outcome of scanning a suffix for the earliest visual element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scan {
    /// The earliest element is fully present.
    Complete(VisualMatch),
    /// The earliest element starts at `start` but is still arriving.
    Incomplete { start: usize },
    /// No element, finished or not.
    Absent,
}

/// Scan a suffix that may still grow.
#[must_use]
pub fn scan(suffix: &str) -> Scan {
    scan_with(suffix, false)
}

/// Scan with explicit end-of-stream knowledge.
///
/// With `at_end` set, constructs that end with the text (a table whose last
/// row is the final line) count as complete.
#[must_use]
pub fn scan_with(suffix: &str, at_end: bool) -> Scan {
    let best = matchers::candidates(suffix, at_end)
        .into_iter()
        .min_by_key(matchers::Candidate::sort_key);

    match best {
        None => Scan::Absent,
        Some(candidate) => match candidate.end {
            Some(end) => Scan::Complete(VisualMatch {
                start: candidate.start,
                end,
                kind: candidate.kind,
                content: suffix[candidate.start..end].trim_end().to_string(),
            }),
            None => Scan::Incomplete {
                start: candidate.start,
            },
        },
    }
}

/// The earliest element, if it has fully arrived.
///
/// Returns `None` when an unfinished element starts first: acting on a
/// later boundary would reorder output.
#[must_use]
pub fn find_earliest_complete(suffix: &str) -> Option<VisualMatch> {
    match scan(suffix) {
        Scan::Complete(m) => Some(m),
        Scan::Incomplete { .. } | Scan::Absent => None,
    }
}

/// Whether any element in `suffix` is still waiting for its closing token.
#[must_use]
pub fn has_incomplete_tail(suffix: &str) -> bool {
    let mut offset = 0;
    loop {
        match scan(&suffix[offset..]) {
            Scan::Complete(m) => offset += m.end,
            Scan::Incomplete { .. } => return true,
            Scan::Absent => return false,
        }
    }
}

/// Bytes of `suffix` that can be narrated now without risking a visual
/// opener being split across deltas.
///
/// Holds back a trailing line that may be a table row, an unclosed `<`
/// that may still become a visual element's opening tag, and trailing
/// backticks, `!`, `$` or `\`.
/// At end of stream everything is safe.
#[must_use]
pub fn safe_prefix_len(suffix: &str, at_end: bool) -> usize {
    if at_end {
        return suffix.len();
    }

    let mut safe = suffix.len();

    let line_start = suffix.rfind('\n').map_or(0, |i| i + 1);
    let last_line = &suffix[line_start..];
    if last_line.trim_start().starts_with('|') || (line_start > 0 && last_line.trim().is_empty()) {
        safe = line_start;
    }

    if let Some(lt) = suffix.rfind('<') {
        let rest = &suffix[lt + 1..];
        if !rest.contains('>') && !rest.contains('\n') && may_open_visual(rest) {
            safe = safe.min(lt);
        }
    }

    safe.min(suffix.trim_end_matches(['`', '!', '$', '\\']).len())
}

/// Tag names whose opening tag starts a visual element.
const VISUAL_TAG_NAMES: [&str; 10] = [
    "svg", "iframe", "video", "table", "img", "div", "html", "script", "style", "!doctype",
];

/// Whether `rest`, the text after a `<`, is or could grow into the start
/// of a visual element's opening tag.
fn may_open_visual(rest: &str) -> bool {
    let lower = rest.to_ascii_lowercase();
    VISUAL_TAG_NAMES.iter().any(|name| match lower.strip_prefix(name) {
        Some(after) => after.chars().next().is_none_or(|c| !c.is_ascii_alphanumeric()),
        None => name.starts_with(lower.as_str()),
    })
}
