//! One matcher per visual kind.
//!
//! Each matcher reports its earliest candidate in the text, complete
//! (`end` known) or still open. Matchers never fail: anything malformed is
//! either not a candidate or an open one waiting for more input.
//!
//! Tag matchers search an ASCII-lowercased copy of the text, which keeps
//! byte offsets identical to the original.

use lectern_core::VisualKind;

use crate::text::patterns::{MD_IMAGE, PARTIAL_MD_IMAGE, TABLE_SEPARATOR};

/// Tags whose element is handed to the client as an opaque sandbox.
const SANDBOX_TAGS: [&str; 4] = ["html", "div", "script", "style"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Candidate {
    pub start: usize,
    /// `None` while the closing token has not arrived.
    pub end: Option<usize>,
    pub kind: VisualKind,
}

impl Candidate {
    const fn complete(start: usize, end: usize, kind: VisualKind) -> Self {
        Self {
            start,
            end: Some(end),
            kind,
        }
    }

    const fn open(start: usize, kind: VisualKind) -> Self {
        Self {
            start,
            end: None,
            kind,
        }
    }

    /// Ordering key: earliest start, then kind priority.
    pub fn sort_key(&self) -> (usize, u8) {
        (self.start, self.kind.priority())
    }
}

/// Earliest of two optional candidates.
fn earliest(a: Option<Candidate>, b: Option<Candidate>) -> Option<Candidate> {
    match (a, b) {
        (Some(a), Some(b)) => Some(if b.sort_key() < a.sort_key() { b } else { a }),
        (a, b) => a.or(b),
    }
}

/// Run every matcher over `text`.
pub(crate) fn candidates(text: &str, at_end: bool) -> Vec<Candidate> {
    let hay = text.to_ascii_lowercase();
    [
        paired_tag(&hay, "svg", VisualKind::Svg),
        paired_tag(&hay, "iframe", VisualKind::Iframe),
        paired_tag(&hay, "video", VisualKind::Video),
        paired_tag(&hay, "table", VisualKind::HtmlTable),
        sandbox(&hay),
        fence(text),
        image(text, &hay),
        md_table(text, at_end),
        math(text),
    ]
    .into_iter()
    .flatten()
    .collect()
}

// ── Paired HTML/XML tags ───────────────────────────────────────────

/// Position of the next `<tag` whose name ends there (or at end of text).
fn next_open(hay: &str, tag: &str, from: usize) -> Option<usize> {
    let needle = format!("<{tag}");
    let mut search = from;
    while let Some(rel) = hay.get(search..)?.find(&needle) {
        let at = search + rel;
        let after = at + needle.len();
        match hay[after..].chars().next() {
            None => return Some(at),
            Some(c) if c.is_ascii_whitespace() || c == '>' || c == '/' => return Some(at),
            Some(_) => search = after,
        }
    }
    None
}

/// `(start, end)` of the next complete `</tag>`.
fn next_close(hay: &str, tag: &str, from: usize) -> Option<(usize, usize)> {
    let needle = format!("</{tag}");
    let mut search = from;
    while let Some(rel) = hay.get(search..)?.find(&needle) {
        let at = search + rel;
        let after = at + needle.len();
        if let Some(rest) = hay[after..].trim_start().strip_prefix('>') {
            return Some((at, hay.len() - rest.len()));
        }
        search = after;
    }
    None
}

/// Offset just past the `>` closing the tag that starts at `start`.
fn tag_end(hay: &str, start: usize) -> Option<usize> {
    hay[start..].find('>').map(|i| start + i + 1)
}

/// Nesting-aware `<tag …>…</tag>` matcher. Self-closing tags are complete.
fn paired_tag(hay: &str, tag: &str, kind: VisualKind) -> Option<Candidate> {
    let start = next_open(hay, tag, 0)?;
    let Some(open_end) = tag_end(hay, start) else {
        return Some(Candidate::open(start, kind));
    };
    if hay[..open_end].ends_with("/>") {
        return Some(Candidate::complete(start, open_end, kind));
    }

    let mut depth = 1usize;
    let mut cursor = open_end;
    loop {
        let Some((close_start, close_end)) = next_close(hay, tag, cursor) else {
            return Some(Candidate::open(start, kind));
        };
        match next_open(hay, tag, cursor) {
            Some(nested) if nested < close_start => {
                let Some(nested_end) = tag_end(hay, nested) else {
                    return Some(Candidate::open(start, kind));
                };
                if !hay[..nested_end].ends_with("/>") {
                    depth += 1;
                }
                cursor = nested_end;
            }
            _ => {
                depth -= 1;
                cursor = close_end;
                if depth == 0 {
                    return Some(Candidate::complete(start, close_end, kind));
                }
            }
        }
    }
}

/// Whole documents and `<html>`/`<div>`/`<script>`/`<style>` elements.
fn sandbox(hay: &str) -> Option<Candidate> {
    let doctype = hay.find("<!doctype").map(|start| {
        next_close(hay, "html", start).map_or_else(
            || Candidate::open(start, VisualKind::Sandbox),
            |(_, end)| Candidate::complete(start, end, VisualKind::Sandbox),
        )
    });
    SANDBOX_TAGS
        .iter()
        .map(|tag| paired_tag(hay, tag, VisualKind::Sandbox))
        .fold(doctype, earliest)
}

// ── Fenced code ────────────────────────────────────────────────────

/// Triple-backtick block; the opening line must be finished before the
/// closing fence is searched for.
fn fence(text: &str) -> Option<Candidate> {
    let start = text.find("```")?;
    let after_open = start + 3;
    let Some(newline) = text[after_open..].find('\n') else {
        return Some(Candidate::open(start, VisualKind::Fence));
    };
    let body = after_open + newline + 1;
    Some(text[body..].find("```").map_or_else(
        || Candidate::open(start, VisualKind::Fence),
        |rel| Candidate::complete(start, body + rel + 3, VisualKind::Fence),
    ))
}

// ── Images ─────────────────────────────────────────────────────────

fn image(text: &str, hay: &str) -> Option<Candidate> {
    earliest(md_image(text), html_image(hay))
}

fn md_image(text: &str) -> Option<Candidate> {
    for (pos, _) in text.match_indices("![") {
        let rest = &text[pos..];
        if let Some(m) = MD_IMAGE.find(rest).filter(|m| m.start() == 0) {
            return Some(Candidate::complete(pos, pos + m.end(), VisualKind::MdImage));
        }
        if PARTIAL_MD_IMAGE.is_match(rest) {
            return Some(Candidate::open(pos, VisualKind::MdImage));
        }
    }
    None
}

fn html_image(hay: &str) -> Option<Candidate> {
    let start = next_open(hay, "img", 0)?;
    Some(tag_end(hay, start).map_or_else(
        || Candidate::open(start, VisualKind::MdImage),
        |end| Candidate::complete(start, end, VisualKind::MdImage),
    ))
}

// ── Markdown tables ────────────────────────────────────────────────

fn is_row(line: &str) -> bool {
    line.trim_start().starts_with('|')
}

fn is_separator(line: &str) -> bool {
    is_row(line) && TABLE_SEPARATOR.is_match(line.trim_end())
}

/// Could this unfinished line still become a delimiter row?
fn may_become_separator(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty()
        || (trimmed.starts_with('|') && trimmed.chars().all(|c| matches!(c, '|' | '-' | ':' | ' ' | '\t')))
}

/// Header row, delimiter row, then body rows up to the first non-row line.
///
/// The table is complete once a following line proves the rows ended, or
/// at end of stream.
fn md_table(text: &str, at_end: bool) -> Option<Candidate> {
    let mut lines = Vec::new();
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        lines.push((offset, line));
        offset += line.len();
    }
    let finished = |line: &str| at_end || line.ends_with('\n');

    for i in 0..lines.len() {
        let (start, header) = lines[i];
        if !is_row(header) {
            continue;
        }
        if !finished(header) {
            return Some(Candidate::open(start, VisualKind::MdTable));
        }
        let Some(&(_, separator)) = lines.get(i + 1) else {
            if at_end {
                return None;
            }
            return Some(Candidate::open(start, VisualKind::MdTable));
        };
        if !finished(separator) {
            if may_become_separator(separator) {
                return Some(Candidate::open(start, VisualKind::MdTable));
            }
            continue;
        }
        if !is_separator(separator) {
            continue;
        }

        let mut j = i + 2;
        loop {
            match lines.get(j) {
                None if at_end => {
                    return Some(Candidate::complete(start, text.len(), VisualKind::MdTable));
                }
                None => return Some(Candidate::open(start, VisualKind::MdTable)),
                Some(&(_, line)) if is_row(line) => {
                    if !finished(line) {
                        return Some(Candidate::open(start, VisualKind::MdTable));
                    }
                    j += 1;
                }
                Some(&(line_start, line)) => {
                    // An unfinished blank line may still turn into a row.
                    if line.trim().is_empty() && !finished(line) {
                        return Some(Candidate::open(start, VisualKind::MdTable));
                    }
                    return Some(Candidate::complete(start, line_start, VisualKind::MdTable));
                }
            }
        }
    }
    None
}

// ── Math ───────────────────────────────────────────────────────────

fn delimited(text: &str, open: &str, close: &str) -> Option<Candidate> {
    let start = text.find(open)?;
    let body = start + open.len();
    Some(text[body..].find(close).map_or_else(
        || Candidate::open(start, VisualKind::Math),
        |rel| Candidate::complete(start, body + rel + close.len(), VisualKind::Math),
    ))
}

/// `$$…$$` and `\[…\]` display math.
fn math(text: &str) -> Option<Candidate> {
    earliest(delimited(text, "$$", "$$"), delimited(text, "\\[", "\\]"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lower(text: &str) -> String {
        text.to_ascii_lowercase()
    }

    #[test]
    fn test_paired_tag_complete_and_open() {
        let text = "a <svg width=\"1\"><g/></svg> b";
        let c = paired_tag(&lower(text), "svg", VisualKind::Svg).unwrap();
        assert_eq!(c.start, 2);
        assert_eq!(&text[c.start..c.end.unwrap()], "<svg width=\"1\"><g/></svg>");

        let c = paired_tag(&lower("x <svg><text>"), "svg", VisualKind::Svg).unwrap();
        assert_eq!(c, Candidate::open(2, VisualKind::Svg));
    }

    #[test]
    fn test_paired_tag_nesting() {
        let text = "<div><div>inner</div> still outer</div>tail";
        let c = paired_tag(&lower(text), "div", VisualKind::Sandbox).unwrap();
        assert_eq!(&text[..c.end.unwrap()], "<div><div>inner</div> still outer</div>");

        let open = "<div><div>inner</div> still outer";
        assert!(paired_tag(&lower(open), "div", VisualKind::Sandbox).unwrap().end.is_none());
    }

    #[test]
    fn test_paired_tag_case_insensitive_and_name_boundary() {
        let text = "<SVG></Svg >";
        assert_eq!(
            paired_tag(&lower(text), "svg", VisualKind::Svg).unwrap().end,
            Some(text.len())
        );
        assert!(paired_tag(&lower("<svgfoo>"), "svg", VisualKind::Svg).is_none());
        assert!(paired_tag(&lower("<tablet>"), "table", VisualKind::HtmlTable).is_none());
    }

    #[test]
    fn test_dangling_tag_name_is_open() {
        let c = paired_tag(&lower("text <svg"), "svg", VisualKind::Svg).unwrap();
        assert!(c.end.is_none());
    }

    #[test]
    fn test_self_closing_video() {
        let text = "<video src=\"a.mp4\"/> after";
        let c = paired_tag(&lower(text), "video", VisualKind::Video).unwrap();
        assert_eq!(c.end, Some(20));
    }

    #[test]
    fn test_doctype_sandbox() {
        let text = "<!DOCTYPE html><html><body>x</body></html> after";
        let c = sandbox(&lower(text)).unwrap();
        assert_eq!(c.start, 0);
        assert_eq!(&text[..c.end.unwrap()], "<!DOCTYPE html><html><body>x</body></html>");
    }

    #[test]
    fn test_fence() {
        let text = "See:\n```python\nprint(1)\n```\nDone.";
        let c = fence(text).unwrap();
        assert_eq!(&text[c.start..c.end.unwrap()], "```python\nprint(1)\n```");

        assert!(fence("```python").unwrap().end.is_none());
        assert!(fence("```python\nprint(1)\n").unwrap().end.is_none());
    }

    #[test]
    fn test_md_image() {
        let text = "Look ![a cat](http://x/cat.png) here";
        let c = image(text, &lower(text)).unwrap();
        assert_eq!(&text[c.start..c.end.unwrap()], "![a cat](http://x/cat.png)");

        assert!(image("Look ![a c", "look ![a c").unwrap().end.is_none());
        assert!(image("Wow![not an image\nnext", "wow![not an image\nnext").is_none());
    }

    #[test]
    fn test_html_img_counts_as_image() {
        let text = "Here <img src=\"a.png\"> there";
        let c = image(text, &lower(text)).unwrap();
        assert_eq!(c.kind, VisualKind::MdImage);
        assert_eq!(&text[c.start..c.end.unwrap()], "<img src=\"a.png\">");
    }

    #[test]
    fn test_md_table_complete_after_following_line() {
        let text = "Intro\n| a | b |\n|---|---|\n| 1 | 2 |\nAfter.";
        let c = md_table(text, false).unwrap();
        assert_eq!(c.start, 6);
        assert_eq!(&text[c.start..c.end.unwrap()], "| a | b |\n|---|---|\n| 1 | 2 |\n");
    }

    #[test]
    fn test_md_table_open_while_rows_stream() {
        assert!(md_table("| a | b |\n|---|", false).unwrap().end.is_none());
        assert!(md_table("| a | b |\n|---|---|\n| 1 |", false).unwrap().end.is_none());
        assert!(md_table("| a | b |\n|---|---|\n| 1 | 2 |\n", false).unwrap().end.is_none());
    }

    #[test]
    fn test_md_table_complete_at_end() {
        let text = "| a | b |\n|---|---|\n| 1 | 2 |";
        assert_eq!(md_table(text, true).unwrap().end, Some(text.len()));
    }

    #[test]
    fn test_pipe_line_without_separator_is_not_a_table() {
        assert!(md_table("| just a pipe\nnormal text\n", false).is_none());
    }

    #[test]
    fn test_math() {
        let text = "Energy $$E = mc^2$$ done";
        let c = math(text).unwrap();
        assert_eq!(&text[c.start..c.end.unwrap()], "$$E = mc^2$$");

        let text = "Also \\[x^2\\] here";
        let c = math(text).unwrap();
        assert_eq!(&text[c.start..c.end.unwrap()], "\\[x^2\\]");

        assert!(math("open $$x").unwrap().end.is_none());
    }
}
