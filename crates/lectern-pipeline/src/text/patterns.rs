//! Compiled regular expressions shared by the preprocessor and the
//! boundary matchers.
//!
//! The `regex` crate has no backreferences, so paired constructs are
//! spelled out per tag. Blocks that may be cut off at the end of a stream
//! accept `\z` as their terminator.

use std::sync::LazyLock;

use regex::Regex;

fn compile(pattern: &str) -> Regex {
    // Patterns are literals; a failure here is a programming error caught by tests.
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid built-in pattern {pattern:?}: {e}"))
}

// ── Blocks removed with their bodies ───────────────────────────────

/// `<think>…</think>` / `<reasoning>…</reasoning>` (attributes allowed).
pub static THINKING_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?is)<think\b[^>]*>.*?(?:</think\s*>|\z)|<reasoning\b[^>]*>.*?(?:</reasoning\s*>|\z)")
});

/// A closing thinking tag at the very end of text.
pub static THINKING_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)</(?:think|reasoning)\s*>\z"));

/// Fenced code, closed or running to the end of text.
pub static FENCED_CODE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?s)```.*?(?:```|\z)"));

/// Raw SVG, script, style and MathML elements with their bodies.
pub static RAW_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"(?is)<svg\b.*?(?:</svg\s*>|\z)|<script\b.*?(?:</script\s*>|\z)|<style\b.*?(?:</style\s*>|\z)|<math\b.*?(?:</math\s*>|\z)",
    )
});

/// `$$…$$`, `\[…\]` and inline `\(…\)` LaTeX.
pub static LATEX: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?s)\$\$.*?\$\$|\\\[.*?\\\]|\\\(.*?\\\)"));

/// Markdown image `![alt](url)`.
pub static MD_IMAGE: LazyLock<Regex> = LazyLock::new(|| compile(r"!\[[^\]\n]*\]\([^)\n]*\)"));

/// HTML `<img …>`.
pub static HTML_IMAGE: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)<img\b[^>]*>"));

/// Inline `data:` URIs.
pub static DATA_URI: LazyLock<Regex> =
    LazyLock::new(|| compile(r"data:[A-Za-z0-9.+/-]+;base64,[A-Za-z0-9+/=]+"));

// ── Markup reduced to its text ─────────────────────────────────────

/// `[text](url)`; group 1 is the link text.
pub static LINK: LazyLock<Regex> = LazyLock::new(|| compile(r"\[([^\]\n]*)\]\([^)\n]*\)"));

/// ATX heading markers at line start.
pub static HEADING: LazyLock<Regex> = LazyLock::new(|| compile(r"(?m)^[ \t]{0,3}#{1,6}[ \t]*"));

/// `---`, `***`, `___` rules on their own line.
pub static HORIZONTAL_RULE: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?m)^[ \t]*(?:(?:-[ \t]*){3,}|(?:\*[ \t]*){3,}|(?:_[ \t]*){3,})$")
});

/// Blockquote markers at line start.
pub static BLOCKQUOTE: LazyLock<Regex> = LazyLock::new(|| compile(r"(?m)^[ \t]*(?:>[ \t]?)+"));

/// Bullet and ordered list markers at line start.
pub static LIST_MARKER: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?m)^[ \t]*(?:[-*+]|\d{1,3}[.)])[ \t]+"));

/// Inline code; group 1 is the code text.
pub static INLINE_CODE: LazyLock<Regex> = LazyLock::new(|| compile(r"`([^`\n]*)`"));

/// `**`, `__` and `~~` emphasis markers.
pub static DOUBLE_EMPHASIS: LazyLock<Regex> = LazyLock::new(|| compile(r"\*\*|__|~~"));

/// `_word_` emphasis; groups 1–3 are the surrounding char, text and trailing char.
pub static UNDERSCORE_EMPHASIS: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(^|[^\w])_([^_\n]+)_([^\w]|$)"));

/// Any remaining HTML/XML tag, comment or doctype.
pub static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| compile(r"<!--.*?-->|</?[A-Za-z][^<>]*>|<![A-Za-z][^<>]*>"));

/// Runs of whitespace.
pub static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| compile(r"\s+"));

// ── Boundary detection ─────────────────────────────────────────────

/// A possibly unfinished markdown image running to the end of text.
pub static PARTIAL_MD_IMAGE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\A!\[[^\]\n]*(?:\](?:\([^)\n]*)?)?\z"));

/// A markdown table delimiter row (`| --- | :-: |`).
pub static TABLE_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"^[ \t]*\|?[ \t]*:?-{1,}:?[ \t]*(?:\|[ \t]*:?-{1,}:?[ \t]*)*\|?[ \t]*$")
});
