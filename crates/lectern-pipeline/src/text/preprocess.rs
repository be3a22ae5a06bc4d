//! Markdown → narration prose.
//!
//! Only speakable text reaches this stage; visual elements were already
//! carved out by the boundary detector. Whatever markup is left (headings,
//! emphasis, stray tags, a cut-off fence at the end of a stream) is reduced
//! to plain sentences.

use std::borrow::Cow;

use super::patterns::{
    BLOCKQUOTE, DATA_URI, DOUBLE_EMPHASIS, FENCED_CODE, HEADING, HORIZONTAL_RULE, HTML_IMAGE,
    HTML_TAG, INLINE_CODE, LATEX, LINK, LIST_MARKER, MD_IMAGE, RAW_BLOCK, THINKING_BLOCK,
    UNDERSCORE_EMPHASIS, WHITESPACE,
};

/// Strip markdown and markup from `text`, producing plain prose for TTS.
///
/// Handles:
/// - Thinking/reasoning blocks (`<think>`, `<reasoning>`) → removed entirely
/// - Fenced code, raw SVG/script/style/math elements, LaTeX → removed
/// - Images (markdown and `<img>`) and `data:` URIs → removed
/// - Links `[text](url)` → `text`
/// - Headings, list and blockquote markers, horizontal rules → removed
/// - Bold / italic / strikethrough markers, inline code ticks → removed
/// - Remaining HTML tags → removed; common entities unescaped
/// - Whitespace collapsed to single spaces
///
/// The result is a fixed point: `preprocess(preprocess(x)) == preprocess(x)`.
#[must_use]
pub fn preprocess(text: &str) -> String {
    // Every pass that changes its input either shortens it or turns a
    // non-space whitespace char into a space, so this terminates.
    let mut current = preprocess_once(text);
    loop {
        let next = preprocess_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Whether `text` contains anything a voice could say.
#[must_use]
pub fn is_speakable(text: &str) -> bool {
    text.chars().any(char::is_alphanumeric)
}

/// Remove `<think>` / `<reasoning>` blocks, including an unterminated one
/// at the end of text.
#[must_use]
pub fn strip_thinking_blocks(text: &str) -> Cow<'_, str> {
    THINKING_BLOCK.replace_all(text, "")
}

fn preprocess_once(text: &str) -> String {
    // Block-level removals first so their bodies never leak into later passes.
    let s = strip_thinking_blocks(text);
    let s = FENCED_CODE.replace_all(&s, " ");
    let s = RAW_BLOCK.replace_all(&s, " ");
    let s = LATEX.replace_all(&s, " ");
    let s = MD_IMAGE.replace_all(&s, " ");
    let s = HTML_IMAGE.replace_all(&s, " ");
    let s = DATA_URI.replace_all(&s, " ");

    // Line-level markers.
    let s = HORIZONTAL_RULE.replace_all(&s, " ");
    let s = HEADING.replace_all(&s, "");
    let s = BLOCKQUOTE.replace_all(&s, "");
    let s = LIST_MARKER.replace_all(&s, "");

    // Inline markup.
    let s = LINK.replace_all(&s, "$1");
    let s = INLINE_CODE.replace_all(&s, "$1");
    let s = DOUBLE_EMPHASIS.replace_all(&s, "");
    let s = s.replace('*', "");
    let s = UNDERSCORE_EMPHASIS.replace_all(&s, "$1$2$3");
    let s = HTML_TAG.replace_all(&s, " ");

    let s = unescape_entities(&s);
    WHITESPACE.replace_all(&s, " ").trim().to_string()
}

/// Decode the handful of entities LLM output actually contains.
///
/// Single left-to-right pass, so `&amp;lt;` becomes `&lt;`; the fixed point
/// loop in [`preprocess`] peels the remaining layers.
fn unescape_entities(text: &str) -> String {
    const ENTITIES: [(&str, &str); 7] = [
        ("&amp;", "&"),
        ("&lt;", "<"),
        ("&gt;", ">"),
        ("&quot;", "\""),
        ("&#39;", "'"),
        ("&apos;", "'"),
        ("&nbsp;", " "),
    ];

    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        if let Some((entity, replacement)) = ENTITIES.iter().find(|(e, _)| tail.starts_with(e)) {
            out.push_str(replacement);
            rest = &tail[entity.len()..];
        } else {
            out.push('&');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}
