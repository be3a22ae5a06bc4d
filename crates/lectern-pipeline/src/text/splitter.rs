//! Sentence segmentation and cap-respecting chunking.
//!
//! Chunks never exceed either cap. Cuts prefer, in order: the last sentence
//! end that fits, the last clause mark, the last whitespace, and finally a
//! hard cut on a character boundary.
//!
//! While text is still streaming in, a cut never lands inside inline markup
//! that is still open (a link, a code span, a `**`/`__` pair or a thinking
//! block): the preprocessor only recognizes those constructs whole.

use super::patterns::{THINKING_BLOCK, THINKING_CLOSE};

/// Western sentence terminators; they end a sentence only before
/// whitespace or the end of text.
const WESTERN_TERMINATORS: [char; 3] = ['.', '!', '?'];

/// CJK terminators end a sentence immediately.
const CJK_TERMINATORS: [char; 4] = ['。', '！', '？', '；'];

/// Characters that stay attached to the sentence they close.
const CLOSERS: [char; 12] = [
    '"', '\'', ')', ']', '}', '*', '_', '”', '’', '」', '』', '）',
];

const CLAUSE_MARKS: [char; 7] = [',', ';', ':', '，', '、', '：', '；'];

/// Byte offsets just past each sentence end in `text`.
///
/// With `at_end` the end of `text` counts as whitespace, so a trailing
/// `"Done."` is a complete sentence. Streaming callers pass `false`: more
/// text may still turn `"3."` into `"3.14"`.
pub fn sentence_ends(text: &str, at_end: bool) -> Vec<usize> {
    let mut ends = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        let mut saw_cjk = CJK_TERMINATORS.contains(&c);
        if !saw_cjk && !WESTERN_TERMINATORS.contains(&c) {
            continue;
        }

        // Absorb runs like "?!" / "..." and closing quotes or brackets.
        let mut end = i + c.len_utf8();
        while let Some(&(j, next)) = chars.peek() {
            let is_cjk = CJK_TERMINATORS.contains(&next);
            if is_cjk || WESTERN_TERMINATORS.contains(&next) || CLOSERS.contains(&next) {
                saw_cjk |= is_cjk;
                end = j + next.len_utf8();
                chars.next();
            } else {
                break;
            }
        }

        let followed_by_space = match chars.peek() {
            Some(&(_, next)) => next.is_whitespace(),
            None => at_end,
        };
        if saw_cjk || followed_by_space {
            ends.push(end);
        }
    }
    ends
}

/// Split `text` into trimmed sentences. The last one may be unterminated.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for end in sentence_ends(text, true) {
        push_trimmed(&mut sentences, &text[start..end]);
        start = end;
    }
    push_trimmed(&mut sentences, &text[start..]);
    sentences
}

/// Length in bytes of the prefix made of complete sentences while text is
/// still streaming in. `0` when no sentence has ended yet.
///
/// Sentence ends inside open inline markup do not count.
pub fn complete_prefix_len(text: &str) -> usize {
    let ends = sentence_ends(text, false);
    if ends.is_empty() {
        return 0;
    }
    let thinking: Vec<(usize, usize)> = THINKING_BLOCK
        .find_iter(text)
        .map(|m| (m.start(), m.end()))
        .collect();

    let mut markup = InlineMarkup::default();
    let mut pending = ends.into_iter().peekable();
    let mut complete = 0;
    for (i, c) in text.char_indices() {
        markup.step(i, c);
        let after = i + c.len_utf8();
        while let Some(end) = pending.next_if(|&end| end <= after) {
            let in_thinking = thinking.iter().any(|&(start, stop)| start < end && end <= stop);
            if end == after && markup.is_closed() && !in_thinking {
                complete = end;
            }
        }
    }
    complete
}

/// Byte offset where inline markup still open at the end of `text`
/// begins, if any.
pub fn open_markup_start(text: &str) -> Option<usize> {
    let mut markup = InlineMarkup::default();
    for (i, c) in text.char_indices() {
        markup.step(i, c);
    }
    let inline = markup.opened_at;
    let thinking = THINKING_BLOCK
        .find_iter(text)
        .last()
        .filter(|m| m.end() == text.len() && !THINKING_CLOSE.is_match(m.as_str()))
        .map(|m| m.start());
    inline.into_iter().chain(thinking).min()
}

/// Byte offset of the last whitespace in `text` that lies outside inline
/// markup and thinking blocks, for cuts forced by the size caps.
pub fn last_settled_break(text: &str) -> Option<usize> {
    let thinking: Vec<(usize, usize)> = THINKING_BLOCK
        .find_iter(text)
        .map(|m| (m.start(), m.end()))
        .collect();

    let mut markup = InlineMarkup::default();
    let mut settled = None;
    for (i, c) in text.char_indices() {
        let in_thinking = thinking.iter().any(|&(start, stop)| start < i && i < stop);
        if i > 0 && c.is_whitespace() && markup.is_closed() && !in_thinking {
            settled = Some(i);
        }
        markup.step(i, c);
    }
    settled
}

/// Position inside `[text](url)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum LinkState {
    #[default]
    Outside,
    Text,
    /// Right after `]`; a `(` continues into the URL.
    Bracket,
    Url,
}

/// Line-scoped tracker for inline constructs the preprocessor rewrites as
/// a whole.
#[derive(Debug, Default)]
struct InlineMarkup {
    link: LinkState,
    code: bool,
    strong: bool,
    underline: bool,
    /// A lone `*` or `_` that may become half of a pair.
    pending: Option<char>,
    /// Where the outermost open construct began.
    opened_at: Option<usize>,
}

impl InlineMarkup {
    fn step(&mut self, i: usize, c: char) {
        if c == '\n' {
            *self = Self::default();
            return;
        }
        let was_closed = self.is_closed();
        let mut start = i;

        if c == '`' {
            self.code = !self.code;
            self.pending = None;
        } else if !self.code {
            self.link = match (self.link, c) {
                (LinkState::Url, ')') => LinkState::Outside,
                (LinkState::Url, _) => LinkState::Url,
                (LinkState::Bracket, '(') => LinkState::Url,
                (_, '[') => LinkState::Text,
                (LinkState::Text, ']') => LinkState::Bracket,
                (LinkState::Text, _) => LinkState::Text,
                _ => LinkState::Outside,
            };

            // URLs are full of underscores; emphasis does not nest in them.
            if self.link != LinkState::Url {
                match (self.pending, c) {
                    (Some('*'), '*') => {
                        self.strong = !self.strong;
                        self.pending = None;
                        start = i - 1;
                    }
                    (Some('_'), '_') => {
                        self.underline = !self.underline;
                        self.pending = None;
                        start = i - 1;
                    }
                    (_, '*' | '_') => self.pending = Some(c),
                    _ => self.pending = None,
                }
            }
        }

        if self.is_closed() {
            self.opened_at = None;
        } else if was_closed {
            self.opened_at = Some(start);
        }
    }

    fn is_closed(&self) -> bool {
        self.link == LinkState::Outside && !self.code && !self.strong && !self.underline
    }
}

/// Split `text` into chunks of at most `max_chars` characters and
/// `max_bytes` UTF-8 bytes. Whitespace-only input yields no chunks.
pub fn split(text: &str, max_chars: usize, max_bytes: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let max_bytes = max_bytes.max(4);

    let mut chunks = Vec::new();
    let mut rest = text.trim();
    while !rest.is_empty() {
        let cut = first_cut(rest, max_chars, max_bytes);
        push_trimmed(&mut chunks, &rest[..cut]);
        rest = rest[cut..].trim_start();
    }
    chunks
}

/// Byte length of the first chunk [`split`] would cut from `text`.
pub fn first_cut(text: &str, max_chars: usize, max_bytes: usize) -> usize {
    let limit = fitting_len(text, max_chars, max_bytes);
    if limit == text.len() {
        return limit;
    }

    if let Some(end) = sentence_ends(text, true)
        .into_iter()
        .take_while(|&e| e <= limit)
        .last()
    {
        return end;
    }

    let window = &text[..limit];
    if let Some((i, c)) = window
        .char_indices()
        .filter(|(_, c)| CLAUSE_MARKS.contains(c))
        .last()
    {
        return i + c.len_utf8();
    }
    if let Some((i, _)) = window
        .char_indices()
        .filter(|(i, c)| *i > 0 && c.is_whitespace())
        .last()
    {
        return i;
    }

    // Hard cut; always make progress even if one char exceeds the byte cap.
    if limit == 0 {
        text.chars().next().map_or(text.len(), char::len_utf8)
    } else {
        limit
    }
}

/// Longest prefix (on a char boundary) within both caps.
fn fitting_len(text: &str, max_chars: usize, max_bytes: usize) -> usize {
    let mut len = 0;
    for (count, (i, c)) in text.char_indices().enumerate() {
        let next = i + c.len_utf8();
        if count >= max_chars || next > max_bytes {
            break;
        }
        len = next;
    }
    len
}

fn push_trimmed(out: &mut Vec<String>, piece: &str) {
    let piece = piece.trim();
    if !piece.is_empty() {
        out.push(piece.to_string());
    }
}
