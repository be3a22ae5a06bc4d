//! Text utilities: shared patterns, markdown preprocessing and splitting.

pub mod patterns;
pub mod preprocess;
pub mod splitter;

pub use preprocess::{is_speakable, preprocess, strip_thinking_blocks};
pub use splitter::{
    complete_prefix_len, first_cut, last_settled_break, open_markup_start, split, split_sentences,
};
