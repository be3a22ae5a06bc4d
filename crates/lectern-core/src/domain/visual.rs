//! Visual element kinds recognised inside the narration stream.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of non-speakable element carved out of the text stream.
///
/// The variant order is the tie-break priority used when two candidates
/// start at the same offset: paired HTML/XML tags first, then fenced
/// blocks, then inline elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualKind {
    /// `<svg>…</svg>` diagram.
    Svg,
    /// `<iframe>…</iframe>` embed.
    Iframe,
    /// `<video>…</video>` player.
    Video,
    /// `<table>…</table>` HTML table.
    HtmlTable,
    /// Interactive HTML widget (`<html>`, `<div>`, `<script>`, `<style>`).
    Sandbox,
    /// Fenced code block.
    Fence,
    /// Markdown `![alt](url)` or HTML `<img>` image.
    MdImage,
    /// Pipe-delimited markdown table.
    MdTable,
    /// `$$…$$` or `\[…\]` LaTeX block.
    Math,
}

impl VisualKind {
    /// All kinds in priority order.
    pub const ALL: [Self; 9] = [
        Self::Svg,
        Self::Iframe,
        Self::Video,
        Self::HtmlTable,
        Self::Sandbox,
        Self::Fence,
        Self::MdImage,
        Self::MdTable,
        Self::Math,
    ];

    /// Wire label of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Svg => "svg",
            Self::Iframe => "iframe",
            Self::Video => "video",
            Self::HtmlTable => "html_table",
            Self::Sandbox => "sandbox",
            Self::Fence => "fence",
            Self::MdImage => "md_image",
            Self::MdTable => "md_table",
            Self::Math => "math",
        }
    }

    /// Lower number = higher priority on equal start offsets.
    #[must_use]
    pub const fn priority(self) -> u8 {
        match self {
            Self::Svg | Self::Iframe | Self::Video | Self::HtmlTable | Self::Sandbox => 0,
            Self::Fence => 1,
            Self::MdImage | Self::MdTable | Self::Math => 2,
        }
    }
}

impl fmt::Display for VisualKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
