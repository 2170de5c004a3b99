//! Structured rich-text document and the formatting capability set.
//!
//! [`RichText`] is a list of [`Block`]s, each holding styled [`Span`]s. The
//! toolbar talks to it only through [`FormattingSurface`], so the page model
//! never depends on a particular rendering surface. A [`DocumentBody`]
//! snapshot (escaped HTML plus plain text) is what gets persisted.
//!
//! Positions are character offsets (not bytes) within a block.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::DocumentBody;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InlineStyle {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Code,
}

impl InlineStyle {
    fn tag(self) -> &'static str {
        match self {
            InlineStyle::Bold => "strong",
            InlineStyle::Italic => "em",
            InlineStyle::Underline => "u",
            InlineStyle::Strikethrough => "s",
            InlineStyle::Code => "code",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockTag {
    #[default]
    Paragraph,
    Heading1,
    Heading2,
    Blockquote,
}

impl BlockTag {
    fn tag(self) -> &'static str {
        match self {
            BlockTag::Paragraph => "p",
            BlockTag::Heading1 => "h1",
            BlockTag::Heading2 => "h2",
            BlockTag::Blockquote => "blockquote",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub block: usize,
    pub offset: usize,
}

impl Position {
    pub fn new(block: usize, offset: usize) -> Self {
        Self { block, offset }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRange {
    pub start: Position,
    pub end: Position,
}

impl TextRange {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Range inside a single block.
    pub fn within(block: usize, start: usize, end: usize) -> Self {
        Self::new(Position::new(block, start), Position::new(block, end))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("range start {start:?} is after end {end:?}")]
    Inverted { start: Position, end: Position },
    #[error("block {0} does not exist")]
    NoSuchBlock(usize),
    #[error("offset {offset} is past the end of block {block} (length {len})")]
    OffsetOutOfRange {
        block: usize,
        offset: usize,
        len: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub text: String,
    #[serde(default)]
    pub styles: BTreeSet<InlineStyle>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Block {
    pub tag: BlockTag,
    pub spans: Vec<Span>,
}

fn char_to_byte(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map(|(b, _)| b).unwrap_or(s.len())
}

impl Block {
    pub fn new(tag: BlockTag, text: impl Into<String>) -> Self {
        let mut block = Self {
            tag,
            spans: vec![Span {
                text: text.into(),
                styles: BTreeSet::new(),
            }],
        };
        block.normalize();
        block
    }

    pub fn len(&self) -> usize {
        self.spans.iter().map(|s| s.text.chars().count()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }

    /// Ensures a span boundary at `offset` and returns the index of the
    /// first span starting there.
    fn split_at(&mut self, offset: usize) -> usize {
        let mut pos = 0;
        for i in 0..self.spans.len() {
            if offset == pos {
                return i;
            }
            let len = self.spans[i].text.chars().count();
            if offset < pos + len {
                let byte = char_to_byte(&self.spans[i].text, offset - pos);
                let tail = self.spans[i].text.split_off(byte);
                let styles = self.spans[i].styles.clone();
                self.spans.insert(i + 1, Span { text: tail, styles });
                return i + 1;
            }
            pos += len;
        }
        self.spans.len()
    }

    fn normalize(&mut self) {
        self.spans.retain(|s| !s.text.is_empty());
        let mut merged: Vec<Span> = Vec::with_capacity(self.spans.len());
        for span in self.spans.drain(..) {
            match merged.last_mut() {
                Some(prev) if prev.styles == span.styles => prev.text.push_str(&span.text),
                _ => merged.push(span),
            }
        }
        self.spans = merged;
    }

    fn to_html(&self, out: &mut String) {
        let tag = self.tag.tag();
        out.push('<');
        out.push_str(tag);
        out.push('>');
        for span in &self.spans {
            for style in &span.styles {
                out.push('<');
                out.push_str(style.tag());
                out.push('>');
            }
            escape_html(&span.text, out);
            for style in span.styles.iter().rev() {
                out.push_str("</");
                out.push_str(style.tag());
                out.push('>');
            }
        }
        out.push_str("</");
        out.push_str(tag);
        out.push('>');
    }
}

fn escape_html(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}

/// Formatting capabilities the toolbar relies on.
pub trait FormattingSurface {
    /// Toggles `style` over `range`: removed when every character in the range
    /// already carries it, added everywhere otherwise.
    fn apply_inline_style(&mut self, range: TextRange, style: InlineStyle)
        -> Result<(), FormatError>;

    /// Sets the block tag of every block touched by `range`.
    fn apply_block_style(&mut self, range: TextRange, tag: BlockTag) -> Result<(), FormatError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RichText {
    blocks: Vec<Block>,
}

impl RichText {
    pub fn new() -> Self {
        Self::default()
    }

    /// One paragraph per line.
    pub fn from_plain_text(text: &str) -> Self {
        Self {
            blocks: text
                .split('\n')
                .map(|line| Block::new(BlockTag::Paragraph, line))
                .collect(),
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn push_block(&mut self, tag: BlockTag, text: impl Into<String>) {
        self.blocks.push(Block::new(tag, text));
    }

    /// Inserts `text` at `at`, inheriting the styles of the character before
    /// it (or after it, at the start of a block).
    pub fn insert_text(&mut self, at: Position, text: &str) -> Result<(), FormatError> {
        self.check_position(at)?;
        let block = &mut self.blocks[at.block];
        let idx = block.split_at(at.offset);
        let styles = if idx > 0 {
            block.spans[idx - 1].styles.clone()
        } else {
            block
                .spans
                .first()
                .map(|s| s.styles.clone())
                .unwrap_or_default()
        };
        block.spans.insert(
            idx,
            Span {
                text: text.to_string(),
                styles,
            },
        );
        block.normalize();
        Ok(())
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            block.to_html(&mut out);
        }
        out
    }

    /// Blocks joined by newlines.
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(Block::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn snapshot(&self) -> DocumentBody {
        DocumentBody {
            html: self.to_html(),
            text: self.plain_text(),
        }
    }

    fn check_position(&self, pos: Position) -> Result<(), FormatError> {
        let block = self
            .blocks
            .get(pos.block)
            .ok_or(FormatError::NoSuchBlock(pos.block))?;
        let len = block.len();
        if pos.offset > len {
            return Err(FormatError::OffsetOutOfRange {
                block: pos.block,
                offset: pos.offset,
                len,
            });
        }
        Ok(())
    }

    /// Per-block `(block, start, end)` character ranges covered by `range`.
    fn segments(&self, range: TextRange) -> Result<Vec<(usize, usize, usize)>, FormatError> {
        if range.start > range.end {
            return Err(FormatError::Inverted {
                start: range.start,
                end: range.end,
            });
        }
        self.check_position(range.start)?;
        self.check_position(range.end)?;
        Ok((range.start.block..=range.end.block)
            .map(|b| {
                let start = if b == range.start.block {
                    range.start.offset
                } else {
                    0
                };
                let end = if b == range.end.block {
                    range.end.offset
                } else {
                    self.blocks[b].len()
                };
                (b, start, end)
            })
            .collect())
    }
}

impl FormattingSurface for RichText {
    fn apply_inline_style(
        &mut self,
        range: TextRange,
        style: InlineStyle,
    ) -> Result<(), FormatError> {
        let mut covered = Vec::new();
        for (b, start, end) in self.segments(range)? {
            if start == end {
                continue;
            }
            let block = &mut self.blocks[b];
            let first = block.split_at(start);
            let last = block.split_at(end);
            covered.push((b, first, last));
        }

        let fully_styled = covered.iter().all(|&(b, first, last)| {
            self.blocks[b].spans[first..last]
                .iter()
                .all(|s| s.styles.contains(&style))
        });

        for &(b, first, last) in &covered {
            for span in &mut self.blocks[b].spans[first..last] {
                if fully_styled {
                    span.styles.remove(&style);
                } else {
                    span.styles.insert(style);
                }
            }
        }
        for &(b, _, _) in &covered {
            self.blocks[b].normalize();
        }
        Ok(())
    }

    fn apply_block_style(&mut self, range: TextRange, tag: BlockTag) -> Result<(), FormatError> {
        for (b, _, _) in self.segments(range)? {
            self.blocks[b].tag = tag;
        }
        Ok(())
    }
}
