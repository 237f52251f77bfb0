//! Structured document snapshots: blocks, spans, and inline objects.
//!
//! A `Snapshot` is an ordered sequence of blocks representing the document at
//! one instant. Snapshots are produced either by parsing the live editable
//! surface or by the command executor re-reading its own model; they are
//! immutable by convention and compared by content only.
//!
//! All offsets in this crate are UTF-16 code units into a block's flattened
//! text, matching what browser selection and input APIs report.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Stable identity of a block across edits.
///
/// Keys are assigned once at creation and never reused. Array position is
/// NOT identity: a block that moves keeps its key.
pub type BlockKey = SmolStr;

/// Stable identity of a span or inline object within a text block.
pub type SpanKey = SmolStr;

/// A text-bearing leaf of a text block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Span {
    /// Stable key, unique within the document.
    #[serde(rename = "_key")]
    pub key: SpanKey,
    /// UTF-8 storage; all offsets into it are measured in UTF-16 code units.
    pub text: String,
    /// Formatting marks (bold, italic, annotation keys, ...). Opaque here.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<SmolStr>,
}

impl Span {
    pub fn new(key: impl Into<SpanKey>, text: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            text: text.into(),
            marks: Vec::new(),
        }
    }

    /// Length of this span's text in UTF-16 code units.
    pub fn len_utf16(&self) -> usize {
        self.text.encode_utf16().count()
    }
}

/// A non-text child of a text block (inline image, mention, ...).
///
/// Contributes no characters to the block's flattened text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InlineObject {
    #[serde(rename = "_key")]
    pub key: SpanKey,
    #[serde(rename = "_type")]
    pub kind: SmolStr,
    /// Opaque attribute data, passed through untouched.
    #[serde(default)]
    pub attrs: serde_json::Value,
}

/// Child of a text block: either a span or an inline object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Child {
    Span(Span),
    Object(InlineObject),
}

impl Child {
    pub fn key(&self) -> &SpanKey {
        match self {
            Self::Span(span) => &span.key,
            Self::Object(obj) => &obj.key,
        }
    }

    pub fn as_span(&self) -> Option<&Span> {
        match self {
            Self::Span(span) => Some(span),
            Self::Object(_) => None,
        }
    }
}

/// A block with ordered span/inline-object children.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    #[serde(rename = "_key")]
    pub key: BlockKey,
    /// Block style discriminator ("normal", "h1", "blockquote", ...).
    pub style: SmolStr,
    pub children: Vec<Child>,
}

impl TextBlock {
    pub fn new(key: impl Into<BlockKey>, children: Vec<Child>) -> Self {
        Self {
            key: key.into(),
            style: SmolStr::new_static("normal"),
            children,
        }
    }

    /// Concatenated span texts in order. Inline objects contribute nothing.
    pub fn flattened_text(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            if let Child::Span(span) = child {
                out.push_str(&span.text);
            }
        }
        out
    }

    /// Flattened text as UTF-16 code units, the unit all diffing runs in.
    pub fn flattened_utf16(&self) -> Vec<u16> {
        let mut out = Vec::new();
        for child in &self.children {
            if let Child::Span(span) = child {
                out.extend(span.text.encode_utf16());
            }
        }
        out
    }

    /// Length of the flattened text in UTF-16 code units.
    pub fn len_utf16(&self) -> usize {
        self.children
            .iter()
            .filter_map(Child::as_span)
            .map(Span::len_utf16)
            .sum()
    }

    /// Resolve the span containing `offset` in the flattened text.
    ///
    /// Walks spans accumulating length. A boundary offset resolves to the
    /// following span; an offset past the end resolves to the last span.
    /// Returns the span and the offset local to it.
    pub fn span_at_offset(&self, offset: usize) -> Option<(&Span, usize)> {
        let mut consumed = 0usize;
        let mut last: Option<&Span> = None;
        for child in &self.children {
            let Child::Span(span) = child else { continue };
            let len = span.len_utf16();
            if offset < consumed + len {
                return Some((span, offset - consumed));
            }
            consumed += len;
            last = Some(span);
        }
        // Boundary at the very end, or past-the-end: last span, clamped.
        last.map(|span| {
            let start = consumed - span.len_utf16();
            (span, (offset - start).min(span.len_utf16()))
        })
    }
}

/// A block with opaque attribute data instead of children (image, embed, ...).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectBlock {
    #[serde(rename = "_key")]
    pub key: BlockKey,
    #[serde(rename = "_type")]
    pub kind: SmolStr,
    #[serde(default)]
    pub attrs: serde_json::Value,
}

/// A node in the document's top-level ordered sequence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Block {
    Text(TextBlock),
    Object(ObjectBlock),
}

impl Block {
    pub fn key(&self) -> &BlockKey {
        match self {
            Self::Text(block) => &block.key,
            Self::Object(block) => &block.key,
        }
    }

    pub fn as_text(&self) -> Option<&TextBlock> {
        match self {
            Self::Text(block) => Some(block),
            Self::Object(_) => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }
}

/// An ordered sequence of blocks: the document at one instant.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    pub blocks: Vec<Block>,
}

impl Snapshot {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Find a block by its stable key.
    pub fn block(&self, key: &BlockKey) -> Option<&Block> {
        self.blocks.iter().find(|b| b.key() == key)
    }

    /// Index of a block by key.
    pub fn index_of(&self, key: &BlockKey) -> Option<usize> {
        self.blocks.iter().position(|b| b.key() == key)
    }

    /// Map a global cursor offset to a block and a block-local offset.
    ///
    /// Global offsets walk the flattened block texts in order with a +1
    /// separator per block boundary (object blocks count as zero-length).
    pub fn block_at_global_offset(&self, offset: usize) -> Option<(&Block, usize)> {
        let mut consumed = 0usize;
        for (i, block) in self.blocks.iter().enumerate() {
            let len = block.as_text().map(TextBlock::len_utf16).unwrap_or(0);
            if offset <= consumed + len {
                return Some((block, offset - consumed));
            }
            consumed += len;
            if i + 1 < self.blocks.len() {
                consumed += 1; // separator between blocks
            }
        }
        None
    }
}

/// Build a single-span text block, the common case in tests and parsers.
pub fn text_block(
    block_key: impl Into<BlockKey>,
    span_key: impl Into<SpanKey>,
    text: impl Into<String>,
) -> Block {
    Block::Text(TextBlock::new(
        block_key,
        vec![Child::Span(Span::new(span_key, text))],
    ))
}
