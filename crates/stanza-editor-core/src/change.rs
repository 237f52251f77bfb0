//! Change detection between two document snapshots.
//!
//! `detect_change` is a pure function that classifies the difference between
//! a before/after snapshot pair as exactly one `Change`. It performs no I/O
//! and cannot fail: a structural shape it does not recognize degrades to
//! `Change::None`, because a missed edit is recoverable on the next
//! reconciliation cycle while a thrown error is not.

use crate::snapshot::{Block, BlockKey, Snapshot, SpanKey, TextBlock};

/// Classification of the difference between two snapshots.
///
/// Exactly one variant per comparison, never a list. All offsets are UTF-16
/// code units into the affected block's flattened text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Change {
    /// Snapshots are equivalent.
    None,
    /// Text inserted into a span.
    TextInsert {
        block_key: BlockKey,
        span_key: SpanKey,
        offset: usize,
        text: String,
    },
    /// Contiguous text removed from a span.
    TextDelete {
        block_key: BlockKey,
        span_key: SpanKey,
        from: usize,
        to: usize,
    },
    /// Contiguous text replaced in a span.
    TextReplace {
        block_key: BlockKey,
        span_key: SpanKey,
        from: usize,
        to: usize,
        text: String,
    },
    /// One text block split in two at `split_offset`.
    BlockSplit {
        original_block_key: BlockKey,
        new_block_key: BlockKey,
        split_offset: usize,
    },
    /// Two text blocks joined at `join_offset` in the surviving block.
    BlockMerge {
        surviving_block_key: BlockKey,
        removed_block_key: BlockKey,
        join_offset: usize,
    },
    /// A block appeared with no structural split match.
    BlockInsert { block_key: BlockKey, index: usize },
    /// A block disappeared with no structural merge match.
    BlockDelete { block_key: BlockKey, index: usize },
}

impl Change {
    /// Key of the block whose text changed, for the text-level variants.
    pub fn text_block_key(&self) -> Option<&BlockKey> {
        match self {
            Self::TextInsert { block_key, .. }
            | Self::TextDelete { block_key, .. }
            | Self::TextReplace { block_key, .. } => Some(block_key),
            _ => None,
        }
    }
}

/// The single contiguous differing region between two texts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct DiffBounds {
    start: usize,
    old_end: usize,
    new_end: usize,
}

const fn is_high_surrogate(unit: u16) -> bool {
    matches!(unit, 0xD800..=0xDBFF)
}

const fn is_low_surrogate(unit: u16) -> bool {
    matches!(unit, 0xDC00..=0xDFFF)
}

/// Longest-common-prefix/suffix diff over UTF-16 code units.
///
/// Not a generic LCS: native edits are contiguous, so one differing region
/// is all that can occur in a single reconciliation window.
fn diff_bounds(old: &[u16], new: &[u16]) -> Option<DiffBounds> {
    if old == new {
        return None;
    }

    let mut start = 0;
    let max_start = old.len().min(new.len());
    while start < max_start && old[start] == new[start] {
        start += 1;
    }

    let mut old_end = old.len();
    let mut new_end = new.len();
    // The suffix must not overlap the prefix.
    while old_end > start && new_end > start && old[old_end - 1] == new[new_end - 1] {
        old_end -= 1;
        new_end -= 1;
    }

    // Never split a surrogate pair: two astral characters sharing a
    // surrogate half would otherwise put the region boundary mid-character
    // and make the extracted replacement text lossy. Snap outward to pair
    // boundaries. The common prefix/suffix makes old and new agree on the
    // snapped units, so widening both sides stays consistent.
    if start > 0 && is_high_surrogate(old[start - 1]) {
        start -= 1;
    }
    if old_end < old.len() && is_low_surrogate(old[old_end]) {
        old_end += 1;
        new_end += 1;
    }

    Some(DiffBounds {
        start,
        old_end,
        new_end,
    })
}

/// Detect the change between two snapshots.
///
/// `cursor_hint` is a global cursor offset (flattened block texts joined with
/// a +1 separator per boundary), used only to disambiguate the rare case of
/// multiple blocks showing a text diff in one cycle.
pub fn detect_change(old: &Snapshot, new: &Snapshot, cursor_hint: Option<usize>) -> Change {
    // Identity / empty short-circuit.
    if std::ptr::eq(old, new) || (old.is_empty() && new.is_empty()) {
        return Change::None;
    }

    // Align blocks by key, not position.
    let old_keys: Vec<&BlockKey> = old.blocks.iter().map(Block::key).collect();
    let new_keys: Vec<&BlockKey> = new.blocks.iter().map(Block::key).collect();
    let inserted: Vec<&BlockKey> = new_keys
        .iter()
        .filter(|k| !old_keys.contains(k))
        .copied()
        .collect();
    let deleted: Vec<&BlockKey> = old_keys
        .iter()
        .filter(|k| !new_keys.contains(k))
        .copied()
        .collect();

    if inserted.len() == 1 && deleted.is_empty() {
        if let Some(change) = match_block_split(old, new, inserted[0]) {
            return change;
        }
    }

    if deleted.len() == 1 && inserted.is_empty() {
        if let Some(change) = match_block_merge(old, new, deleted[0]) {
            return change;
        }
    }

    // Pure structural insert/delete with no split/merge match.
    if !inserted.is_empty() && deleted.is_empty() {
        let key = inserted[0].clone();
        let index = new.index_of(&key).unwrap_or(0);
        return Change::BlockInsert {
            block_key: key,
            index,
        };
    }
    if !deleted.is_empty() && inserted.is_empty() {
        let key = deleted[0].clone();
        let index = old.index_of(&key).unwrap_or(0);
        return Change::BlockDelete {
            block_key: key,
            index,
        };
    }

    // Text-level diff over matched keys, in old-snapshot order.
    let mut detected: Vec<Change> = Vec::new();
    for old_block in &old.blocks {
        let Some(old_text_block) = old_block.as_text() else {
            continue;
        };
        let Some(new_text_block) = new.block(old_block.key()).and_then(Block::as_text) else {
            continue;
        };
        if let Some(change) = diff_text_block(old_text_block, new_text_block) {
            detected.push(change);
        }
    }

    match detected.len() {
        0 => Change::None,
        1 => detected.into_iter().next().unwrap_or(Change::None),
        // Simultaneous multi-block edits: disambiguate by cursor, falling
        // back to the first detected change. Best-effort by design.
        _ => {
            tracing::debug!(
                candidates = detected.len(),
                "ambiguous multi-block change"
            );
            if let Some(hint) = cursor_hint {
                if let Some((block, _)) = new.block_at_global_offset(hint) {
                    if let Some(change) = detected
                        .iter()
                        .find(|c| c.text_block_key() == Some(block.key()))
                    {
                        return change.clone();
                    }
                }
            }
            detected.into_iter().next().unwrap_or(Change::None)
        }
    }
}

/// A split leaves the original block's old text equal to the concatenation
/// of its new text and the inserted block's text, with the inserted block
/// directly after it.
fn match_block_split(old: &Snapshot, new: &Snapshot, inserted_key: &BlockKey) -> Option<Change> {
    let index = new.index_of(inserted_key)?;
    if index == 0 {
        return None;
    }
    let inserted_block = new.blocks[index].as_text()?;
    let preceding = new.blocks[index - 1].as_text()?;
    let original = old.block(&preceding.key)?.as_text()?;

    let preceding_text = preceding.flattened_utf16();
    let inserted_text = inserted_block.flattened_utf16();
    let original_text = original.flattened_utf16();

    let mut joined = preceding_text.clone();
    joined.extend_from_slice(&inserted_text);
    if original_text != joined {
        return None;
    }

    Some(Change::BlockSplit {
        original_block_key: preceding.key.clone(),
        new_block_key: inserted_block.key.clone(),
        split_offset: preceding_text.len(),
    })
}

/// A merge leaves a neighbor's new text equal to the concatenation of its
/// old text and the removed block's text (backward merge), or the reverse
/// (forward merge).
fn match_block_merge(old: &Snapshot, new: &Snapshot, removed_key: &BlockKey) -> Option<Change> {
    let removed_index = old.index_of(removed_key)?;
    let removed = old.blocks[removed_index].as_text()?;
    let removed_text = removed.flattened_utf16();

    // Backward merge: the old predecessor absorbed the removed text.
    if removed_index > 0 {
        if let Some(predecessor) = old.blocks[removed_index - 1].as_text() {
            if let Some(survivor) = new.block(&predecessor.key).and_then(Block::as_text) {
                let predecessor_text = predecessor.flattened_utf16();
                let mut joined = predecessor_text.clone();
                joined.extend_from_slice(&removed_text);
                if survivor.flattened_utf16() == joined {
                    return Some(Change::BlockMerge {
                        surviving_block_key: predecessor.key.clone(),
                        removed_block_key: removed.key.clone(),
                        join_offset: predecessor_text.len(),
                    });
                }
            }
        }
    }

    // Forward merge: the old successor absorbed the removed text in front.
    if removed_index + 1 < old.blocks.len() {
        if let Some(successor) = old.blocks[removed_index + 1].as_text() {
            if let Some(survivor) = new.block(&successor.key).and_then(Block::as_text) {
                let mut joined = removed_text.clone();
                joined.extend_from_slice(&successor.flattened_utf16());
                if survivor.flattened_utf16() == joined {
                    return Some(Change::BlockMerge {
                        surviving_block_key: successor.key.clone(),
                        removed_block_key: removed.key.clone(),
                        join_offset: removed_text.len(),
                    });
                }
            }
        }
    }

    None
}

/// Diff one matched block pair, classifying the single differing region.
fn diff_text_block(old: &TextBlock, new: &TextBlock) -> Option<Change> {
    let old_text = old.flattened_utf16();
    let new_text = new.flattened_utf16();
    let bounds = diff_bounds(&old_text, &new_text)?;

    let deleted_len = bounds.old_end - bounds.start;
    let inserted_len = bounds.new_end - bounds.start;

    if deleted_len == 0 && inserted_len > 0 {
        // Span lookup in the NEW block: the inserted text lives there.
        let (span, _) = new.span_at_offset(bounds.start)?;
        return Some(Change::TextInsert {
            block_key: new.key.clone(),
            span_key: span.key.clone(),
            offset: bounds.start,
            text: String::from_utf16_lossy(&new_text[bounds.start..bounds.new_end]),
        });
    }

    if deleted_len > 0 && inserted_len == 0 {
        // Span lookup in the OLD block: the removed text lived there.
        let (span, _) = old.span_at_offset(bounds.start)?;
        return Some(Change::TextDelete {
            block_key: old.key.clone(),
            span_key: span.key.clone(),
            from: bounds.start,
            to: bounds.old_end,
        });
    }

    if deleted_len > 0 && inserted_len > 0 {
        let (span, _) = old.span_at_offset(bounds.start)?;
        return Some(Change::TextReplace {
            block_key: old.key.clone(),
            span_key: span.key.clone(),
            from: bounds.start,
            to: bounds.old_end,
            text: String::from_utf16_lossy(&new_text[bounds.start..bounds.new_end]),
        });
    }

    None
}
