//! Core identity and position types: block keys, document positions,
//! selections and character ranges.
//!
//! These types are engine-agnostic and can be used with any
//! [`RichTextDocument`](crate::document::RichTextDocument) implementation.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use smol_str::{SmolStr, format_smolstr};

static NEXT_BLOCK_KEY: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a block.
///
/// Keys are minted from a process-wide monotonic counter, so a key is never
/// handed out twice: a block created after another was deleted can't inherit
/// the deleted block's cached translation. Keys never contain `-`, which lets
/// rendering-layer offset keys (`{block}-{decorator}-{leaf}`) be split safely.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockKey(SmolStr);

impl BlockKey {
    /// Mint a fresh, never-before-used key.
    pub fn mint() -> Self {
        let n = NEXT_BLOCK_KEY.fetch_add(1, Ordering::Relaxed);
        Self(format_smolstr!("b{}", n))
    }

    /// Wrap a key string reported back by the rendering layer.
    ///
    /// Only meaningful for keys previously handed out by [`BlockKey::mint`].
    pub fn from_rendered(key: &str) -> Self {
        Self(SmolStr::new(key))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BlockKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// A half-open range of character offsets within one block.
///
/// Offsets count Unicode scalar values (chars), not bytes or UTF-16 units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SpanRange {
    pub start: usize,
    pub end: usize,
}

impl SpanRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn caret(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if an offset falls inside the range (end exclusive).
    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end
    }

    /// Check if two ranges share at least one character.
    pub fn overlaps(&self, other: &SpanRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Shared part of two ranges, if any.
    pub fn intersect(&self, other: &SpanRange) -> Option<SpanRange> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then_some(SpanRange { start, end })
    }

    /// Normalize range so start <= end.
    pub fn normalize(self) -> Self {
        if self.start <= self.end {
            self
        } else {
            Self {
                start: self.end,
                end: self.start,
            }
        }
    }
}

impl From<std::ops::Range<usize>> for SpanRange {
    fn from(r: std::ops::Range<usize>) -> Self {
        Self::new(r.start, r.end)
    }
}

impl From<SpanRange> for std::ops::Range<usize> {
    fn from(r: SpanRange) -> Self {
        r.start..r.end
    }
}

/// A position in the document: a block plus a char offset inside it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DocPosition {
    pub block: BlockKey,
    pub offset: usize,
}

impl DocPosition {
    pub fn new(block: BlockKey, offset: usize) -> Self {
        Self { block, offset }
    }
}

/// Ordered text selection, possibly spanning several blocks.
///
/// `start` is never after `end` in document order. Use
/// [`Document::selection_between`](crate::document::Document::selection_between)
/// to build one from an unordered anchor/focus pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    pub start: DocPosition,
    pub end: DocPosition,
}

impl Selection {
    /// Create a selection from already-ordered bounds.
    pub fn new(start: DocPosition, end: DocPosition) -> Self {
        Self { start, end }
    }

    /// Selection covering `range` inside a single block.
    pub fn within(block: BlockKey, range: impl Into<SpanRange>) -> Self {
        let range = range.into().normalize();
        Self {
            start: DocPosition::new(block.clone(), range.start),
            end: DocPosition::new(block, range.end),
        }
    }

    /// Create a collapsed selection (cursor position).
    pub fn collapsed(position: DocPosition) -> Self {
        Self {
            start: position.clone(),
            end: position,
        }
    }

    /// Check if the selection is collapsed (empty, cursor only).
    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    pub fn is_single_block(&self) -> bool {
        self.start.block == self.end.block
    }
}
