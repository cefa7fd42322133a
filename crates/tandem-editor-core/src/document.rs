//! Rich-text document trait and the in-memory block document.
//!
//! Defines the `RichTextDocument` trait for the parts of a rich-text engine
//! the overlay core relies on, so the extractor and span model can run over
//! any engine. `Document` is the plain in-memory implementation: an ordered
//! list of blocks, each with per-character metadata, plus an entity map.

use std::collections::BTreeMap;

use smol_str::SmolStr;

use crate::annotation::{Annotation, AnnotationKind, Entity, EntityKey, Mutability, entity_runs};
use crate::error::EditorError;
use crate::types::{BlockKey, DocPosition, Selection, SpanRange};

/// Block type given to blocks created without an explicit one.
pub const UNSTYLED: &str = "unstyled";

/// Borrowed view of one block during enumeration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockView<'a> {
    pub key: &'a BlockKey,
    pub text: &'a str,
}

/// Core trait for rich-text documents.
///
/// Covers block enumeration, plain-text access and the entity subsystem.
/// Text mutation, selection handling and rendering stay with the engine.
pub trait RichTextDocument {
    // === Required: Blocks ===

    /// Enumerate blocks in document order.
    fn blocks(&self) -> impl Iterator<Item = BlockView<'_>>;

    /// Plain text of a block.
    fn block_text(&self, key: &BlockKey) -> Option<&str>;

    /// Index of a block in document order.
    fn block_order(&self, key: &BlockKey) -> Option<usize>;

    // === Required: Entities ===

    /// Entity covering the character at `position`, if any.
    fn entity_at(&self, position: &DocPosition) -> Option<EntityKey>;

    /// Look up an entity definition.
    fn entity(&self, key: EntityKey) -> Option<&Entity>;

    /// Register a new entity and return its key.
    fn create_entity(&mut self, kind: AnnotationKind, mutability: Mutability) -> EntityKey;

    /// Set (or with `None`, clear) the entity over every character in `selection`.
    fn apply_entity(
        &mut self,
        selection: &Selection,
        entity: Option<EntityKey>,
    ) -> Result<(), EditorError>;

    /// Maximal entity runs in a block.
    fn annotations(&self, block: &BlockKey) -> Vec<Annotation>;

    // === Provided ===

    fn contains_block(&self, key: &BlockKey) -> bool {
        self.block_order(key).is_some()
    }

    /// Kind of the entity covering `position`, if any.
    fn annotation_kind_at(&self, position: &DocPosition) -> Option<&AnnotationKind> {
        let key = self.entity_at(position)?;
        self.entity(key).map(|e| &e.kind)
    }

    fn block_count(&self) -> usize {
        self.blocks().count()
    }
}

/// Per-character metadata: entity slot and inline styles.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct CharMeta {
    pub entity: Option<EntityKey>,
    /// Sorted, deduplicated inline style names.
    pub styles: Vec<SmolStr>,
}

/// One paragraph-level block.
#[derive(Clone, Debug, PartialEq)]
pub struct ContentBlock {
    key: BlockKey,
    block_type: SmolStr,
    depth: u32,
    text: String,
    chars: Vec<CharMeta>,
    data: serde_json::Map<String, serde_json::Value>,
}

impl ContentBlock {
    /// Create an unstyled block with a freshly minted key.
    pub fn new(text: &str) -> Self {
        Self {
            key: BlockKey::mint(),
            block_type: SmolStr::new_static(UNSTYLED),
            depth: 0,
            text: text.to_owned(),
            chars: vec![CharMeta::default(); text.chars().count()],
            data: serde_json::Map::new(),
        }
    }

    pub(crate) fn from_parts(
        block_type: SmolStr,
        depth: u32,
        text: String,
        chars: Vec<CharMeta>,
        data: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        debug_assert_eq!(chars.len(), text.chars().count());
        Self {
            key: BlockKey::mint(),
            block_type,
            depth,
            text,
            chars,
            data,
        }
    }

    pub fn key(&self) -> &BlockKey {
        &self.key
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn block_type(&self) -> &str {
        &self.block_type
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn data(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.data
    }

    /// Length in chars.
    pub fn len_chars(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn chars(&self) -> &[CharMeta] {
        &self.chars
    }

    pub fn entity_at(&self, offset: usize) -> Option<EntityKey> {
        self.chars.get(offset).and_then(|c| c.entity)
    }

    /// Text of a char range. Returns None if the range is out of bounds.
    pub fn slice(&self, range: SpanRange) -> Option<&str> {
        if range.start > range.end || range.end > self.len_chars() {
            return None;
        }
        let start = self.char_to_byte(range.start);
        let end = self.char_to_byte(range.end);
        Some(&self.text[start..end])
    }

    /// Convert char offset to byte offset (clamped to the text length).
    pub fn char_to_byte(&self, char_offset: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_offset)
            .map(|(byte, _)| byte)
            .unwrap_or(self.text.len())
    }

    fn entity_slots(&self) -> Vec<Option<EntityKey>> {
        self.chars.iter().map(|c| c.entity).collect()
    }

    fn check_offset(&self, offset: usize) -> Result<(), EditorError> {
        if offset > self.len_chars() {
            return Err(EditorError::OffsetOutOfBounds {
                block: self.key.clone(),
                offset,
                len: self.len_chars(),
            });
        }
        Ok(())
    }
}

/// In-memory rich-text document.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    blocks: Vec<ContentBlock>,
    entities: BTreeMap<EntityKey, Entity>,
    next_entity: u32,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// The engine's empty state: a single empty unstyled block.
    pub fn new() -> Self {
        Self::from_blocks(vec![ContentBlock::new("")])
    }

    /// A document with no blocks at all.
    pub fn without_blocks() -> Self {
        Self::from_blocks(Vec::new())
    }

    /// One unstyled block per paragraph.
    pub fn from_paragraphs<S: AsRef<str>>(paragraphs: &[S]) -> Self {
        Self::from_blocks(
            paragraphs
                .iter()
                .map(|p| ContentBlock::new(p.as_ref()))
                .collect(),
        )
    }

    pub fn from_blocks(blocks: Vec<ContentBlock>) -> Self {
        Self {
            blocks,
            entities: BTreeMap::new(),
            next_entity: 0,
        }
    }

    pub(crate) fn from_parts(blocks: Vec<ContentBlock>, entities: BTreeMap<EntityKey, Entity>) -> Self {
        let next_entity = entities.keys().last().map(|k| k.0 + 1).unwrap_or(0);
        Self {
            blocks,
            entities,
            next_entity,
        }
    }

    pub fn block(&self, key: &BlockKey) -> Option<&ContentBlock> {
        self.blocks.iter().find(|b| &b.key == key)
    }

    pub fn block_at(&self, index: usize) -> Option<&ContentBlock> {
        self.blocks.get(index)
    }

    pub fn content_blocks(&self) -> &[ContentBlock] {
        &self.blocks
    }

    pub fn entities(&self) -> impl Iterator<Item = (EntityKey, &Entity)> {
        self.entities.iter().map(|(k, e)| (*k, e))
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Zero blocks, or exactly one block with empty text.
    pub fn is_structurally_empty(&self) -> bool {
        match self.blocks.as_slice() {
            [] => true,
            [only] => only.text.is_empty(),
            _ => false,
        }
    }

    /// Block texts joined by newlines.
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Order an anchor/focus pair into a selection.
    pub fn selection_between(
        &self,
        anchor: DocPosition,
        focus: DocPosition,
    ) -> Result<Selection, EditorError> {
        let a = self.position_index(&anchor)?;
        let f = self.position_index(&focus)?;
        if (a, anchor.offset) <= (f, focus.offset) {
            Ok(Selection::new(anchor, focus))
        } else {
            Ok(Selection::new(focus, anchor))
        }
    }

    /// Compare text, block types, styles and annotation kinds, ignoring
    /// block keys and entity numbering.
    pub fn same_content(&self, other: &Document) -> bool {
        if self.blocks.len() != other.blocks.len() {
            return false;
        }
        self.blocks.iter().zip(&other.blocks).all(|(a, b)| {
            a.text == b.text
                && a.block_type == b.block_type
                && a.depth == b.depth
                && a.data == b.data
                && a.chars.iter().zip(&b.chars).all(|(ca, cb)| {
                    ca.styles == cb.styles
                        && self.entity_signature(ca.entity) == other.entity_signature(cb.entity)
                })
        })
    }

    fn entity_signature(&self, key: Option<EntityKey>) -> Option<(&AnnotationKind, Mutability)> {
        key.and_then(|k| self.entities.get(&k))
            .map(|e| (&e.kind, e.mutability))
    }

    // === Editing primitives ===

    /// Append an unstyled block and return its key.
    pub fn push_block(&mut self, text: &str) -> BlockKey {
        let block = ContentBlock::new(text);
        let key = block.key.clone();
        self.blocks.push(block);
        key
    }

    /// Insert text at a position.
    ///
    /// Inserted characters inherit the entity only when the position sits
    /// strictly inside a mutable entity (same entity on both sides).
    pub fn insert_text(&mut self, at: &DocPosition, text: &str) -> Result<(), EditorError> {
        let idx = self.index_of(&at.block)?;
        let inherited = self.inherited_entity(idx, at.offset);
        let block = &mut self.blocks[idx];
        block.check_offset(at.offset)?;

        let byte = block.char_to_byte(at.offset);
        block.text.insert_str(byte, text);
        let meta = CharMeta {
            entity: inherited,
            styles: Vec::new(),
        };
        let inserted = std::iter::repeat_n(meta, text.chars().count());
        block.chars.splice(at.offset..at.offset, inserted);
        Ok(())
    }

    /// Remove a char range from one block.
    pub fn remove_range(&mut self, key: &BlockKey, range: SpanRange) -> Result<(), EditorError> {
        let idx = self.index_of(key)?;
        let block = &mut self.blocks[idx];
        let range = range.normalize();
        block.check_offset(range.end)?;

        let start = block.char_to_byte(range.start);
        let end = block.char_to_byte(range.end);
        block.text.replace_range(start..end, "");
        block.chars.drain(range.start..range.end);
        Ok(())
    }

    /// Replace the whole text of a block, dropping its inline metadata.
    pub fn replace_block_text(&mut self, key: &BlockKey, text: &str) -> Result<(), EditorError> {
        let idx = self.index_of(key)?;
        let block = &mut self.blocks[idx];
        block.text = text.to_owned();
        block.chars = vec![CharMeta::default(); text.chars().count()];
        Ok(())
    }

    /// Split a block at a position; the tail becomes a new block with a
    /// freshly minted key, which is returned.
    pub fn split_block(&mut self, at: &DocPosition) -> Result<BlockKey, EditorError> {
        let idx = self.index_of(&at.block)?;
        let block = &mut self.blocks[idx];
        block.check_offset(at.offset)?;

        let byte = block.char_to_byte(at.offset);
        let tail_text = block.text.split_off(byte);
        let tail_chars = block.chars.split_off(at.offset);
        let tail = ContentBlock {
            key: BlockKey::mint(),
            block_type: block.block_type.clone(),
            depth: block.depth,
            text: tail_text,
            chars: tail_chars,
            data: serde_json::Map::new(),
        };
        let key = tail.key.clone();
        self.blocks.insert(idx + 1, tail);
        Ok(key)
    }

    /// Remove a block entirely.
    pub fn remove_block(&mut self, key: &BlockKey) -> Result<ContentBlock, EditorError> {
        let idx = self.index_of(key)?;
        Ok(self.blocks.remove(idx))
    }

    /// Add an inline style over a selection.
    pub fn apply_inline_style(&mut self, selection: &Selection, style: &str) -> Result<(), EditorError> {
        for (idx, range) in self.selection_ranges(selection)? {
            for meta in &mut self.blocks[idx].chars[range.start..range.end] {
                if let Err(pos) = meta.styles.binary_search_by(|s| s.as_str().cmp(style)) {
                    meta.styles.insert(pos, SmolStr::new(style));
                }
            }
        }
        Ok(())
    }

    // === Helpers ===

    fn index_of(&self, key: &BlockKey) -> Result<usize, EditorError> {
        self.blocks
            .iter()
            .position(|b| &b.key == key)
            .ok_or_else(|| EditorError::UnknownBlock(key.clone()))
    }

    fn position_index(&self, position: &DocPosition) -> Result<usize, EditorError> {
        let idx = self.index_of(&position.block)?;
        self.blocks[idx].check_offset(position.offset)?;
        Ok(idx)
    }

    fn inherited_entity(&self, idx: usize, offset: usize) -> Option<EntityKey> {
        if offset == 0 {
            return None;
        }
        let block = &self.blocks[idx];
        let before = block.entity_at(offset - 1)?;
        if block.entity_at(offset) != Some(before) {
            return None;
        }
        self.entities
            .get(&before)
            .filter(|e| e.mutability == Mutability::Mutable)
            .map(|_| before)
    }

    /// Per-block char ranges covered by a selection, in document order.
    fn selection_ranges(&self, selection: &Selection) -> Result<Vec<(usize, SpanRange)>, EditorError> {
        let first = self.position_index(&selection.start)?;
        let last = self.position_index(&selection.end)?;
        if (first, selection.start.offset) > (last, selection.end.offset) {
            return Err(EditorError::InvertedSelection);
        }

        let ranges = (first..=last)
            .map(|idx| {
                let start = if idx == first { selection.start.offset } else { 0 };
                let end = if idx == last {
                    selection.end.offset
                } else {
                    self.blocks[idx].len_chars()
                };
                (idx, SpanRange::new(start, end))
            })
            .collect();
        Ok(ranges)
    }
}

impl RichTextDocument for Document {
    fn blocks(&self) -> impl Iterator<Item = BlockView<'_>> {
        self.blocks.iter().map(|b| BlockView {
            key: &b.key,
            text: &b.text,
        })
    }

    fn block_text(&self, key: &BlockKey) -> Option<&str> {
        self.block(key).map(|b| b.text.as_str())
    }

    fn block_order(&self, key: &BlockKey) -> Option<usize> {
        self.blocks.iter().position(|b| &b.key == key)
    }

    fn entity_at(&self, position: &DocPosition) -> Option<EntityKey> {
        self.block(&position.block)?.entity_at(position.offset)
    }

    fn entity(&self, key: EntityKey) -> Option<&Entity> {
        self.entities.get(&key)
    }

    fn create_entity(&mut self, kind: AnnotationKind, mutability: Mutability) -> EntityKey {
        let key = EntityKey(self.next_entity);
        self.next_entity += 1;
        self.entities.insert(key, Entity::new(kind, mutability));
        key
    }

    fn apply_entity(
        &mut self,
        selection: &Selection,
        entity: Option<EntityKey>,
    ) -> Result<(), EditorError> {
        if let Some(key) = entity {
            if !self.entities.contains_key(&key) {
                return Err(EditorError::UnknownEntity(key));
            }
        }
        // Every kind is exclusive: the slot is simply overwritten.
        for (idx, range) in self.selection_ranges(selection)? {
            for meta in &mut self.blocks[idx].chars[range.start..range.end] {
                meta.entity = entity;
            }
        }
        Ok(())
    }

    fn annotations(&self, block: &BlockKey) -> Vec<Annotation> {
        let Some(b) = self.block(block) else {
            return Vec::new();
        };
        entity_runs(&b.entity_slots())
            .into_iter()
            .filter_map(|(entity, range)| {
                let kind = self.entities.get(&entity)?.kind.clone();
                Some(Annotation {
                    entity,
                    kind,
                    block: block.clone(),
                    range,
                })
            })
            .collect()
    }

    fn block_count(&self) -> usize {
        self.blocks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(doc: &Document, block: usize, offset: usize) -> DocPosition {
        DocPosition::new(doc.block_at(block).unwrap().key().clone(), offset)
    }

    #[test]
    fn test_new_document_is_structurally_empty() {
        assert!(Document::new().is_structurally_empty());
        assert!(Document::without_blocks().is_structurally_empty());
        assert!(Document::from_paragraphs(&[""]).is_structurally_empty());
        assert!(!Document::from_paragraphs(&["x"]).is_structurally_empty());
        assert!(!Document::from_paragraphs(&["", ""]).is_structurally_empty());
    }

    #[test]
    fn test_block_enumeration_order() {
        let doc = Document::from_paragraphs(&["one", "two", "three"]);
        let texts: Vec<&str> = doc.blocks().map(|b| b.text).collect();
        assert_eq!(texts, vec!["one", "two", "three"]);

        let second = doc.block_at(1).unwrap().key().clone();
        assert_eq!(doc.block_order(&second), Some(1));
        assert_eq!(doc.block_text(&second), Some("two"));
        assert_eq!(doc.plain_text(), "one\ntwo\nthree");
    }

    #[test]
    fn test_insert_and_remove_multibyte() {
        let mut doc = Document::from_paragraphs(&["héllo"]);
        let at = pos(&doc, 0, 5);
        doc.insert_text(&at, " wörld").unwrap();
        let key = at.block.clone();
        assert_eq!(doc.block_text(&key), Some("héllo wörld"));
        assert_eq!(doc.block(&key).unwrap().len_chars(), 11);

        doc.remove_range(&key, SpanRange::new(5, 11)).unwrap();
        assert_eq!(doc.block_text(&key), Some("héllo"));
    }

    #[test]
    fn test_insert_out_of_bounds() {
        let mut doc = Document::from_paragraphs(&["abc"]);
        let at = pos(&doc, 0, 4);
        let err = doc.insert_text(&at, "x").unwrap_err();
        assert!(matches!(err, EditorError::OffsetOutOfBounds { offset: 4, len: 3, .. }));
    }

    #[test]
    fn test_apply_entity_across_blocks() {
        let mut doc = Document::from_paragraphs(&["hello", "world"]);
        let entity = doc.create_entity(AnnotationKind::Translatable, Mutability::Mutable);
        let sel = Selection::new(pos(&doc, 0, 3), pos(&doc, 1, 2));
        doc.apply_entity(&sel, Some(entity)).unwrap();

        let first = doc.block_at(0).unwrap().key().clone();
        let second = doc.block_at(1).unwrap().key().clone();
        assert_eq!(doc.annotations(&first)[0].range, SpanRange::new(3, 5));
        assert_eq!(doc.annotations(&second)[0].range, SpanRange::new(0, 2));
        assert_eq!(
            doc.annotation_kind_at(&DocPosition::new(second, 1)),
            Some(&AnnotationKind::Translatable)
        );
    }

    #[test]
    fn test_apply_unknown_entity_rejected() {
        let mut doc = Document::from_paragraphs(&["hello"]);
        let sel = Selection::new(pos(&doc, 0, 0), pos(&doc, 0, 2));
        let err = doc.apply_entity(&sel, Some(EntityKey(7))).unwrap_err();
        assert_eq!(err, EditorError::UnknownEntity(EntityKey(7)));
    }

    #[test]
    fn test_inverted_selection_rejected() {
        let mut doc = Document::from_paragraphs(&["hello", "world"]);
        let sel = Selection::new(pos(&doc, 1, 0), pos(&doc, 0, 2));
        assert_eq!(
            doc.apply_entity(&sel, None).unwrap_err(),
            EditorError::InvertedSelection
        );

        let ordered = doc
            .selection_between(pos(&doc, 1, 0), pos(&doc, 0, 2))
            .unwrap();
        assert_eq!(ordered.start, pos(&doc, 0, 2));
        assert_eq!(ordered.end, pos(&doc, 1, 0));
    }

    #[test]
    fn test_typing_inside_mutable_entity_extends_it() {
        let mut doc = Document::from_paragraphs(&["hello world"]);
        let key = doc.block_at(0).unwrap().key().clone();
        let entity = doc.create_entity(AnnotationKind::Translatable, Mutability::Mutable);
        doc.apply_entity(&Selection::within(key.clone(), 0..5), Some(entity))
            .unwrap();

        // Inside the entity: inherits.
        doc.insert_text(&DocPosition::new(key.clone(), 2), "XX").unwrap();
        assert_eq!(doc.annotations(&key)[0].range, SpanRange::new(0, 7));

        // At the trailing edge: does not inherit.
        doc.insert_text(&DocPosition::new(key.clone(), 7), "!").unwrap();
        assert_eq!(doc.annotations(&key)[0].range, SpanRange::new(0, 7));
        assert_eq!(doc.block_text(&key), Some("heXXllo! world"));
    }

    #[test]
    fn test_split_block_mints_new_key() {
        let mut doc = Document::from_paragraphs(&["hello world"]);
        let key = doc.block_at(0).unwrap().key().clone();
        let tail = doc.split_block(&DocPosition::new(key.clone(), 5)).unwrap();

        assert_ne!(tail, key);
        assert_eq!(doc.block_text(&key), Some("hello"));
        assert_eq!(doc.block_text(&tail), Some(" world"));
        assert_eq!(doc.block_order(&tail), Some(1));
    }

    #[test]
    fn test_remove_block_then_push_never_reuses_key() {
        let mut doc = Document::from_paragraphs(&["a", "b"]);
        let removed = doc.block_at(1).unwrap().key().clone();
        doc.remove_block(&removed).unwrap();
        let added = doc.push_block("b");
        assert_ne!(added, removed);
        assert!(!doc.contains_block(&removed));
    }

    #[test]
    fn test_inline_styles_sorted_and_deduplicated() {
        let mut doc = Document::from_paragraphs(&["abc"]);
        let key = doc.block_at(0).unwrap().key().clone();
        let sel = Selection::within(key.clone(), 0..2);
        doc.apply_inline_style(&sel, "ITALIC").unwrap();
        doc.apply_inline_style(&sel, "BOLD").unwrap();
        doc.apply_inline_style(&sel, "BOLD").unwrap();

        let chars = doc.block(&key).unwrap().chars();
        assert_eq!(chars[0].styles, vec![SmolStr::new("BOLD"), SmolStr::new("ITALIC")]);
        assert!(chars[2].styles.is_empty());
    }

    #[test]
    fn test_same_content_ignores_keys() {
        let a = Document::from_paragraphs(&["x", "y"]);
        let b = Document::from_paragraphs(&["x", "y"]);
        assert_ne!(a, b); // keys differ
        assert!(a.same_content(&b));
        assert!(!a.same_content(&Document::from_paragraphs(&["x"])));
    }
}
