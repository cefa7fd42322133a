//! Transport-neutral raw tree for documents.
//!
//! The raw tree is an ordered list of blocks, each carrying its text plus
//! inline style and entity ranges, and an entity map the entity ranges refer
//! to by key. It serializes to the camelCase JSON shape used by the document
//! files (`entityMap`, `inlineStyleRanges`, `entityRanges`).
//!
//! Offsets and lengths count Unicode scalar values.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use tracing::debug;

use crate::annotation::{AnnotationKind, Entity, EntityKey, Mutability, entity_runs};
use crate::document::{CharMeta, ContentBlock, Document, RichTextDocument, UNSTYLED};
use crate::error::RawError;
use crate::types::SpanRange;

/// Serialized document.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawDocument {
    pub blocks: Vec<RawBlock>,
    #[serde(default)]
    pub entity_map: BTreeMap<u32, RawEntity>,
}

/// Serialized block.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawBlock {
    /// Key the block had when saved. Informational only: loading mints new keys.
    #[serde(default)]
    pub key: SmolStr,
    pub text: String,
    #[serde(rename = "type", default = "default_block_type")]
    pub block_type: SmolStr,
    #[serde(default)]
    pub depth: u32,
    #[serde(default)]
    pub inline_style_ranges: Vec<RawStyleRange>,
    #[serde(default)]
    pub entity_ranges: Vec<RawEntityRange>,
    #[serde(default)]
    pub data: serde_json::Map<String, serde_json::Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RawStyleRange {
    pub offset: usize,
    pub length: usize,
    pub style: SmolStr,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RawEntityRange {
    pub offset: usize,
    pub length: usize,
    pub key: u32,
}

/// Serialized entity definition.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RawEntity {
    #[serde(rename = "type")]
    pub kind: AnnotationKind,
    #[serde(default)]
    pub mutability: Mutability,
    #[serde(default)]
    pub data: serde_json::Map<String, serde_json::Value>,
}

fn default_block_type() -> SmolStr {
    SmolStr::new_static(UNSTYLED)
}

impl RawDocument {
    pub fn to_json(&self) -> Result<String, RawError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, RawError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Convert a document to its raw tree.
///
/// Entity keys are renumbered from 0 in order of first appearance; entities
/// no character refers to are left out.
pub fn convert_to_raw(doc: &Document) -> RawDocument {
    let mut renumbered: HashMap<EntityKey, u32> = HashMap::new();
    let mut entity_map = BTreeMap::new();
    let mut blocks = Vec::with_capacity(doc.len());

    for block in doc.content_blocks() {
        let slots: Vec<Option<EntityKey>> = block.chars().iter().map(|c| c.entity).collect();
        let mut entity_ranges = Vec::new();
        for (entity, range) in entity_runs(&slots) {
            let Some(definition) = doc.entity(entity) else {
                continue;
            };
            let next = renumbered.len() as u32;
            let raw_key = *renumbered.entry(entity).or_insert_with(|| {
                entity_map.insert(
                    next,
                    RawEntity {
                        kind: definition.kind.clone(),
                        mutability: definition.mutability,
                        data: definition.data.clone(),
                    },
                );
                next
            });
            entity_ranges.push(RawEntityRange {
                offset: range.start,
                length: range.len(),
                key: raw_key,
            });
        }

        blocks.push(RawBlock {
            key: SmolStr::new(block.key().as_str()),
            text: block.text().to_owned(),
            block_type: SmolStr::new(block.block_type()),
            depth: block.depth(),
            inline_style_ranges: style_ranges(block.chars()),
            entity_ranges,
            data: block.data().clone(),
        });
    }

    RawDocument { blocks, entity_map }
}

/// Rebuild a document from its raw tree.
///
/// Every range and entity reference is validated. Blocks receive freshly
/// minted keys, so identities from a saved file never alias live ones.
/// Entity keys are renumbered from 0 in key order, whatever the file used.
pub fn convert_from_raw(raw: RawDocument) -> Result<Document, RawError> {
    let mut renumbered: HashMap<u32, EntityKey> = HashMap::with_capacity(raw.entity_map.len());
    let mut entities: BTreeMap<EntityKey, Entity> = BTreeMap::new();
    for (idx, (raw_key, e)) in (0u32..).zip(raw.entity_map) {
        let key = EntityKey(idx);
        renumbered.insert(raw_key, key);
        entities.insert(
            key,
            Entity {
                kind: e.kind,
                mutability: e.mutability,
                data: e.data,
            },
        );
    }

    let mut blocks = Vec::with_capacity(raw.blocks.len());
    for (idx, block) in raw.blocks.into_iter().enumerate() {
        let len = block.text.chars().count();
        let mut chars = vec![CharMeta::default(); len];

        for style in &block.inline_style_ranges {
            let range = checked_range(idx, style.offset, style.length, len)?;
            for meta in &mut chars[range.start..range.end] {
                if let Err(pos) = meta.styles.binary_search(&style.style) {
                    meta.styles.insert(pos, style.style.clone());
                }
            }
        }

        for entity in &block.entity_ranges {
            let range = checked_range(idx, entity.offset, entity.length, len)?;
            let key = *renumbered
                .get(&entity.key)
                .ok_or(RawError::MissingEntity {
                    block: idx,
                    key: entity.key,
                })?;
            for meta in &mut chars[range.start..range.end] {
                meta.entity = Some(key);
            }
        }

        blocks.push(ContentBlock::from_parts(
            block.block_type,
            block.depth,
            block.text,
            chars,
            block.data,
        ));
    }

    debug!(
        target: "tandem::raw",
        blocks = blocks.len(),
        entities = entities.len(),
        "converted raw document"
    );
    Ok(Document::from_parts(blocks, entities))
}

fn checked_range(block: usize, offset: usize, length: usize, len: usize) -> Result<SpanRange, RawError> {
    match offset.checked_add(length) {
        Some(end) if end <= len => Ok(SpanRange::new(offset, end)),
        _ => Err(RawError::RangeOutOfBounds {
            block,
            offset,
            length,
            len,
        }),
    }
}

/// Per-style maximal runs, styles in order of first appearance.
fn style_ranges(chars: &[CharMeta]) -> Vec<RawStyleRange> {
    let mut styles: Vec<&SmolStr> = Vec::new();
    for meta in chars {
        for style in &meta.styles {
            if !styles.contains(&style) {
                styles.push(style);
            }
        }
    }

    let mut ranges = Vec::new();
    for style in styles {
        let mut run_start: Option<usize> = None;
        for (idx, meta) in chars.iter().enumerate() {
            let has = meta.styles.contains(style);
            match (run_start, has) {
                (None, true) => run_start = Some(idx),
                (Some(start), false) => {
                    ranges.push(RawStyleRange {
                        offset: start,
                        length: idx - start,
                        style: style.clone(),
                    });
                    run_start = None;
                }
                _ => {}
            }
        }
        if let Some(start) = run_start {
            ranges.push(RawStyleRange {
                offset: start,
                length: chars.len() - start,
                style: style.clone(),
            });
        }
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spans::{toggle_translatable, translatable_spans};
    use crate::types::Selection;

    fn marked_document() -> Document {
        let doc = Document::from_paragraphs(&["hello world", "second"]);
        let key = doc.block_at(0).unwrap().key().clone();
        toggle_translatable(&doc, &Selection::within(key, 0..5))
            .unwrap()
            .document
    }

    #[test]
    fn test_raw_shape() {
        let mut raw = convert_to_raw(&marked_document());
        for (idx, block) in raw.blocks.iter_mut().enumerate() {
            block.key = smol_str::format_smolstr!("k{}", idx);
        }

        insta::assert_yaml_snapshot!(raw, @r###"
        blocks:
          - key: k0
            text: hello world
            type: unstyled
            depth: 0
            inlineStyleRanges: []
            entityRanges:
              - offset: 0
                length: 5
                key: 0
            data: {}
          - key: k1
            text: second
            type: unstyled
            depth: 0
            inlineStyleRanges: []
            entityRanges: []
            data: {}
        entityMap:
          0:
            type: TRANSLATE_BLOCK_ENTITY
            mutability: MUTABLE
            data: {}
        "###);
    }

    #[test]
    fn test_round_trip_preserves_text_and_annotations() {
        let doc = marked_document();
        let json = convert_to_raw(&doc).to_json().unwrap();
        let back = convert_from_raw(RawDocument::from_json(&json).unwrap()).unwrap();

        assert!(back.same_content(&doc));
        let key = back.block_at(0).unwrap().key().clone();
        assert_eq!(translatable_spans(&back, &key)[0].text, "hello");
    }

    #[test]
    fn test_load_mints_fresh_keys() {
        let doc = marked_document();
        let back = convert_from_raw(convert_to_raw(&doc)).unwrap();
        for (a, b) in doc.content_blocks().iter().zip(back.content_blocks()) {
            assert_ne!(a.key(), b.key());
        }
    }

    #[test]
    fn test_unreferenced_entities_dropped_and_renumbered() {
        let mut doc = Document::from_paragraphs(&["abcdef"]);
        let key = doc.block_at(0).unwrap().key().clone();
        let _orphan = doc.create_entity(AnnotationKind::Translatable, Mutability::Mutable);
        let used = doc.create_entity(AnnotationKind::Other("LINK".into()), Mutability::Immutable);
        doc.apply_entity(&Selection::within(key, 1..3), Some(used))
            .unwrap();

        let raw = convert_to_raw(&doc);
        assert_eq!(raw.entity_map.len(), 1);
        assert_eq!(raw.entity_map[&0].kind, AnnotationKind::Other("LINK".into()));
        assert_eq!(raw.blocks[0].entity_ranges[0].key, 0);
    }

    #[test]
    fn test_style_ranges_round_trip() {
        let mut doc = Document::from_paragraphs(&["bold and italic"]);
        let key = doc.block_at(0).unwrap().key().clone();
        doc.apply_inline_style(&Selection::within(key.clone(), 0..4), "BOLD")
            .unwrap();
        doc.apply_inline_style(&Selection::within(key, 2..15), "ITALIC")
            .unwrap();

        let raw = convert_to_raw(&doc);
        assert_eq!(
            raw.blocks[0].inline_style_ranges,
            vec![
                RawStyleRange {
                    offset: 0,
                    length: 4,
                    style: "BOLD".into()
                },
                RawStyleRange {
                    offset: 2,
                    length: 13,
                    style: "ITALIC".into()
                },
            ]
        );
        assert!(convert_from_raw(raw).unwrap().same_content(&doc));
    }

    #[test]
    fn test_parses_saved_file_format() {
        let json = r#"{
            "blocks": [
                {"key": "9abc1", "text": "héllo wörld", "type": "unstyled", "depth": 0,
                 "inlineStyleRanges": [],
                 "entityRanges": [{"offset": 6, "length": 5, "key": 0}],
                 "data": {}}
            ],
            "entityMap": {"0": {"type": "TRANSLATE_BLOCK_ENTITY", "mutability": "MUTABLE", "data": {}}}
        }"#;
        let doc = convert_from_raw(RawDocument::from_json(json).unwrap()).unwrap();
        let key = doc.block_at(0).unwrap().key().clone();
        assert_ne!(key.as_str(), "9abc1");
        assert_eq!(doc.block_text(&key), Some("héllo wörld"));
        assert_eq!(translatable_spans(&doc, &key)[0].text, "wörld");
    }

    #[test]
    fn test_rejects_out_of_bounds_range() {
        let json = r#"{"blocks":[{"text":"abc","entityRanges":[{"offset":2,"length":5,"key":0}]}],
                       "entityMap":{"0":{"type":"TRANSLATE_BLOCK_ENTITY","mutability":"MUTABLE"}}}"#;
        let err = convert_from_raw(RawDocument::from_json(json).unwrap()).unwrap_err();
        assert!(matches!(
            err,
            RawError::RangeOutOfBounds {
                block: 0,
                offset: 2,
                length: 5,
                len: 3
            }
        ));
    }

    #[test]
    fn test_rejects_missing_entity() {
        let json = r#"{"blocks":[{"text":"abc","entityRanges":[{"offset":0,"length":1,"key":4}]}],
                       "entityMap":{}}"#;
        let err = convert_from_raw(RawDocument::from_json(json).unwrap()).unwrap_err();
        assert!(matches!(err, RawError::MissingEntity { block: 0, key: 4 }));
    }

    #[test]
    fn test_sparse_entity_keys_renumbered_on_load() {
        let json = r#"{"blocks":[{"text":"abcdef","entityRanges":[
                           {"offset":0,"length":1,"key":4294967295},
                           {"offset":2,"length":1,"key":7}]}],
                       "entityMap":{
                           "4294967295":{"type":"LINK","mutability":"IMMUTABLE"},
                           "7":{"type":"TRANSLATE_BLOCK_ENTITY","mutability":"MUTABLE"}}}"#;
        let doc = convert_from_raw(RawDocument::from_json(json).unwrap()).unwrap();
        let keys: Vec<u32> = doc.entities().map(|(key, _)| key.get()).collect();
        assert_eq!(keys, vec![0, 1]);

        let block = doc.block_at(0).unwrap().key().clone();
        let toggled = toggle_translatable(&doc, &Selection::within(block.clone(), 4..6)).unwrap();
        let doc = toggled.document;

        let link = doc.block(&block).unwrap().entity_at(0).unwrap();
        assert_eq!(
            doc.entity(link).unwrap().kind,
            AnnotationKind::Other("LINK".into())
        );
        let spans: Vec<_> = translatable_spans(&doc, &block)
            .into_iter()
            .map(|span| span.text)
            .collect();
        assert_eq!(spans, vec!["c", "ef"]);
        assert_eq!(doc.entities().count(), 3);
    }

    #[test]
    fn test_empty_document_round_trip() {
        let raw = convert_to_raw(&Document::without_blocks());
        assert_eq!(raw.to_json().unwrap(), r#"{"blocks":[],"entityMap":{}}"#);
        assert!(convert_from_raw(raw).unwrap().is_structurally_empty());
    }
}
