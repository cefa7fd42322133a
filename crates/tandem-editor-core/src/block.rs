//! Block extraction for the overlay panel.
//!
//! Block descriptors are derived from the document, the height measurements
//! of the previous render and the translation cache. They are rebuilt for
//! every document version and never patched in place.

use std::collections::HashMap;

use smol_str::SmolStr;
use tracing::trace;

use crate::cache::{Staleness, TranslationCache};
use crate::document::RichTextDocument;
use crate::types::BlockKey;

/// Derived, per-version view of one block.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockDescriptor {
    /// Stable block identity.
    pub key: BlockKey,

    /// Current plain text.
    pub text: SmolStr,

    /// Last measured pixel height; `None` if this block was never measured.
    pub height: Option<f32>,

    /// Source text of the cached translation, if the block was ever translated.
    pub last_translated_text: Option<SmolStr>,
}

impl BlockDescriptor {
    pub fn was_translated(&self) -> bool {
        self.last_translated_text.is_some()
    }

    /// Classify the current text against the recorded translation snapshot.
    pub fn staleness(&self) -> Staleness {
        match &self.last_translated_text {
            None => Staleness::NeverTranslated,
            Some(source) if *source == self.text => Staleness::Current,
            Some(_) => Staleness::Stale,
        }
    }
}

/// Pixel heights of rendered blocks, keyed by block identity.
///
/// The caller measures these from the rendered view of the *previous*
/// document version and passes them in explicitly; the overlay therefore
/// always lags the document by one render.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeightMap {
    heights: HashMap<BlockKey, f32>,
}

impl HeightMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a measurement. Later measurements for the same key win.
    pub fn record(&mut self, key: BlockKey, height: f32) {
        self.heights.insert(key, height);
    }

    /// Record a measurement reported under a rendering-layer offset key
    /// (`{block}-{decorator}-{leaf}`). Returns the block key it was filed under.
    pub fn record_offset_key(&mut self, offset_key: &str, height: f32) -> Option<BlockKey> {
        let block = offset_key.split('-').next().filter(|k| !k.is_empty())?;
        let key = BlockKey::from_rendered(block);
        self.heights.insert(key.clone(), height);
        Some(key)
    }

    pub fn get(&self, key: &BlockKey) -> Option<f32> {
        self.heights.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.heights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heights.is_empty()
    }

    /// Drop measurements for blocks no longer present.
    pub fn retain_blocks<D: RichTextDocument>(&mut self, doc: &D) {
        self.heights.retain(|key, _| doc.contains_block(key));
    }
}

impl FromIterator<(BlockKey, f32)> for HeightMap {
    fn from_iter<I: IntoIterator<Item = (BlockKey, f32)>>(iter: I) -> Self {
        Self {
            heights: iter.into_iter().collect(),
        }
    }
}

/// Derive block descriptors in document order.
///
/// Pure: identical inputs produce equal lists.
pub fn extract_blocks<D: RichTextDocument>(
    doc: &D,
    heights: &HeightMap,
    cache: &TranslationCache,
) -> Vec<BlockDescriptor> {
    let blocks: Vec<BlockDescriptor> = doc
        .blocks()
        .map(|view| BlockDescriptor {
            key: view.key.clone(),
            text: SmolStr::new(view.text),
            height: heights.get(view.key),
            last_translated_text: cache.get(view.key).map(|entry| entry.source_text.clone()),
        })
        .collect();

    trace!(
        target: "tandem::blocks",
        count = blocks.len(),
        measured = blocks.iter().filter(|b| b.height.is_some()).count(),
        "extracted blocks"
    );
    blocks
}
