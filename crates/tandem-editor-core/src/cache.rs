//! Per-block translation cache and staleness checks.
//!
//! Entries are written only by an explicit translate action and are never
//! evicted or invalidated by edits. Staleness is a display hint computed by
//! comparing a block's current text with the text that was translated.

use std::collections::HashMap;

use smol_str::SmolStr;

use crate::block::BlockDescriptor;
use crate::types::BlockKey;

/// A cached translation for one block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedTranslation {
    /// Block text at the moment the translation was requested.
    pub source_text: SmolStr,
    /// Translation of `source_text`.
    pub translated_text: SmolStr,
}

/// Translation state of a block relative to its cache entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Staleness {
    /// No translation was ever recorded for this block.
    NeverTranslated,
    /// The cached translation matches the current text.
    Current,
    /// The block was translated but its text has changed since.
    Stale,
}

impl Staleness {
    /// True when the block needs (re-)translation.
    pub fn needs_translation(self) -> bool {
        !matches!(self, Self::Current)
    }
}

/// In-memory lookup table from block identity to its last translation.
#[derive(Clone, Debug, Default)]
pub struct TranslationCache {
    entries: HashMap<BlockKey, CachedTranslation>,
}

impl TranslationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &BlockKey) -> Option<&CachedTranslation> {
        self.entries.get(key)
    }

    /// Unconditionally overwrite the entry for `key`.
    pub fn put(
        &mut self,
        key: BlockKey,
        source_text: impl Into<SmolStr>,
        translated_text: impl Into<SmolStr>,
    ) {
        self.entries.insert(
            key,
            CachedTranslation {
                source_text: source_text.into(),
                translated_text: translated_text.into(),
            },
        );
    }

    /// Classify a block against its recorded translation snapshot. The
    /// descriptor already carries that snapshot; see
    /// [`BlockDescriptor::staleness`].
    pub fn staleness(&self, block: &BlockDescriptor) -> Staleness {
        block.staleness()
    }

    /// True iff the block has no translation snapshot or it differs from the
    /// current text.
    pub fn is_stale(&self, block: &BlockDescriptor) -> bool {
        block.staleness().needs_translation()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(key: &BlockKey, text: &str, cache: &TranslationCache) -> BlockDescriptor {
        BlockDescriptor {
            key: key.clone(),
            text: text.into(),
            height: None,
            last_translated_text: cache.get(key).map(|e| e.source_text.clone()),
        }
    }

    #[test]
    fn test_never_translated() {
        let cache = TranslationCache::new();
        let key = BlockKey::mint();
        let block = descriptor(&key, "hello", &cache);

        assert_eq!(cache.staleness(&block), Staleness::NeverTranslated);
        assert!(cache.is_stale(&block));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_translated_then_edited() {
        let mut cache = TranslationCache::new();
        let key = BlockKey::mint();
        cache.put(key.clone(), "foo", "xyz");

        let fresh = descriptor(&key, "foo", &cache);
        assert_eq!(cache.staleness(&fresh), Staleness::Current);
        assert!(!cache.is_stale(&fresh));

        let edited = descriptor(&key, "foobar", &cache);
        assert_eq!(cache.staleness(&edited), Staleness::Stale);
        assert!(cache.is_stale(&edited));
        assert_eq!(cache.get(&key).unwrap().translated_text, "xyz");
    }

    #[test]
    fn test_put_overwrites() {
        let mut cache = TranslationCache::new();
        let key = BlockKey::mint();
        cache.put(key.clone(), "a", "1");
        cache.put(key.clone(), "b", "2");

        let entry = cache.get(&key).unwrap();
        assert_eq!(entry.source_text, "b");
        assert_eq!(entry.translated_text, "2");
        assert_eq!(cache.len(), 1);
    }
}
