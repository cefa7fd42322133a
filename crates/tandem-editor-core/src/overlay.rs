//! Overlay reconciliation.
//!
//! The overlay is a derived view: for every document version the reconciler
//! re-extracts block descriptors and pairs each with what the translation
//! panel should show for it. Block translation is split into a request half
//! and a completion half so several requests can be in flight and finish in
//! any order.

use std::collections::HashMap;

use smol_str::SmolStr;
use tracing::{debug, warn};

use crate::block::{BlockDescriptor, HeightMap, extract_blocks};
use crate::cache::{Staleness, TranslationCache};
use crate::document::RichTextDocument;
use crate::error::{EditorError, TranslateError};
use crate::request::{Completion, RequestSequencer};
use crate::types::BlockKey;

/// State of the most recent translate request for a block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum RequestState {
    #[default]
    Idle,
    Pending { sequence: u64 },
    Failed { reason: SmolStr },
}

/// Display directive for one block.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayRow {
    pub block: BlockDescriptor,
    /// Cached translation, empty if the block was never translated.
    pub translated_text: SmolStr,
    pub staleness: Staleness,
    pub request: RequestState,
}

impl OverlayRow {
    /// Translated once, changed since. A never-translated block shows no marker.
    pub fn needs_retranslation_marker(&self) -> bool {
        self.staleness == Staleness::Stale
    }

    pub fn height(&self) -> Option<f32> {
        self.block.height
    }
}

/// The overlay render model for one document version.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OverlayModel {
    pub version: u64,
    pub rows: Vec<OverlayRow>,
}

impl OverlayModel {
    pub fn row(&self, key: &BlockKey) -> Option<&OverlayRow> {
        self.rows.iter().find(|row| &row.block.key == key)
    }
}

/// Issued by [`OverlayReconciler::begin_translation`]; hand it back with the
/// translator's result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockTranslationTicket {
    pub key: BlockKey,
    pub sequence: u64,
    /// Block text at request time. This is what gets recorded in the cache.
    pub source_text: SmolStr,
}

#[derive(Debug, Default)]
pub struct OverlayReconciler {
    cache: TranslationCache,
    sequencer: RequestSequencer<BlockKey>,
    requests: HashMap<BlockKey, RequestState>,
    model: OverlayModel,
}

impl OverlayReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache(cache: TranslationCache) -> Self {
        Self {
            cache,
            ..Self::default()
        }
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    pub fn model(&self) -> &OverlayModel {
        &self.model
    }

    pub fn request_state(&self, key: &BlockKey) -> RequestState {
        self.requests.get(key).cloned().unwrap_or_default()
    }

    /// Rebuild the overlay model for `version` of the document.
    ///
    /// Request bookkeeping for blocks missing from `doc` is dropped unless a
    /// request is still pending: undo can bring such a block back.
    pub fn recompute<D: RichTextDocument>(
        &mut self,
        doc: &D,
        heights: &HeightMap,
        version: u64,
    ) -> &OverlayModel {
        let requests = &mut self.requests;
        requests.retain(|key, state| {
            doc.contains_block(key) || matches!(state, RequestState::Pending { .. })
        });
        self.sequencer
            .retain(|key| requests.contains_key(key) || doc.contains_block(key));

        let rows = extract_blocks(doc, heights, &self.cache)
            .into_iter()
            .map(|block| {
                let staleness = block.staleness();
                let translated_text = self
                    .cache
                    .get(&block.key)
                    .map(|entry| entry.translated_text.clone())
                    .unwrap_or_default();
                let request = self.request_state(&block.key);
                OverlayRow {
                    block,
                    translated_text,
                    staleness,
                    request,
                }
            })
            .collect();

        self.model = OverlayModel { version, rows };
        &self.model
    }

    /// Start translating the current text of `key`.
    pub fn begin_translation<D: RichTextDocument>(
        &mut self,
        doc: &D,
        key: &BlockKey,
    ) -> Result<BlockTranslationTicket, EditorError> {
        let text = doc
            .block_text(key)
            .ok_or_else(|| EditorError::UnknownBlock(key.clone()))?;
        let sequence = self.sequencer.issue(key);
        self.requests
            .insert(key.clone(), RequestState::Pending { sequence });

        debug!(target: "tandem::overlay", block = %key, sequence, "block translation requested");
        Ok(BlockTranslationTicket {
            key: key.clone(),
            sequence,
            source_text: SmolStr::new(text),
        })
    }

    /// Apply a translator result. Only the latest request per block lands.
    ///
    /// A result for a block that has since been deleted is still cached;
    /// the entry is unreachable because keys are never reissued.
    pub fn finish_translation(
        &mut self,
        ticket: BlockTranslationTicket,
        result: Result<SmolStr, TranslateError>,
    ) -> Completion {
        if !self.sequencer.is_latest(&ticket.key, ticket.sequence) {
            debug!(
                target: "tandem::overlay",
                block = %ticket.key,
                sequence = ticket.sequence,
                "dropping superseded block translation"
            );
            return Completion::Superseded;
        }

        match result {
            Ok(translated) => {
                debug!(target: "tandem::overlay", block = %ticket.key, "block translation applied");
                self.requests.remove(&ticket.key);
                self.cache.put(ticket.key, ticket.source_text, translated);
                Completion::Applied
            }
            Err(err) => {
                warn!(target: "tandem::overlay", block = %ticket.key, error = %err, "block translation failed");
                self.requests.insert(
                    ticket.key,
                    RequestState::Failed {
                        reason: SmolStr::new(err.to_string()),
                    },
                );
                Completion::Failed
            }
        }
    }
}
