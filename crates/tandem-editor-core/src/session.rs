//! Editor session: the controller tying document history, the overlay and
//! the asynchronous boundaries together.
//!
//! Every document change goes through [`EditorSession::apply_change`], which
//! pushes a history entry and recomputes the overlay synchronously. Each
//! asynchronous operation is split into a `begin_*` half that returns a
//! ticket and a `finish_*` half that takes the ticket back together with the
//! collaborator's result; only the newest ticket per channel lands.

use smol_str::SmolStr;
use tracing::{debug, info, warn};

use crate::block::HeightMap;
use crate::cache::TranslationCache;
use crate::document::Document;
use crate::error::{EditorError, PersistError, RawError, StoreError, TranslateError};
use crate::history::{ChangeType, EditorState};
use crate::overlay::{BlockTranslationTicket, OverlayModel, OverlayReconciler};
use crate::persist::{
    check_loadable, decode_document, encode_document, fetch_payload, store_payload,
};
use crate::request::{Completion, RequestSequencer};
use crate::services::{DocumentStore, Translator};
use crate::spans::{ToggleAction, span_at, toggle_translatable};
use crate::status::{OperationStatus, PhraseDetail};
use crate::types::{BlockKey, DocPosition, Selection};

/// Asynchronous channels with a single visible result slot each.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Channel {
    Phrase,
    Save,
    Load,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HoverTicket {
    sequence: u64,
    pub phrase: SmolStr,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SaveTicket {
    sequence: u64,
    pub name: SmolStr,
    pub payload: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadTicket {
    sequence: u64,
    pub name: SmolStr,
}

#[derive(Debug)]
pub struct EditorSession {
    state: EditorState,
    heights: HeightMap,
    overlay: OverlayReconciler,
    phrase_detail: PhraseDetail,
    save_status: OperationStatus<SmolStr>,
    load_status: OperationStatus<SmolStr>,
    channels: RequestSequencer<Channel>,
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new(Document::new())
    }
}

impl EditorSession {
    pub fn new(document: Document) -> Self {
        Self::with_cache(document, TranslationCache::new())
    }

    pub fn with_cache(document: Document, cache: TranslationCache) -> Self {
        let mut session = Self {
            state: EditorState::new(document),
            heights: HeightMap::new(),
            overlay: OverlayReconciler::with_cache(cache),
            phrase_detail: PhraseDetail::default(),
            save_status: OperationStatus::Idle,
            load_status: OperationStatus::Idle,
            channels: RequestSequencer::new(),
        };
        session.refresh();
        session
    }

    // === Accessors ===

    pub fn document(&self) -> &Document {
        self.state.current()
    }

    pub fn version(&self) -> u64 {
        self.state.version()
    }

    pub fn history(&self) -> &EditorState {
        &self.state
    }

    pub fn overlay(&self) -> &OverlayModel {
        self.overlay.model()
    }

    pub fn translation_cache(&self) -> &TranslationCache {
        self.overlay.cache()
    }

    pub fn phrase_detail(&self) -> &PhraseDetail {
        &self.phrase_detail
    }

    pub fn save_status(&self) -> &OperationStatus<SmolStr> {
        &self.save_status
    }

    pub fn load_status(&self) -> &OperationStatus<SmolStr> {
        &self.load_status
    }

    // === Document changes ===

    /// Make `document` current and rebuild the overlay for the new version.
    pub fn apply_change(&mut self, document: Document, change: ChangeType) -> &OverlayModel {
        self.state.push(document, change);
        self.refresh()
    }

    /// Run `edit` against a copy of the current document and apply the
    /// result as one change. Nothing changes if `edit` fails.
    pub fn edit<F>(&mut self, change: ChangeType, edit: F) -> Result<&OverlayModel, EditorError>
    where
        F: FnOnce(&mut Document) -> Result<(), EditorError>,
    {
        let mut next = self.state.current().clone();
        edit(&mut next)?;
        Ok(self.apply_change(next, change))
    }

    pub fn toggle_translatable(&mut self, selection: &Selection) -> Result<ToggleAction, EditorError> {
        let toggled = toggle_translatable(self.state.current(), selection)?;
        self.apply_change(toggled.document, ChangeType::ApplyEntity);
        Ok(toggled.action)
    }

    pub fn undo(&mut self) -> bool {
        let moved = self.state.undo();
        if moved {
            self.refresh();
        }
        moved
    }

    pub fn redo(&mut self) -> bool {
        let moved = self.state.redo();
        if moved {
            self.refresh();
        }
        moved
    }

    /// Store measurements taken from the rendered view. They feed the next
    /// recompute, so the overlay trails the document by one render.
    pub fn record_render(&mut self, heights: HeightMap) {
        self.heights = heights;
        self.heights.retain_blocks(self.state.current());
    }

    /// Rebuild the overlay for the current version.
    pub fn refresh(&mut self) -> &OverlayModel {
        self.overlay
            .recompute(self.state.current(), &self.heights, self.state.version())
    }

    // === Hover translation ===

    /// Start translating the span under `position`. Returns `None` when no
    /// translatable span is there.
    pub fn begin_hover(&mut self, position: &DocPosition) -> Option<HoverTicket> {
        let span = span_at(self.state.current(), position)?;
        Some(self.begin_phrase(span.text))
    }

    /// Start translating an arbitrary phrase into the phrase detail slot.
    pub fn begin_phrase(&mut self, phrase: impl Into<SmolStr>) -> HoverTicket {
        let phrase = phrase.into();
        let sequence = self.channels.issue(&Channel::Phrase);
        self.phrase_detail = PhraseDetail {
            phrase: phrase.clone(),
            status: OperationStatus::Pending,
        };
        debug!(target: "tandem::session", %phrase, sequence, "phrase translation requested");
        HoverTicket { sequence, phrase }
    }

    pub fn finish_hover(
        &mut self,
        ticket: HoverTicket,
        result: Result<SmolStr, TranslateError>,
    ) -> Completion {
        if !self.channels.is_latest(&Channel::Phrase, ticket.sequence) {
            debug!(target: "tandem::session", phrase = %ticket.phrase, "dropping superseded phrase translation");
            return Completion::Superseded;
        }
        let (status, completion) = match result {
            Ok(translated) => (OperationStatus::Succeeded(translated), Completion::Applied),
            Err(err) => {
                warn!(target: "tandem::session", phrase = %ticket.phrase, error = %err, "phrase translation failed");
                (OperationStatus::failed(err.to_string()), Completion::Failed)
            }
        };
        self.phrase_detail = PhraseDetail {
            phrase: ticket.phrase,
            status,
        };
        completion
    }

    // === Block translation ===

    pub fn begin_block_translation(
        &mut self,
        key: &BlockKey,
    ) -> Result<BlockTranslationTicket, EditorError> {
        let ticket = self.overlay.begin_translation(self.state.current(), key)?;
        self.refresh();
        Ok(ticket)
    }

    pub fn finish_block_translation(
        &mut self,
        ticket: BlockTranslationTicket,
        result: Result<SmolStr, TranslateError>,
    ) -> Completion {
        let completion = self.overlay.finish_translation(ticket, result);
        if completion.took_effect() {
            self.refresh();
        }
        completion
    }

    // === Persistence ===

    pub fn begin_save(&mut self, name: impl Into<SmolStr>) -> Result<SaveTicket, RawError> {
        let name = name.into();
        let payload = match encode_document(self.state.current()) {
            Ok(payload) => payload,
            Err(err) => {
                self.save_status = OperationStatus::failed(err.to_string());
                return Err(err);
            }
        };
        let sequence = self.channels.issue(&Channel::Save);
        self.save_status = OperationStatus::Pending;
        debug!(target: "tandem::session", %name, sequence, "save requested");
        Ok(SaveTicket {
            sequence,
            name,
            payload,
        })
    }

    pub fn finish_save(&mut self, ticket: SaveTicket, result: Result<(), StoreError>) -> Completion {
        if !self.channels.is_latest(&Channel::Save, ticket.sequence) {
            return Completion::Superseded;
        }
        match result {
            Ok(()) => {
                info!(target: "tandem::session", name = %ticket.name, "document saved");
                self.save_status = OperationStatus::Succeeded(ticket.name);
                Completion::Applied
            }
            Err(err) => {
                warn!(target: "tandem::session", name = %ticket.name, error = %err, "save failed");
                self.save_status = OperationStatus::failed(err.to_string());
                Completion::Failed
            }
        }
    }

    /// Start loading `name`. Refused unless the current document is
    /// structurally empty; a refusal only updates `load_status`.
    pub fn begin_load(&mut self, name: impl Into<SmolStr>) -> Result<LoadTicket, PersistError> {
        let name = name.into();
        if let Err(err) = check_loadable(self.state.current()) {
            warn!(target: "tandem::session", %name, "load refused over existing content");
            self.load_status = OperationStatus::failed(err.to_string());
            return Err(err);
        }
        let sequence = self.channels.issue(&Channel::Load);
        self.load_status = OperationStatus::Pending;
        debug!(target: "tandem::session", %name, sequence, "load requested");
        Ok(LoadTicket { sequence, name })
    }

    /// Apply a fetched payload. The emptiness check is repeated because the
    /// document may have been edited while the fetch was in flight.
    pub fn finish_load(&mut self, ticket: LoadTicket, result: Result<String, StoreError>) -> Completion {
        if !self.channels.is_latest(&Channel::Load, ticket.sequence) {
            return Completion::Superseded;
        }
        let loaded = result
            .map_err(PersistError::from)
            .and_then(|payload| decode_document(&payload).map_err(PersistError::from))
            .and_then(|doc| check_loadable(self.state.current()).map(|()| doc));

        match loaded {
            Ok(doc) => {
                info!(target: "tandem::session", name = %ticket.name, blocks = doc.len(), "document loaded");
                self.apply_change(doc, ChangeType::InsertFragment);
                self.load_status = OperationStatus::Succeeded(ticket.name);
                Completion::Applied
            }
            Err(err) => {
                warn!(target: "tandem::session", name = %ticket.name, error = %err, "load failed");
                self.load_status = OperationStatus::failed(err.to_string());
                Completion::Failed
            }
        }
    }

    // === Async drivers ===

    /// Translate the span under `position` end to end.
    pub async fn hover_translate<T: Translator>(
        &mut self,
        translator: &T,
        position: &DocPosition,
    ) -> Option<Completion> {
        let ticket = self.begin_hover(position)?;
        let result = translator.translate(&ticket.phrase).await;
        Some(self.finish_hover(ticket, result))
    }

    pub async fn translate_block<T: Translator>(
        &mut self,
        translator: &T,
        key: &BlockKey,
    ) -> Result<Completion, EditorError> {
        let ticket = self.begin_block_translation(key)?;
        let result = translator.translate(&ticket.source_text).await;
        Ok(self.finish_block_translation(ticket, result))
    }

    pub async fn save<S: DocumentStore>(
        &mut self,
        store: &S,
        name: impl Into<SmolStr>,
    ) -> Result<Completion, PersistError> {
        let ticket = self.begin_save(name)?;
        let result = store_payload(store, &ticket.name, ticket.payload.clone()).await;
        Ok(self.finish_save(ticket, result))
    }

    pub async fn load<S: DocumentStore>(
        &mut self,
        store: &S,
        name: impl Into<SmolStr>,
    ) -> Result<Completion, PersistError> {
        let ticket = self.begin_load(name)?;
        let result = fetch_payload(store, &ticket.name).await;
        Ok(self.finish_load(ticket, result))
    }
}
