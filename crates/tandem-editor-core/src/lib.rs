//! tandem-editor-core: synchronization core for a block-aligned translation overlay.
//!
//! This crate provides:
//! - `Document` - block-structured rich text with entity annotations
//! - `EditorState` - versioned history with undo/redo
//! - Translatable span toggling and hover lookup
//! - Block extraction, the per-block translation cache and overlay reconciliation
//! - Raw JSON conversion and the persistence bridge
//! - `EditorSession` - the controller tying these to async collaborators
//!
//! Network and storage backends live outside this crate behind the
//! `Translator` and `DocumentStore` traits.

pub mod annotation;
pub mod block;
pub mod cache;
pub mod document;
pub mod error;
pub mod history;
pub mod overlay;
pub mod persist;
pub mod raw;
pub mod request;
pub mod services;
pub mod session;
pub mod spans;
pub mod status;
pub mod types;

pub use annotation::{
    Annotation, AnnotationKind, Entity, EntityKey, Mutability, OverlapRule, TRANSLATABLE_KIND,
};
pub use block::{BlockDescriptor, HeightMap, extract_blocks};
pub use cache::{CachedTranslation, Staleness, TranslationCache};
pub use document::{BlockView, CharMeta, ContentBlock, Document, RichTextDocument};
pub use error::{EditorError, PersistError, RawError, StoreError, TranslateError};
pub use history::{ChangeType, EditorState};
pub use overlay::{BlockTranslationTicket, OverlayModel, OverlayReconciler, OverlayRow, RequestState};
pub use persist::{check_loadable, decode_document, encode_document, fetch_payload, store_payload};
pub use raw::{RawDocument, convert_from_raw, convert_to_raw};
pub use request::{Completion, RequestSequencer};
pub use services::{DocumentStore, Translator};
pub use session::{EditorSession, HoverTicket, LoadTicket, SaveTicket};
pub use smol_str::SmolStr;
pub use spans::{ToggleAction, Toggled, TranslatableSpan, span_at, toggle_translatable, translatable_spans};
pub use status::{OperationStatus, PhraseDetail};
pub use types::{BlockKey, DocPosition, Selection, SpanRange};
