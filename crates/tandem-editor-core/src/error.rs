//! Error types for the synchronization core.

use smol_str::SmolStr;
use thiserror::Error;

use crate::annotation::EntityKey;
use crate::types::BlockKey;

/// Errors raised by document and selection operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EditorError {
    /// No block with this key exists in the current document.
    #[error("unknown block {0}")]
    UnknownBlock(BlockKey),

    /// A char offset past the end of a block.
    #[error("offset {offset} out of bounds for block {block} (length {len})")]
    OffsetOutOfBounds {
        block: BlockKey,
        offset: usize,
        len: usize,
    },

    /// The operation needs a non-empty selection.
    #[error("selection is collapsed")]
    CollapsedSelection,

    /// Selection end lies before its start in document order.
    #[error("selection end precedes its start")]
    InvertedSelection,

    /// Entity key not present in the document's entity map.
    #[error("unknown entity {0}")]
    UnknownEntity(EntityKey),
}

/// Failures reported by a [`Translator`](crate::services::Translator).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TranslateError {
    /// The service answered but refused the request.
    #[error("translation service error: {0}")]
    Service(SmolStr),

    /// The service answered with an empty translation list.
    #[error("translation service returned no translations")]
    EmptyResponse,

    /// Transport-level failure (network, decoding).
    #[error("translation request failed: {0}")]
    Request(SmolStr),
}

/// Failures reported by a [`DocumentStore`](crate::services::DocumentStore).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StoreError {
    #[error("no document named {0}")]
    NotFound(SmolStr),

    #[error("i/o error on {name}: {message}")]
    Io { name: SmolStr, message: SmolStr },

    #[error("store error: {0}")]
    Other(SmolStr),
}

/// Errors converting between a [`Document`](crate::document::Document) and
/// its raw tree.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RawError {
    #[error("malformed raw document: {0}")]
    Json(#[from] serde_json::Error),

    /// An entity or style range reaches past the end of its block text.
    #[error("range {offset}+{length} exceeds block {block} of length {len}")]
    RangeOutOfBounds {
        block: usize,
        offset: usize,
        length: usize,
        len: usize,
    },

    /// An entity range references a key missing from the entity map.
    #[error("block {block} references missing entity {key}")]
    MissingEntity { block: usize, key: u32 },
}

/// Errors from the persistence bridge.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PersistError {
    /// Load refused because the current document has content.
    #[error("cannot load over existing content")]
    NotEmpty,

    #[error(transparent)]
    Raw(#[from] RawError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
