//! Document persistence bridge.
//!
//! Encodes the current document into its raw JSON form for a
//! [`DocumentStore`], and decodes stored payloads back into documents.
//! Loading is only permitted over a structurally empty document.

use tracing::{debug, info};

use crate::document::Document;
use crate::error::{PersistError, RawError, StoreError};
use crate::raw::{RawDocument, convert_from_raw, convert_to_raw};
use crate::services::DocumentStore;

pub fn encode_document(doc: &Document) -> Result<String, RawError> {
    convert_to_raw(doc).to_json()
}

pub fn decode_document(payload: &str) -> Result<Document, RawError> {
    convert_from_raw(RawDocument::from_json(payload)?)
}

/// Fails with [`PersistError::NotEmpty`] unless `current` has no blocks or a
/// single empty block.
pub fn check_loadable(current: &Document) -> Result<(), PersistError> {
    if current.is_structurally_empty() {
        Ok(())
    } else {
        Err(PersistError::NotEmpty)
    }
}

/// Hand an already encoded payload to the store under `name`.
pub async fn store_payload<S: DocumentStore>(
    store: &S,
    name: &str,
    payload: String,
) -> Result<(), StoreError> {
    debug!(target: "tandem::persist", name, bytes = payload.len(), "writing document payload");
    store.save_document(name, payload).await
}

/// Fetch the raw payload stored under `name`.
pub async fn fetch_payload<S: DocumentStore>(store: &S, name: &str) -> Result<String, StoreError> {
    let payload = store.load_document(name).await?;
    debug!(target: "tandem::persist", name, bytes = payload.len(), "fetched document payload");
    Ok(payload)
}

/// Serialize `doc` and hand it to the store under `name`.
pub async fn save<S: DocumentStore>(store: &S, name: &str, doc: &Document) -> Result<(), PersistError> {
    let payload = encode_document(doc)?;
    store_payload(store, name, payload).await?;
    info!(target: "tandem::persist", name, blocks = doc.len(), "document saved");
    Ok(())
}

/// Fetch `name` from the store and decode it, provided `current` is empty.
///
/// The emptiness check runs before the store is contacted.
pub async fn load<S: DocumentStore>(
    store: &S,
    name: &str,
    current: &Document,
) -> Result<Document, PersistError> {
    check_loadable(current)?;
    let payload = fetch_payload(store, name).await?;
    let doc = decode_document(&payload)?;
    info!(target: "tandem::persist", name, blocks = doc.len(), "document loaded");
    Ok(doc)
}
