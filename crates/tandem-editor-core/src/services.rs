//! Collaborator traits for the asynchronous boundaries.
//!
//! These traits abstract over the external services the editor shell talks to:
//! - Translating a phrase
//! - Saving and loading serialized documents
//!
//! Implementations are provided by the consuming application (e.g. tandem-services).

use std::future::Future;

use smol_str::SmolStr;

use crate::error::{StoreError, TranslateError};

/// Translates a phrase into the target language.
pub trait Translator {
    /// Translate `phrase`. No latency bound is assumed.
    fn translate(
        &self,
        phrase: &str,
    ) -> impl Future<Output = Result<SmolStr, TranslateError>> + Send;
}

/// Stores serialized documents by caller-supplied name.
pub trait DocumentStore {
    /// Persist a serialized document payload.
    fn save_document(
        &self,
        name: &str,
        payload: String,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Fetch a serialized document payload.
    fn load_document(&self, name: &str) -> impl Future<Output = Result<String, StoreError>> + Send;
}
