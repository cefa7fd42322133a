//! Offline translator.

use smol_str::SmolStr;
use tandem_editor_core::{TranslateError, Translator};
use tracing::debug;

/// Returns a fixed placeholder for every phrase without contacting any service.
#[derive(Debug, Clone)]
pub struct DummyTranslator {
    placeholder: SmolStr,
}

impl DummyTranslator {
    pub const PLACEHOLDER: &'static str = "ダミー翻訳";

    pub fn new() -> Self {
        Self::with_placeholder(Self::PLACEHOLDER)
    }

    pub fn with_placeholder(placeholder: impl Into<SmolStr>) -> Self {
        Self {
            placeholder: placeholder.into(),
        }
    }
}

impl Default for DummyTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl Translator for DummyTranslator {
    async fn translate(&self, phrase: &str) -> Result<SmolStr, TranslateError> {
        debug!(target: "tandem::dummy", phrase, "offline translation");
        Ok(self.placeholder.clone())
    }
}
