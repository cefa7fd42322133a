//! DeepL-backed phrase translator.
//!
//! Successful translations are memoized per phrase, so hovering the same span
//! twice costs one request.

use mini_moka_wasm::sync::Cache;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use tandem_editor_core::{TranslateError, Translator};
use tracing::{debug, warn};

use crate::config::DeeplConfig;
use crate::error::ServiceError;

#[derive(Debug, Serialize)]
struct TranslateForm<'a> {
    text: &'a str,
    source_lang: &'a str,
    target_lang: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct TranslationResponse {
    pub translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
pub struct Translation {
    #[serde(default)]
    pub detected_source_language: Option<SmolStr>,
    pub text: SmolStr,
}

impl TranslationResponse {
    /// First translation in the response.
    pub fn into_text(self) -> Result<SmolStr, TranslateError> {
        self.translations
            .into_iter()
            .next()
            .map(|t| t.text)
            .ok_or(TranslateError::EmptyResponse)
    }
}

/// Translator calling the DeepL `/v2/translate` endpoint.
///
/// Cloning is cheap and clones share the HTTP connection pool and memo cache.
#[derive(Clone)]
pub struct DeeplTranslator {
    client: reqwest::Client,
    config: DeeplConfig,
    memo: Cache<SmolStr, SmolStr>,
}

impl std::fmt::Debug for DeeplTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeeplTranslator")
            .field("api_url", &self.config.api_url.as_str())
            .field("source_lang", &self.config.source_lang)
            .field("target_lang", &self.config.target_lang)
            .field("memoized", &self.memo.entry_count())
            .finish()
    }
}

impl DeeplTranslator {
    pub fn new(config: DeeplConfig) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("tandem/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| ServiceError::HttpClient { source })?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: reqwest::Client, config: DeeplConfig) -> Self {
        let memo = Cache::builder().max_capacity(config.cache_capacity).build();
        Self {
            client,
            config,
            memo,
        }
    }

    pub fn config(&self) -> &DeeplConfig {
        &self.config
    }

    /// Look up a memoized translation without touching the network.
    pub fn cached(&self, phrase: &str) -> Option<SmolStr> {
        self.memo.get(&SmolStr::new(phrase))
    }

    /// Seed the memo cache.
    pub fn remember(&self, phrase: impl Into<SmolStr>, translated: impl Into<SmolStr>) {
        self.memo.insert(phrase.into(), translated.into());
    }

    fn build_request(&self, phrase: &str) -> reqwest::Result<reqwest::Request> {
        self.client
            .post(self.config.api_url.clone())
            .header(
                AUTHORIZATION,
                format!("DeepL-Auth-Key {}", self.config.auth_key),
            )
            .form(&TranslateForm {
                text: phrase,
                source_lang: &self.config.source_lang,
                target_lang: &self.config.target_lang,
            })
            .build()
    }

    async fn request(&self, phrase: &str) -> Result<SmolStr, TranslateError> {
        let request = self
            .build_request(phrase)
            .map_err(|e| TranslateError::Request(SmolStr::new(e.to_string())))?;
        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| TranslateError::Request(SmolStr::new(e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(target: "tandem::deepl", %status, %body, "translation rejected");
            return Err(TranslateError::Service(smol_str::format_smolstr!(
                "{status}: {}",
                body.trim()
            )));
        }

        response
            .json::<TranslationResponse>()
            .await
            .map_err(|e| TranslateError::Request(SmolStr::new(e.to_string())))?
            .into_text()
    }
}

impl Translator for DeeplTranslator {
    async fn translate(&self, phrase: &str) -> Result<SmolStr, TranslateError> {
        if let Some(hit) = self.cached(phrase) {
            debug!(target: "tandem::deepl", phrase, translated = %hit, "cache hit");
            return Ok(hit);
        }

        let translated = self.request(phrase).await?;
        debug!(target: "tandem::deepl", phrase, translated = %translated, "translated");
        self.memo.insert(SmolStr::new(phrase), translated.clone());
        Ok(translated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_url: &str) -> DeeplConfig {
        DeeplConfig {
            auth_key: "test-key".into(),
            api_url: api_url.parse().unwrap(),
            source_lang: "EN".into(),
            target_lang: "JA".into(),
            cache_capacity: 16,
        }
    }

    #[test]
    fn test_request_shape() {
        let translator = DeeplTranslator::with_client(
            reqwest::Client::new(),
            config(DeeplConfig::DEFAULT_API_URL),
        );
        let request = translator.build_request("hello world").unwrap();

        assert_eq!(request.method(), reqwest::Method::POST);
        assert_eq!(request.url().as_str(), DeeplConfig::DEFAULT_API_URL);
        assert_eq!(
            request.headers()[AUTHORIZATION].to_str().unwrap(),
            "DeepL-Auth-Key test-key"
        );
        assert_eq!(
            request.headers()[reqwest::header::CONTENT_TYPE]
                .to_str()
                .unwrap(),
            "application/x-www-form-urlencoded"
        );
        let body = request.body().and_then(|b| b.as_bytes()).unwrap();
        assert_eq!(body, b"text=hello+world&source_lang=EN&target_lang=JA");
    }

    #[test]
    fn test_parse_response() {
        let body = r#"{"translations":[{"detected_source_language":"EN","text":"こんにちは世界"}]}"#;
        let parsed: TranslationResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.translations[0].detected_source_language.as_deref(), Some("EN"));
        assert_eq!(parsed.into_text().unwrap(), "こんにちは世界");

        let empty: TranslationResponse = serde_json::from_str(r#"{"translations":[]}"#).unwrap();
        assert_eq!(empty.into_text().unwrap_err(), TranslateError::EmptyResponse);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_network() {
        // Nothing listens on the discard port; a network call would fail.
        let translator =
            DeeplTranslator::with_client(reqwest::Client::new(), config("http://127.0.0.1:9/"));
        translator.remember("hello world", "こんにちは世界");

        let translated = translator.translate("hello world").await.unwrap();
        assert_eq!(translated, "こんにちは世界");
    }

    #[tokio::test]
    async fn test_transport_failure_is_request_error() {
        let translator =
            DeeplTranslator::with_client(reqwest::Client::new(), config("http://127.0.0.1:9/"));
        let err = translator.translate("uncached").await.unwrap_err();
        assert!(matches!(err, TranslateError::Request(_)));
        assert_eq!(translator.cached("uncached"), None);
    }
}
