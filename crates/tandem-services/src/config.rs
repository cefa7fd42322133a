//! Service configuration read from the environment.
//!
//! `.env` files are honored by the binary, which calls `dotenvy` before
//! anything here runs.

use std::path::PathBuf;

use reqwest::Url;
use smol_str::SmolStr;

use crate::error::ConfigError;

/// DeepL translation configuration
#[derive(Debug, Clone)]
pub struct DeeplConfig {
    pub auth_key: String,
    pub api_url: Url,
    pub source_lang: SmolStr,
    pub target_lang: SmolStr,
    /// Maximum number of memoized phrase translations.
    pub cache_capacity: u64,
}

impl DeeplConfig {
    pub const DEFAULT_API_URL: &'static str = "https://api-free.deepl.com/v2/translate";
    pub const DEFAULT_SOURCE_LANG: &'static str = "EN";
    pub const DEFAULT_TARGET_LANG: &'static str = "JA";
    pub const DEFAULT_CACHE_CAPACITY: u64 = 10_000;

    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `DEEPL_AUTH_KEY`: API authentication key
    ///
    /// Optional env vars:
    /// - `DEEPL_API_URL`: translate endpoint (default: DeepL free API)
    /// - `TANDEM_SOURCE_LANG`: source language code (default: EN)
    /// - `TANDEM_TARGET_LANG`: target language code (default: JA)
    /// - `TANDEM_PHRASE_CACHE_CAPACITY`: memo cache size (default: 10000)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let auth_key = lookup("DEEPL_AUTH_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingEnv {
                var: "DEEPL_AUTH_KEY",
            })?;

        let url_str = lookup("DEEPL_API_URL").unwrap_or_else(|| Self::DEFAULT_API_URL.to_string());
        let api_url = Url::parse(&url_str).map_err(|e| ConfigError::UrlParse {
            url: url_str.clone(),
            message: e.to_string(),
        })?;

        let source_lang = language_code(
            "TANDEM_SOURCE_LANG",
            lookup("TANDEM_SOURCE_LANG"),
            Self::DEFAULT_SOURCE_LANG,
        )?;
        let target_lang = language_code(
            "TANDEM_TARGET_LANG",
            lookup("TANDEM_TARGET_LANG"),
            Self::DEFAULT_TARGET_LANG,
        )?;

        let cache_capacity = match lookup("TANDEM_PHRASE_CACHE_CAPACITY") {
            None => Self::DEFAULT_CACHE_CAPACITY,
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ConfigError::Invalid {
                    field: "TANDEM_PHRASE_CACHE_CAPACITY",
                    message: format!("expected a positive integer, got {raw:?}"),
                })?,
        };

        Ok(Self {
            auth_key,
            api_url,
            source_lang,
            target_lang,
            cache_capacity,
        })
    }
}

/// Document storage configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub document_dir: PathBuf,
}

impl StoreConfig {
    /// Optional env vars:
    /// - `TANDEM_DOCUMENT_DIR`: directory holding saved documents (default: current directory)
    pub fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            document_dir: lookup("TANDEM_DOCUMENT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
        }
    }
}

/// Uppercased language code such as `EN` or `EN-GB`.
fn language_code(
    field: &'static str,
    value: Option<String>,
    default: &'static str,
) -> Result<SmolStr, ConfigError> {
    let Some(raw) = value else {
        return Ok(SmolStr::new_static(default));
    };
    let code = raw.trim().to_ascii_uppercase();
    let valid = !code.is_empty()
        && code.split('-').all(|part| {
            !part.is_empty() && part.chars().all(|c| c.is_ascii_alphabetic())
        });
    if valid {
        Ok(SmolStr::new(code))
    } else {
        Err(ConfigError::Invalid {
            field,
            message: format!("not a language code: {raw:?}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = DeeplConfig::from_lookup(lookup(&[("DEEPL_AUTH_KEY", "secret")])).unwrap();
        assert_eq!(config.auth_key, "secret");
        assert_eq!(config.api_url.as_str(), DeeplConfig::DEFAULT_API_URL);
        assert_eq!(config.source_lang, "EN");
        assert_eq!(config.target_lang, "JA");
        assert_eq!(config.cache_capacity, 10_000);
    }

    #[test]
    fn test_missing_key() {
        let err = DeeplConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingEnv {
                var: "DEEPL_AUTH_KEY"
            }
        ));

        let err = DeeplConfig::from_lookup(lookup(&[("DEEPL_AUTH_KEY", "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv { .. }));
    }

    #[test]
    fn test_overrides() {
        let config = DeeplConfig::from_lookup(lookup(&[
            ("DEEPL_AUTH_KEY", "secret"),
            ("DEEPL_API_URL", "http://localhost:8080/v2/translate"),
            ("TANDEM_SOURCE_LANG", "de"),
            ("TANDEM_TARGET_LANG", "en-gb"),
            ("TANDEM_PHRASE_CACHE_CAPACITY", "32"),
        ]))
        .unwrap();
        assert_eq!(config.api_url.port(), Some(8080));
        assert_eq!(config.source_lang, "DE");
        assert_eq!(config.target_lang, "EN-GB");
        assert_eq!(config.cache_capacity, 32);
    }

    #[test]
    fn test_invalid_values() {
        let err = DeeplConfig::from_lookup(lookup(&[
            ("DEEPL_AUTH_KEY", "secret"),
            ("TANDEM_PHRASE_CACHE_CAPACITY", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "TANDEM_PHRASE_CACHE_CAPACITY",
                ..
            }
        ));

        let err = DeeplConfig::from_lookup(lookup(&[
            ("DEEPL_AUTH_KEY", "secret"),
            ("TANDEM_TARGET_LANG", "ja jp"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "TANDEM_TARGET_LANG",
                ..
            }
        ));

        let err = DeeplConfig::from_lookup(lookup(&[
            ("DEEPL_AUTH_KEY", "secret"),
            ("DEEPL_API_URL", "not a url"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::UrlParse { .. }));
    }

    #[test]
    fn test_store_config() {
        assert_eq!(
            StoreConfig::from_lookup(lookup(&[])).document_dir,
            PathBuf::from(".")
        );
        assert_eq!(
            StoreConfig::from_lookup(lookup(&[("TANDEM_DOCUMENT_DIR", "/tmp/docs")])).document_dir,
            PathBuf::from("/tmp/docs")
        );
    }
}
