use miette::Diagnostic;
use tandem_editor_core::{EditorError, PersistError, RawError, StoreError, TranslateError};
use thiserror::Error;

/// Top-level error type for tandem service operations
#[derive(Debug, Error, Diagnostic)]
#[non_exhaustive]
pub enum ServiceError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(code(tandem::translate), help("Check DEEPL_AUTH_KEY and your network connection, or pass --offline"))]
    Translate(#[from] TranslateError),

    #[error(transparent)]
    #[diagnostic(code(tandem::store))]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(code(tandem::persist))]
    Persist(#[from] PersistError),

    #[error(transparent)]
    #[diagnostic(code(tandem::raw))]
    Raw(#[from] RawError),

    #[error(transparent)]
    #[diagnostic(code(tandem::editor))]
    Editor(#[from] EditorError),

    #[error("failed to build HTTP client")]
    #[diagnostic(code(tandem::http_client))]
    HttpClient {
        #[source]
        source: reqwest::Error,
    },
}

/// Configuration errors
#[derive(Debug, Error, Diagnostic)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("missing required environment variable: {var}")]
    #[diagnostic(
        code(config::missing_env),
        help("Set the {var} environment variable or add it to your .env file")
    )]
    MissingEnv { var: &'static str },

    #[error("invalid configuration value for {field}: {message}")]
    #[diagnostic(code(config::invalid))]
    Invalid { field: &'static str, message: String },

    #[error("failed to parse URL: {url}")]
    #[diagnostic(code(config::url_parse))]
    UrlParse { url: String, message: String },
}

pub type Result<T> = std::result::Result<T, ServiceError>;
