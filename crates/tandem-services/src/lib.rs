//! tandem-services: translator and document store backends.
//!
//! - `DeeplTranslator` - DeepL HTTP client with a phrase memo cache
//! - `DummyTranslator` - offline placeholder translator
//! - `FileDocumentStore` - documents as files under a directory
//! - `config` - environment-driven configuration
//! - `telemetry` - tracing subscriber setup

pub mod config;
pub mod deepl;
pub mod dummy;
pub mod error;
pub mod filestore;
pub mod telemetry;

pub use config::{DeeplConfig, StoreConfig};
pub use deepl::DeeplTranslator;
pub use dummy::DummyTranslator;
pub use error::{ConfigError, Result, ServiceError};
pub use filestore::FileDocumentStore;
