//! Tracing setup for tandem binaries.
//!
//! # Usage
//!
//! ```ignore
//! use tandem_services::telemetry;
//!
//! telemetry::init("tandem");
//! tracing::info!("started");
//! ```

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Console level used when `RUST_LOG` is unset: DEBUG in debug builds, INFO otherwise.
pub fn default_level() -> Level {
    if cfg!(debug_assertions) {
        Level::DEBUG
    } else {
        Level::INFO
    }
}

/// Install the console subscriber. Call once at startup; later calls are no-ops.
pub fn init(service_name: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level().as_str().to_lowercase()));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .with_filter(env_filter);

    match tracing_subscriber::registry().with(console_layer).try_init() {
        Ok(()) => tracing::debug!(service = %service_name, "telemetry initialized"),
        Err(e) => tracing::warn!(error = %e, "tracing subscriber already installed"),
    }
}
