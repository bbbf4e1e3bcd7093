//! Console logging setup
//!
//! Structured logs via `tracing` with an `EnvFilter` driven by `RUST_LOG`.
//! Defaults to `info` for the service and `warn` for dependencies.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize console logging
///
/// Safe to call once at startup. Returns an error instead of panicking if a
/// global subscriber is already installed (tests install their own).
pub fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,voicefit_resolver=info,tower_http=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init()?;

    Ok(())
}
