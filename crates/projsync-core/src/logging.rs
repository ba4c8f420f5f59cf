//! Tracing subscriber setup for binaries embedding the sync engine

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install a compact stdout subscriber filtered by `RUST_LOG`
///
/// Falls back to `info` when `RUST_LOG` is unset. Returns an error if a
/// global subscriber is already installed.
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_with_default("info")
}

/// Like [`init`], with a custom filter used when `RUST_LOG` is unset
pub fn init_with_default(directives: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_level(true)
        .compact();

    let filter_layer =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(directives))?;

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
