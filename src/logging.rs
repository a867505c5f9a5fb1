//! Logging configuration using tracing
//!
//! Structured logging to stderr, filtered through the RUST_LOG environment variable.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn env_filter() -> EnvFilter {
    // Quiet by default for CLI use
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Initialize the tracing subscriber with human-readable output
///
/// # Example RUST_LOG values
/// - `RUST_LOG=info` - Show every reconciled event
/// - `RUST_LOG=ticketsync=debug` - Lookups and skipped transitions
/// - `RUST_LOG=ticketsync::integrations=debug,info` - Remote calls only
///
/// # Errors
/// Returns an error if the subscriber has already been initialized
pub fn init() -> crate::Result<()> {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_line_number(true),
        )
        .try_init()
        .map_err(|e| crate::SyncError::Config(format!("Failed to initialize tracing: {}", e)))?;

    Ok(())
}

/// Initialize the tracing subscriber with one JSON object per line
///
/// Used by `serve`, where logs are shipped rather than read.
pub fn init_json() -> crate::Result<()> {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(
            fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_current_span(false),
        )
        .try_init()
        .map_err(|e| crate::SyncError::Config(format!("Failed to initialize tracing: {}", e)))?;

    Ok(())
}

/// Initialize logging for tests (no-op if already initialized)
pub fn init_test() {
    let _ = init();
}
