// Logging module - Logging infrastructure
use crate::domain::error::{EnumError, EnumResult};
use std::io;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Map a configured level name to a filter directive
fn level_directive(log_level: &str, verbose: bool) -> &'static str {
    if verbose {
        return "debug";
    }
    match log_level.to_ascii_lowercase().as_str() {
        "error" => "error",
        "warn" => "warn",
        "debug" => "debug",
        "trace" => "trace",
        _ => "info",
    }
}

/// Build the filter: `RUST_LOG` wins, otherwise the configured level for this
/// crate with resolver internals kept at warnings
fn build_filter(log_level: &str, verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,enumlookup={},hickory_proto=error",
            level_directive(log_level, verbose)
        ))
    })
}

/// Initialize logging system
pub fn init_logging(log_level: &str, verbose: bool) -> EnumResult<()> {
    tracing_subscriber::registry()
        .with(build_filter(log_level, verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(verbose)
                .with_level(true)
                .with_file(false)
                .with_line_number(false),
        )
        .try_init()
        .map_err(|e| EnumError::Config {
            message: format!("Failed to initialize logging: {}", e),
        })?;

    tracing::debug!("enumlookup logging system initialized");
    Ok(())
}
