// Logging module - Logging infrastructure
use crate::domain::error::{ProbeError, ProbeResult};
use std::io;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter directive for a configured level; `RUST_LOG` takes precedence.
pub fn filter_directive(level: &str, verbose: bool) -> String {
    let level = if verbose {
        "debug"
    } else {
        match level {
            "error" | "warn" | "info" | "debug" | "trace" => level,
            _ => "info",
        }
    };
    format!("rancher_probe={},warn", level)
}

/// Initialize logging system
pub fn init_logging(level: &str, verbose: bool) -> ProbeResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(level, verbose)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(verbose)
                .with_level(true)
                .with_thread_ids(false)
                .with_file(verbose)
                .with_line_number(verbose),
        )
        .try_init()
        .map_err(|e| ProbeError::config(format!("Failed to initialize logging: {}", e)))?;

    tracing::debug!("Logging initialized");
    Ok(())
}
