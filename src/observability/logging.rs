//! # Structured Logging
//!
//! Installs the global `tracing` subscriber. `RUST_LOG` takes precedence over the
//! configured level when it is set; the configured format picks JSON or human-readable
//! output.

use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::core::config::{LogFormat, LoggingConfig};
use crate::core::error::{ClubError, ClubResult};

/// Build the filter for a configured level
///
/// Accepts a bare level (`debug`) or a full directive string (`club_auth=debug,tower_http=info`).
pub fn build_filter(config: &LoggingConfig) -> ClubResult<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    EnvFilter::try_new(config.level.trim())
        .map_err(|e| ClubError::config(format!("Invalid log level '{}': {}", config.level, e)))
}

/// Initialize the global subscriber
///
/// A second call is a no-op apart from a warning.
pub fn init_logging(config: &LoggingConfig) -> ClubResult<()> {
    let filter = build_filter(config)?;

    let result = match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_target(true),
            )
            .try_init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .try_init(),
    };

    if result.is_err() {
        warn!("Tracing subscriber already initialized, skipping initialization");
        return Ok(());
    }

    info!(format = ?config.format, "📊 Logging initialized");
    Ok(())
}
