//! Logging initialization.
//!
//! Installs a `tracing` subscriber with an environment filter and either
//! human-readable or JSON output.

use crate::PulseResult;

/// Default filter directive when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "info,pulse=debug";

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, multi-field output.
    Pretty,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    /// Parses a format name, falling back to `Pretty` for anything unknown.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Builds the filter directive for a configured level.
///
/// `RUST_LOG` always wins over the configured level.
#[must_use]
pub fn filter_directive(log_level: &str) -> String {
    if log_level.is_empty() {
        DEFAULT_FILTER.to_string()
    } else {
        format!("{},pulse=debug", log_level.to_lowercase())
    }
}

/// Initialize logging.
///
/// Returns an error if a global subscriber is already installed.
#[cfg(feature = "telemetry")]
pub fn init_logging(log_level: &str, format: LogFormat) -> PulseResult<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(log_level)));

    let result = match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init(),
    };

    result.map_err(|e| crate::PulseError::Internal(format!("Failed to initialize logging: {}", e)))?;

    tracing::debug!(level = %log_level, ?format, "Logging initialized");
    Ok(())
}

/// Placeholder for when the telemetry feature is disabled.
#[cfg(not(feature = "telemetry"))]
pub fn init_logging(_log_level: &str, _format: LogFormat) -> PulseResult<()> {
    Ok(())
}
