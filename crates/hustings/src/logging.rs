#![forbid(unsafe_code)]

//! Process-wide tracing setup.
//!
//! Library crates only emit events. Binaries embedding the pipeline call
//! [`try_init`] once at startup. The filter comes from the `HUSTINGS_LOG`
//! environment variable using `EnvFilter` directive syntax
//! (`hustings_charts=debug,info`), defaulting to `info`.

use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

/// Environment variable holding the filter directives.
pub const LOG_ENV: &str = "HUSTINGS_LOG";

/// Filter used when [`LOG_ENV`] is unset.
pub const DEFAULT_FILTER: &str = "info";

/// Output encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    #[cfg(feature = "logging-json")]
    Json,
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid HUSTINGS_LOG filter: {0}")]
    Filter(#[from] ParseError),

    #[error("a global tracing subscriber is already installed: {0}")]
    AlreadyInitialized(#[from] TryInitError),
}

/// Install the global subscriber with the filter from [`LOG_ENV`].
///
/// # Errors
///
/// [`LoggingError::Filter`] for unparsable directives,
/// [`LoggingError::AlreadyInitialized`] if a subscriber is already set.
pub fn try_init(format: LogFormat) -> Result<(), LoggingError> {
    let directives = std::env::var(LOG_ENV).unwrap_or_else(|_| DEFAULT_FILTER.to_string());
    try_init_with(&directives, format)
}

/// Install the global subscriber with explicit filter directives.
///
/// # Errors
///
/// As [`try_init`].
pub fn try_init_with(directives: &str, format: LogFormat) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_new(directives)?;
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).try_init()?,
        #[cfg(feature = "logging-json")]
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?,
    }
    tracing::debug!(message = "logging.init", directives, ?format);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_directive_is_rejected_before_install() {
        let err = try_init_with("hustings_charts=loudest", LogFormat::Text).unwrap_err();
        assert!(matches!(err, LoggingError::Filter(_)));
        assert!(err.to_string().starts_with("invalid HUSTINGS_LOG filter"));
    }

    #[test]
    fn second_install_is_an_error() {
        // The first call may or may not win the global slot.
        let _ = try_init_with("warn", LogFormat::Text);
        let second = try_init_with("warn", LogFormat::default());
        assert!(matches!(second, Err(LoggingError::AlreadyInitialized(_))));
    }
}
