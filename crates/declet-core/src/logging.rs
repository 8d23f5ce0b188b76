#![forbid(unsafe_code)]

//! Logging setup.
//!
//! Library code only emits `tracing` events and spans. Binaries and test
//! harnesses that want output call [`init`] (behind the `tracing-json`
//! feature) to install a `tracing-subscriber` fmt subscriber filtered by
//! `DECLET_LOG`.

/// Environment variable holding an `EnvFilter` directive string.
pub const LOG_FILTER_ENV: &str = "DECLET_LOG";

/// Filter used when `DECLET_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info";

/// Output format for [`init`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

#[cfg(feature = "tracing-json")]
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("a global tracing subscriber is already installed: {0}")]
    AlreadyInstalled(String),
}

/// Install the global subscriber.
///
/// # Errors
///
/// Fails if another global subscriber was installed first.
#[cfg(feature = "tracing-json")]
pub fn init(format: LogFormat) -> Result<(), LoggingError> {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    let installed = match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|err| LoggingError::AlreadyInstalled(err.to_string()))
}
