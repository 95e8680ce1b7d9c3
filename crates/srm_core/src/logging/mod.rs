//! Logging infrastructure for the run queue.
//!
//! Library code only emits `tracing` events. The embedding application
//! calls `init_tracing` once at startup to install a subscriber that:
//! - Respects the RUST_LOG environment variable
//! - Falls back to the configured level
//! - Writes to stderr, and optionally to `<logs_folder>/srm_core.log`
//!
//! # Example
//!
//! ```no_run
//! use srm_core::config::LoggingSettings;
//! use srm_core::logging::init_tracing;
//!
//! let settings = LoggingSettings::default();
//! // Keep the guard alive for the whole session so file output is flushed
//! let _guard = init_tracing(&settings).unwrap();
//! tracing::info!("queue ready");
//! ```

mod types;

pub use types::LogLevel;

use std::fs;
use std::io;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingSettings;

/// File name used inside the configured logs folder.
pub const LOG_FILE_NAME: &str = "srm_core.log";

/// Initialize the global tracing subscriber.
///
/// Returns the file writer guard when file output is enabled; dropping it
/// flushes and stops the background writer. Fails if the logs folder cannot
/// be created or a global subscriber is already installed.
pub fn init_tracing(settings: &LoggingSettings) -> io::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.level.as_filter_str()));

    let (file_layer, guard) = if settings.logs_folder.is_empty() {
        (None, None)
    } else {
        fs::create_dir_all(&settings.logs_folder)?;
        let appender = tracing_appender::rolling::never(&settings.logs_folder, LOG_FILE_NAME);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(settings.show_target);
        (Some(layer), Some(guard))
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(settings.show_target)
                .with_thread_ids(false),
        )
        .with(file_layer)
        .with(filter)
        .try_init()
        .map_err(io::Error::other)?;

    Ok(guard)
}

/// Initialize tracing for tests (only logs warnings and above).
#[cfg(test)]
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_filter_strings() {
        assert_eq!(LogLevel::Debug.as_filter_str(), "debug");
        assert_eq!(LogLevel::Info.to_string(), "info");
        assert_eq!(LogLevel::Warn.to_tracing_level(), tracing::Level::WARN);
    }

    #[test]
    fn level_parses_case_insensitively() {
        assert_eq!("WARNING".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert_eq!(" trace ".parse::<LogLevel>(), Ok(LogLevel::Trace));
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn level_serializes_lowercase() {
        let json = serde_json::to_string(&LogLevel::Error).unwrap();
        assert_eq!(json, "\"error\"");
    }
}
