//! Diagnostic logging for the engine.
//!
//! Sessions and the engine emit `tracing` events (pushes, pops, raised errors,
//! command failures). Nothing is printed unless a subscriber is installed,
//! for example with [`init`]. Log lines go to standard error so they never
//! mix with the session output.
//!
//! ```rust
//! use session_repl::logger::{self, LogLevel};
//!
//! logger::init_with_level(LogLevel::Debug);
//! tracing::debug!("ready");
//! ```

use tracing_subscriber::{Layer, Registry, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Install the logger at `WARN`, which only reports failing hooks, print
/// functions and input sources.
pub fn init() {
    init_with_level(LogLevel::Warn);
}

/// Install the logger with the given maximum level: `[LEVEL] message`, no
/// timestamps, no module paths, no colors.
///
/// Does nothing if a global subscriber is already set.
pub fn init_with_level(level: LogLevel) {
    let filter = tracing_subscriber::filter::LevelFilter::from_level(level.into());

    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .with_level(true)
        .with_ansi(false)
        .compact()
        .with_filter(filter);

    if Registry::default().with(layer).try_init().is_err() {
        tracing::debug!("a global subscriber is already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_maps_to_tracing_level() {
        assert_eq!(tracing::Level::from(LogLevel::Trace), tracing::Level::TRACE);
        assert_eq!(tracing::Level::from(LogLevel::Warn), tracing::Level::WARN);
        assert_eq!(tracing::Level::from(LogLevel::Error), tracing::Level::ERROR);
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_with_level(LogLevel::Debug);
        init();
        tracing::debug!("still running");
    }
}
