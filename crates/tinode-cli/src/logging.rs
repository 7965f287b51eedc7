//! Tracing setup.
//!
//! Logs go to stderr, or to a file when one is given so they cannot corrupt
//! the interactive prompt. `RUST_LOG` overrides the configured level.

use std::{fs::OpenOptions, io, path::Path};

use thiserror::Error;
use tracing_subscriber::{EnvFilter, filter::ParseError, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Logging setup errors.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// Level string is not a valid filter directive.
    #[error("invalid log level: {0}")]
    Filter(#[from] ParseError),

    /// Log file could not be opened.
    #[error("cannot open log file: {0}")]
    File(#[from] io::Error),

    /// A global subscriber is already installed.
    #[error("logging already initialized: {0}")]
    Init(String),
}

/// Build the filter: `RUST_LOG` when set, else `level`.
pub fn filter(level: &str) -> Result<EnvFilter, LoggingError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::try_new(level)?),
    }
}

/// Install the global subscriber.
pub fn init_logging(level: &str, log_file: Option<&Path>) -> Result<(), LoggingError> {
    let filter = filter(level)?;

    match log_file {
        None => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(io::stderr).with_target(true))
            .try_init(),
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(file).with_ansi(false).with_target(true))
                .try_init()
        },
    }
    .map_err(|e| LoggingError::Init(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_garbage_level() {
        // Only meaningful when RUST_LOG does not take over.
        if std::env::var_os("RUST_LOG").is_none() {
            assert!(matches!(filter("warn=[=bogus"), Err(LoggingError::Filter(_))));
            assert!(filter("debug").is_ok());
        }
    }
}
