//! Unified error types for fbfeed.
//!
//! `Error` is `Clone` so that a single failed fetch can be handed to every
//! caller waiting on the same in-flight cache key.

use tokio_rusqlite::rusqlite;

use crate::config::ConfigError;

/// Unified error types for the extraction pipeline.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Missing or malformed session credentials. Fatal, never retried.
    #[error("CONFIG_ERROR: {0}")]
    Configuration(String),

    /// URL could not be parsed or normalized.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Browser could not be launched or connected to.
    #[error("BROWSER_LAUNCH_FAILED: {0}")]
    BrowserLaunch(String),

    /// Navigation did not reach DOMContentLoaded in time.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Navigation, cookie injection or content read failed.
    #[error("FETCH_FAILED: {0}")]
    FetchFailed(String),

    /// Cache database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(String),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),
}

impl Error {
    /// Whether this error must abort the whole request rather than a single item.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Configuration(err.to_string())
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::Close((_, e)) => Error::Database(e.to_string()),
            _ => Error::Database("connection closed".to_string()),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err.to_string())
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(err.to_string())
    }
}
