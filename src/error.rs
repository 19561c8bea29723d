//! Error types shared across the monitoring engine

use std::time::Duration;
use thiserror::Error;

/// Failure of a single outbound data request.
///
/// The retrying fetcher surfaces the error of the last attempt once its
/// attempt budget is exhausted.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("malformed payload: {0}")]
    Payload(String),

    #[error("element not found: {0}")]
    ElementNotFound(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return FetchError::Timeout(Duration::ZERO);
        }
        match err.status() {
            Some(status) => FetchError::Status(status.as_u16()),
            None => FetchError::Transport(err.to_string()),
        }
    }
}

/// Configuration problems, either at load time or while resolving a subject.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("missing environment variable {0}")]
    MissingEnv(&'static str),

    #[error("no notification channel configured")]
    NoChannels,

    #[error("no site rule for {site}")]
    UnknownSite { site: String },

    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// A channel rejected or failed to deliver a message.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("{channel}: transport error: {message}")]
    Transport { channel: String, message: String },

    #[error("{channel}: rejected with status {status}: {description}")]
    Rejected {
        channel: String,
        status: u16,
        description: String,
    },
}

/// The trading calendar could not be obtained.
#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("calendar unavailable for {year}: {reason}")]
    Unavailable { year: i32, reason: String },
}

/// Everything that can end one subject's pipeline in failure.
#[derive(Debug, Error)]
pub enum SubjectError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}
