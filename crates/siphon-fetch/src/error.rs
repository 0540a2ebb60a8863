//! Error types for siphon-fetch.

use thiserror::Error;

/// Errors reported by [`ContentFetcher`](crate::ContentFetcher).
///
/// Only `AlreadyUsed`, `ConfigurationFailed` and `SinkUnavailable` are ever
/// returned to callers; failures after the background task started are logged
/// and show up as zero/empty results and a closed stream.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("fetcher has already been used")]
    AlreadyUsed,

    #[error("transport configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("transport failed: {0}")]
    TransportFailed(String),

    #[error("no writable sink available: {0}")]
    SinkUnavailable(String),

    #[error("sink protocol violation: {0}")]
    ProtocolViolation(String),
}

pub type Result<T> = std::result::Result<T, FetchError>;

/// Errors raised by a [`Transport`](crate::Transport) implementation.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[cfg(feature = "reqwest")]
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("transport used before it was configured")]
    NotConfigured,

    #[error("transfer is already attached")]
    AlreadyAttached,

    #[error("no transfer is attached")]
    NotAttached,

    #[error("engine error: {0}")]
    Engine(String),
}
