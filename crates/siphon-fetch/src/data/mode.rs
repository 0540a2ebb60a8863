use std::fmt;

/// What a fetch retrieves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchMode {
    /// Only the final status code and content type.
    ///
    /// The body is received and discarded, and the transfer stops as soon as a
    /// non-redirect status is known.
    MetadataOnly,

    /// Status code, content type and the whole body streamed into a sink.
    FullBody,
}

impl fmt::Display for FetchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchMode::MetadataOnly => write!(f, "metadata-only"),
            FetchMode::FullBody => write!(f, "full-body"),
        }
    }
}

/// Lifecycle of a [`ContentFetcher`](crate::ContentFetcher).
///
/// `NotStarted -> Running -> (Done | ShutDown)`. Both terminal states are
/// final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetcherState {
    #[default]
    NotStarted,
    Running,
    Done,
    ShutDown,
}

impl fmt::Display for FetcherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetcherState::NotStarted => write!(f, "NotStarted"),
            FetcherState::Running => write!(f, "Running"),
            FetcherState::Done => write!(f, "Done"),
            FetcherState::ShutDown => write!(f, "ShutDown"),
        }
    }
}
