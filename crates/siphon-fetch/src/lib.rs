//! Non-blocking HTTP content fetching with streamed, backpressure-aware bodies.
//!
//! A [`ContentFetcher`] fetches one URL on a background task. It either probes
//! the final status code and content type of a redirect chain
//! ([`FetchMode::MetadataOnly`]) or streams the whole body into a
//! [`SinkWriter`] ([`FetchMode::FullBody`]). Results come back as
//! [`ResponseFuture`]s that always resolve, even when the fetch fails.
//!
//! # Architecture
//!
//! This crate follows the three-layer pattern:
//! - `data`: immutable configuration and state types
//! - `core`: pure header parsing and status classification
//! - `effects`: the [`Transport`] seam, the background driver and the fetcher
//!
//! # Key Features
//!
//! - **Bounded writes**: body delivery never blocks longer than one write timeout,
//!   so shutdown is always noticed
//! - **Live streams**: bodies that never end stop when the sink closes or the
//!   fetcher shuts down
//! - **Pluggable engine**: [`ReqwestTransport`] for real traffic,
//!   [`ScriptedTransport`] for deterministic tests
//!
//! # Example
//!
//! ```
//! use siphon_fetch::{ContentFetcher, FetchMode, ScriptedTransport};
//! use tokio::io::AsyncReadExt;
//!
//! # #[tokio::main]
//! # async fn main() -> siphon_fetch::Result<()> {
//! let transport = ScriptedTransport::new().response(200, "text/plain").body("hello");
//! let fetcher = ContentFetcher::new("http://example.com/hello.txt", transport);
//!
//! let content = fetcher.start(FetchMode::FullBody, None)?;
//! let mut reader = content.stream.and_then(|s| s.create_reader()).unwrap();
//! let mut body = String::new();
//! reader.read_to_string(&mut body).await.unwrap();
//!
//! assert_eq!(content.status.await, 200);
//! assert_eq!(content.content_type.await, "text/plain");
//! assert_eq!(body, "hello");
//! # Ok(())
//! # }
//! ```

mod core;
mod data;
mod effects;
mod error;

pub use self::core::{HeaderState, is_redirect, parse_content_type, parse_status_line};
pub use data::options::{
    DEFAULT_ACTIVITY_WAIT, DEFAULT_CONNECT_TIMEOUT, DEFAULT_MAX_REDIRECTS, DEFAULT_USER_AGENT,
    DEFAULT_WRITE_TIMEOUT,
};
pub use data::{FetchConfig, FetchMode, FetcherState, RequestOptions};
pub use effects::{
    ContentFetcher, HttpContent, Perform, ResponseFuture, ScriptProbe, ScriptedTransport, Step,
    TransferHandler, Transport,
};
pub use error::{FetchError, Result, TransportError};
pub use siphon_sink::{Attachment, AttachmentReader, SinkWriter, WriteOutcome, WriteStatus};

#[cfg(feature = "reqwest")]
pub use effects::ReqwestTransport;
