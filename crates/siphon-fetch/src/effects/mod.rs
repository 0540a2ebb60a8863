//! I/O side of fetching: the transport seam, the background driver and the
//! public fetcher.
//!
//! Everything that touches the network, a sink or a task lives here; the
//! decisions it makes come from [`crate::core`].

mod bridge;
mod driver;
mod fetcher;
mod http;
mod result;
mod scripted;
mod signals;
mod transport;

pub use fetcher::{ContentFetcher, HttpContent};
pub use result::ResponseFuture;
pub use scripted::{ScriptProbe, ScriptedTransport, Step};
pub use transport::{Perform, TransferHandler, Transport};
#[cfg(feature = "reqwest")]
pub use http::ReqwestTransport;
