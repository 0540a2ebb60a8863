use std::future::Future;
use std::time::Duration;

use crate::data::RequestOptions;

/// Outcome of one [`Transport::perform`] step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Perform {
    /// More work is ready; call `perform` again without waiting.
    Again,
    /// The step finished with this many transfers still outstanding.
    Running(usize),
}

/// Callback context for one transfer.
///
/// The transport calls these while it performs, in delivery order. Returning
/// fewer bytes than offered tells the transport to abort the transfer.
pub trait TransferHandler: Send {
    /// One raw response-head line, including its line terminator.
    fn on_header(&mut self, line: &[u8]) -> usize;

    /// One chunk of response body.
    fn on_body(&mut self, chunk: &[u8]) -> impl Future<Output = usize> + Send;
}

/// A non-blocking HTTP engine driven step by step.
///
/// The engine owns connection setup, TLS, redirects and socket timeouts. The
/// fetch driver only calls [`perform`](Transport::perform) and
/// [`wait`](Transport::wait) in a loop until no transfer is outstanding.
///
/// # Implementations
///
/// - [`ReqwestTransport`](crate::ReqwestTransport): production engine using `reqwest`
/// - [`ScriptedTransport`](crate::ScriptedTransport): deterministic engine for tests
pub trait Transport: Send + 'static {
    /// Error type for engine operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Apply request settings. Must be called before [`attach`](Transport::attach).
    ///
    /// # Errors
    ///
    /// Returns an error if a setting is rejected, e.g. a malformed URL.
    fn configure(&mut self, options: &RequestOptions) -> Result<(), Self::Error>;

    /// Register the configured transfer with the engine's multiplexer.
    fn attach(&mut self) -> Result<(), Self::Error>;

    /// Make as much progress as possible without waiting, delivering header
    /// lines and body chunks to `handler`.
    fn perform<H: TransferHandler>(
        &mut self,
        handler: &mut H,
    ) -> impl Future<Output = Result<Perform, Self::Error>> + Send;

    /// Wait at most `timeout` for transfer activity. Returns the number of
    /// transfers with pending activity.
    fn wait(&mut self, timeout: Duration) -> impl Future<Output = Result<usize, Self::Error>> + Send;

    /// Status code of the most recent response head, if one was received.
    fn response_code(&self) -> Option<u16>;

    /// `Content-Type` of the most recent response head, verbatim.
    fn content_type(&self) -> Option<String>;

    /// Remove the transfer from the multiplexer, aborting it if still running.
    ///
    /// Safe to call more than once and after errors.
    fn detach(&mut self);
}
