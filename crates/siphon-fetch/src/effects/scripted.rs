//! Deterministic in-memory transport.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bytes::Bytes;

use crate::data::RequestOptions;
use crate::effects::transport::{Perform, TransferHandler, Transport};
use crate::error::TransportError;

/// One scripted engine event. Each `perform` consumes one step.
#[derive(Debug, Clone)]
pub enum Step {
    /// The engine now reports this status code.
    Status(u16),
    /// The engine now reports this `Content-Type` value.
    ContentType(String),
    /// Deliver a raw header line.
    Header(String),
    /// Deliver a body chunk.
    Body(Bytes),
    /// Deliver this body chunk on every step, forever (a live stream).
    Repeat(Bytes),
    /// Ask the driver to perform again right away.
    Again,
    /// Fail the perform call with an engine error.
    Fail(String),
    /// Never make progress again; waits take their full timeout.
    Stall,
}

/// Observations recorded by a [`ScriptedTransport`], shared with the test.
#[derive(Debug, Default)]
pub struct ScriptProbe {
    options:             Mutex<Option<RequestOptions>>,
    attached:            AtomicBool,
    detached:            AtomicBool,
    aborted:             AtomicBool,
    performs:            AtomicUsize,
    body_bytes_accepted: AtomicUsize,
}

impl ScriptProbe {
    /// Settings passed to `configure`, if it was called.
    pub fn options(&self) -> Option<RequestOptions> {
        self.options.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }

    pub fn detached(&self) -> bool {
        self.detached.load(Ordering::SeqCst)
    }

    /// The handler accepted less than offered and the transfer was cut off.
    pub fn aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    pub fn performs(&self) -> usize {
        self.performs.load(Ordering::SeqCst)
    }

    /// Body bytes the handler reported as consumed.
    pub fn body_bytes_accepted(&self) -> usize {
        self.body_bytes_accepted.load(Ordering::SeqCst)
    }
}

/// A [`Transport`] replaying a fixed list of [`Step`]s.
///
/// # Examples
///
/// ```
/// use siphon_fetch::ScriptedTransport;
///
/// let transport = ScriptedTransport::new()
///     .response(301, "text/html")
///     .response(200, "text/plain; charset=utf-8")
///     .body("he")
///     .body("llo");
/// ```
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    steps:          VecDeque<Step>,
    reject_options: Option<String>,
    fail_attach:    bool,
    configured:     bool,
    attached:       bool,
    aborted:        bool,
    status:         Option<u16>,
    content_type:   Option<String>,
    probe:          Arc<ScriptProbe>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push_back(step);
        self
    }

    /// Script a complete response head: status line, `Content-Type` line and
    /// the blank line, after which the engine reports both values.
    #[must_use]
    pub fn response(self, status: u16, content_type: &str) -> Self {
        self.step(Step::Header(format!("HTTP/1.1 {status} \r\n")))
            .step(Step::Header(format!("Content-Type: {content_type}\r\n")))
            .step(Step::Header("\r\n".to_string()))
            .step(Step::ContentType(content_type.to_string()))
            .step(Step::Status(status))
    }

    #[must_use]
    pub fn body(self, chunk: impl Into<Bytes>) -> Self {
        self.step(Step::Body(chunk.into()))
    }

    /// Make `configure` fail with `reason`.
    #[must_use]
    pub fn reject_options(mut self, reason: impl Into<String>) -> Self {
        self.reject_options = Some(reason.into());
        self
    }

    /// Make `attach` fail.
    #[must_use]
    pub fn fail_attach(mut self) -> Self {
        self.fail_attach = true;
        self
    }

    pub fn probe(&self) -> Arc<ScriptProbe> {
        Arc::clone(&self.probe)
    }

    fn transfers_left(&self) -> usize {
        if self.aborted || self.steps.is_empty() { 0 } else { 1 }
    }

    fn abort(&mut self) {
        self.aborted = true;
        self.steps.clear();
        self.probe.aborted.store(true, Ordering::SeqCst);
    }
}

impl Transport for ScriptedTransport {
    type Error = TransportError;

    fn configure(&mut self, options: &RequestOptions) -> Result<(), TransportError> {
        url::Url::parse(&options.url)?;
        if let Some(reason) = &self.reject_options {
            return Err(TransportError::Engine(reason.clone()));
        }
        *self.probe.options.lock().unwrap_or_else(PoisonError::into_inner) = Some(options.clone());
        self.configured = true;
        Ok(())
    }

    fn attach(&mut self) -> Result<(), TransportError> {
        if !self.configured {
            return Err(TransportError::NotConfigured);
        }
        if self.fail_attach {
            return Err(TransportError::Engine("multiplexer unavailable".to_string()));
        }
        if self.attached {
            return Err(TransportError::AlreadyAttached);
        }
        self.attached = true;
        self.probe.attached.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn perform<H: TransferHandler>(&mut self, handler: &mut H) -> Result<Perform, TransportError> {
        self.probe.performs.fetch_add(1, Ordering::SeqCst);
        if !self.attached {
            return Err(TransportError::NotAttached);
        }

        let Some(step) = self.steps.front().cloned() else {
            return Ok(Perform::Running(0));
        };
        if !matches!(step, Step::Repeat(_) | Step::Stall) {
            self.steps.pop_front();
        }

        match step {
            Step::Status(code) => self.status = Some(code),
            Step::ContentType(value) => self.content_type = Some(value),
            Step::Header(line) => {
                if handler.on_header(line.as_bytes()) != line.len() {
                    self.abort();
                }
            }
            Step::Body(chunk) | Step::Repeat(chunk) => {
                let accepted = handler.on_body(&chunk).await;
                self.probe.body_bytes_accepted.fetch_add(accepted, Ordering::SeqCst);
                if accepted != chunk.len() {
                    self.abort();
                }
            }
            Step::Again => return Ok(Perform::Again),
            Step::Fail(reason) => return Err(TransportError::Engine(reason)),
            Step::Stall => {}
        }
        Ok(Perform::Running(self.transfers_left()))
    }

    async fn wait(&mut self, timeout: Duration) -> Result<usize, TransportError> {
        if !self.attached {
            return Err(TransportError::NotAttached);
        }
        if matches!(self.steps.front(), Some(Step::Stall)) {
            tokio::time::sleep(timeout).await;
            return Ok(0);
        }
        Ok(self.transfers_left())
    }

    fn response_code(&self) -> Option<u16> {
        self.status
    }

    fn content_type(&self) -> Option<String> {
        self.content_type.clone()
    }

    fn detach(&mut self) {
        self.attached = false;
        self.probe.detached.store(true, Ordering::SeqCst);
    }
}
