use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use siphon_sink::{Attachment, SinkWriter};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::task::JoinHandle;

use crate::data::{FetchConfig, FetchMode, FetcherState, RequestOptions};
use crate::effects::driver::{BodyPlan, MetadataPlan, Plan, TransportDriver};
use crate::effects::result::{self, ResponseFuture};
use crate::effects::signals::FetchSignals;
use crate::effects::transport::Transport;
use crate::error::{FetchError, Result};

/// Handles returned by [`ContentFetcher::start`].
///
/// Both futures always resolve, even when the fetch fails: a status of `0`
/// or an empty content type means the value never became known.
#[derive(Debug)]
pub struct HttpContent {
    /// Final HTTP status code.
    pub status:       ResponseFuture<u16>,
    /// Final content type.
    pub content_type: ResponseFuture<String>,
    /// Readable side of the body sink in [`FetchMode::FullBody`], when the
    /// sink has one. Call [`Attachment::create_reader`] to consume it.
    pub stream:       Option<Attachment>,
}

/// One-shot fetch of a single URL, performed on a background task.
///
/// [`start`](ContentFetcher::start) returns immediately; the status code,
/// content type and body arrive asynchronously. A fetcher can be started only
/// once.
///
/// Dropping a fetcher whose task is still running signals shutdown and, when
/// the task runs on a multi-thread runtime, blocks until the task has
/// finished. On a current-thread runtime blocking would deadlock, so the drop
/// returns right away and the task stops by itself within one
/// [`activity_wait`](FetchConfig::activity_wait). Prefer
/// [`shutdown`](ContentFetcher::shutdown) from async code: it always waits.
///
/// # Caller-supplied sinks
///
/// A sink passed to `start` is never closed by the fetcher. For a body that
/// never ends (a live stream) the download continues until the caller closes
/// the sink or the fetcher is shut down.
///
/// # Examples
///
/// ```no_run
/// use siphon_fetch::{ContentFetcher, FetchMode, ReqwestTransport};
/// use tokio::io::AsyncReadExt;
///
/// # async fn run() -> siphon_fetch::Result<()> {
/// let fetcher = ContentFetcher::new("https://example.com/a.txt", ReqwestTransport::new());
/// let content = fetcher.start(FetchMode::FullBody, None)?;
///
/// let mut reader = content.stream.and_then(|s| s.create_reader()).unwrap();
/// let mut body = Vec::new();
/// reader.read_to_end(&mut body).await.ok();
///
/// println!("{} {} ({} bytes)", content.status.await, content.content_type.await, body.len());
/// # Ok(())
/// # }
/// ```
pub struct ContentFetcher<T: Transport> {
    url:       String,
    config:    FetchConfig,
    transport: Mutex<Option<T>>,
    used:      AtomicBool,
    started:   AtomicBool,
    signals:   Arc<FetchSignals>,
    task:      Mutex<Option<(Handle, JoinHandle<()>)>>,
}

impl<T: Transport> fmt::Debug for ContentFetcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentFetcher")
            .field("url", &self.url)
            .field("config", &self.config)
            .field("state", &self.state())
            .finish()
    }
}

impl<T: Transport> ContentFetcher<T> {
    pub fn new(url: impl Into<String>, transport: T) -> Self {
        Self {
            url:       url.into(),
            config:    FetchConfig::default(),
            transport: Mutex::new(Some(transport)),
            used:      AtomicBool::new(false),
            started:   AtomicBool::new(false),
            signals:   Arc::new(FetchSignals::new()),
            task:      Mutex::new(None),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: FetchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Current lifecycle state.
    ///
    /// A `start` call that returned an error never ran, so the state stays
    /// [`FetcherState::NotStarted`]; the fetcher still cannot be started again.
    pub fn state(&self) -> FetcherState {
        if !self.started.load(Ordering::Acquire) {
            FetcherState::NotStarted
        } else if self.signals.is_shut_down() {
            FetcherState::ShutDown
        } else if self.signals.is_done() {
            FetcherState::Done
        } else {
            FetcherState::Running
        }
    }

    /// Start fetching on a background task.
    ///
    /// In [`FetchMode::FullBody`] the body goes into `sink`, or into a new
    /// [`Attachment`] named after the URL when `sink` is `None`; in that case
    /// the fetcher closes the attachment when the fetch ends. `sink` is
    /// ignored in [`FetchMode::MetadataOnly`].
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`FetchError::AlreadyUsed`] on every call after the first
    /// - [`FetchError::ConfigurationFailed`] if the transport rejects the
    ///   request settings or no runtime is available
    /// - [`FetchError::SinkUnavailable`] if no writer could be created
    ///
    /// No background work is started when an error is returned.
    pub fn start(&self, mode: FetchMode, sink: Option<Arc<dyn SinkWriter>>) -> Result<HttpContent> {
        if self.used.swap(true, Ordering::AcqRel) {
            tracing::error!(url = %self.url, reason = "already used", "start failed");
            return Err(FetchError::AlreadyUsed);
        }

        let started = self.spawn(mode, sink);
        if let Err(e) = &started {
            tracing::error!(url = %self.url, error = %e, "start failed");
        }
        started
    }

    fn spawn(&self, mode: FetchMode, sink: Option<Arc<dyn SinkWriter>>) -> Result<HttpContent> {
        let runtime = Handle::try_current()
            .map_err(|e| FetchError::ConfigurationFailed(format!("no async runtime: {e}")))?;

        let mut transport = self
            .transport
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(FetchError::AlreadyUsed)?;
        transport
            .configure(&RequestOptions::new(&self.url, &self.config))
            .map_err(|e| FetchError::ConfigurationFailed(e.to_string()))?;

        let (plan, stream) = match mode {
            FetchMode::MetadataOnly => {
                if sink.is_some() {
                    tracing::debug!(url = %self.url, "sink ignored for metadata-only fetch");
                }
                (Plan::Metadata(MetadataPlan), None)
            }
            FetchMode::FullBody => {
                let (sink, owns_sink) = match sink {
                    Some(sink) => (sink, false),
                    None => (self.local_sink()?, true),
                };
                let stream = sink.attachment();
                let plan = BodyPlan { sink, owns_sink, write_timeout: self.config.write_timeout };
                (Plan::Body(plan), stream)
            }
        };

        let (results, status, content_type) = result::channel();
        let driver = TransportDriver::new(
            self.url.clone(),
            transport,
            Arc::clone(&self.signals),
            self.config.activity_wait,
        );
        self.started.store(true, Ordering::Release);
        let task = runtime.spawn(driver.run(plan, results));
        *self.task.lock().unwrap_or_else(PoisonError::into_inner) = Some((runtime, task));

        tracing::debug!(url = %self.url, %mode, "fetch started");
        Ok(HttpContent { status, content_type, stream })
    }

    fn local_sink(&self) -> Result<Arc<dyn SinkWriter>> {
        let attachment = Attachment::with_capacity(self.url.clone(), self.config.sink_capacity);
        let writer = attachment
            .create_writer()
            .ok_or_else(|| FetchError::SinkUnavailable(format!("attachment {} has a writer", self.url)))?;
        Ok(Arc::new(writer))
    }

    fn take_task(&mut self) -> Option<(Handle, JoinHandle<()>)> {
        self.task.get_mut().unwrap_or_else(PoisonError::into_inner).take()
    }

    /// Stop the background task, if any, and wait for it to finish.
    ///
    /// Returns the final state: [`FetcherState::Done`] if the fetch had already
    /// completed on its own, [`FetcherState::ShutDown`] if it was interrupted.
    pub async fn shutdown(mut self) -> FetcherState {
        if let Some((_, task)) = self.take_task() {
            if !self.signals.is_done() {
                self.signals.shut_down();
            }
            if let Err(e) = task.await {
                tracing::error!(url = %self.url, error = %e, "fetch task failed");
            }
        }
        self.state()
    }
}

impl<T: Transport> Drop for ContentFetcher<T> {
    fn drop(&mut self) {
        let Some((runtime, task)) = self.take_task() else {
            return;
        };
        // A fetch that already marked itself done is finishing on its own.
        if !self.signals.is_done() {
            tracing::debug!(url = %self.url, "shutting down running fetch");
            self.signals.shut_down();
        }
        if task.is_finished() {
            return;
        }

        // Only worker threads of a multi-thread runtime make progress while we block.
        if runtime.runtime_flavor() != RuntimeFlavor::MultiThread {
            tracing::warn!(url = %self.url, "fetch task left to finish after drop");
            return;
        }
        match Handle::try_current() {
            Err(_) => {
                let _ = runtime.block_on(task);
            }
            Ok(current) if current.runtime_flavor() == RuntimeFlavor::MultiThread => {
                let _ = tokio::task::block_in_place(|| runtime.block_on(task));
            }
            Ok(_) => {
                tracing::warn!(url = %self.url, "fetch task left to finish after drop");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::effects::scripted::{ScriptedTransport, Step};

    #[tokio::test]
    async fn test_drop_after_completion_does_not_signal_shutdown() {
        let transport = ScriptedTransport::new().response(200, "text/plain").step(Step::Stall);
        let script = transport.probe();
        let config = FetchConfig::default().activity_wait(Duration::from_millis(10));
        let fetcher = ContentFetcher::new("http://example.com/", transport).with_config(config);
        let _content = fetcher.start(FetchMode::FullBody, None).unwrap();
        while script.performs() < 6 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        // Done but not yet finished: the driver is between marking done and exiting.
        let signals = Arc::clone(&fetcher.signals);
        signals.mark_done();
        drop(fetcher);

        assert!(!signals.is_shut_down());
        signals.shut_down();
    }

    #[tokio::test]
    async fn test_drop_of_running_fetch_signals_shutdown() {
        let transport = ScriptedTransport::new().step(Step::Stall);
        let fetcher = ContentFetcher::new("http://example.com/", transport);
        let _content = fetcher.start(FetchMode::MetadataOnly, None).unwrap();

        let signals = Arc::clone(&fetcher.signals);
        drop(fetcher);

        assert!(signals.is_shut_down());
        assert!(signals.is_done());
    }

    #[tokio::test]
    async fn test_failed_start_stays_not_started() {
        let transport = ScriptedTransport::new().reject_options("no");
        let fetcher = ContentFetcher::new("http://example.com/", transport);

        assert!(fetcher.start(FetchMode::MetadataOnly, None).is_err());
        assert_eq!(fetcher.state(), FetcherState::NotStarted);
        assert!(!fetcher.signals.is_done());
    }
}
