//! Background loop advancing a transport until the fetch reaches a terminal
//! condition.

use std::sync::Arc;
use std::time::Duration;

use siphon_sink::SinkWriter;

use crate::core::{HeaderState, is_redirect};
use crate::effects::bridge::StreamBridge;
use crate::effects::result::ResultSender;
use crate::effects::signals::FetchSignals;
use crate::effects::transport::{Perform, TransferHandler, Transport};
use crate::error::{FetchError, Result};

/// What the driver does with a transfer, chosen once when the fetch starts.
pub(crate) enum Plan {
    Metadata(MetadataPlan),
    Body(BodyPlan),
}

/// Resolve status and content type, then stop the transfer.
pub(crate) struct MetadataPlan;

/// Stream the body into `sink`.
pub(crate) struct BodyPlan {
    pub(crate) sink:          Arc<dyn SinkWriter>,
    /// The sink was created by the fetcher, so the driver closes it.
    pub(crate) owns_sink:     bool,
    pub(crate) write_timeout: Duration,
}

/// Accepts header lines and drops body bytes on the floor.
///
/// Some servers only finish a redirect chain once the body is being read, so
/// the body is consumed rather than refused.
struct DiscardBody;

impl TransferHandler for DiscardBody {
    fn on_header(&mut self, line: &[u8]) -> usize {
        line.len()
    }

    async fn on_body(&mut self, chunk: &[u8]) -> usize {
        chunk.len()
    }
}

/// Parses response heads and forwards body chunks through the bridge.
struct BodyHandler {
    headers: HeaderState,
    bridge:  StreamBridge,
}

impl TransferHandler for BodyHandler {
    fn on_header(&mut self, line: &[u8]) -> usize {
        self.headers.observe(line);
        line.len()
    }

    async fn on_body(&mut self, chunk: &[u8]) -> usize {
        self.bridge.push(chunk).await
    }
}

pub(crate) struct TransportDriver<T: Transport> {
    url:           String,
    transport:     T,
    signals:       Arc<FetchSignals>,
    activity_wait: Duration,
}

impl<T: Transport> TransportDriver<T> {
    pub(crate) fn new(
        url: impl Into<String>,
        transport: T,
        signals: Arc<FetchSignals>,
        activity_wait: Duration,
    ) -> Self {
        Self { url: url.into(), transport, signals, activity_wait }
    }

    /// Drive the transfer to completion and fulfill `results` exactly once.
    pub(crate) async fn run(self, plan: Plan, results: ResultSender) {
        match plan {
            Plan::Metadata(_) => self.run_metadata(results).await,
            Plan::Body(plan) => self.run_body(plan, results).await,
        }
    }

    async fn run_metadata(mut self, results: ResultSender) {
        let mut handler = DiscardBody;
        let mut last_status = 0;
        let mut resolved = false;

        let outcome = match self.transport.attach() {
            Ok(()) => {
                self.pump(&mut handler, |transport| {
                    last_status = transport.response_code().unwrap_or(0);
                    resolved = last_status != 0 && !is_redirect(last_status);
                    resolved
                })
                .await
            }
            Err(e) => Err(FetchError::TransportFailed(format!("attach failed: {e}"))),
        };

        let content_type = if resolved {
            match self.transport.content_type() {
                Some(content_type) => content_type,
                None => {
                    tracing::warn!(url = %self.url, status = last_status, "no content type reported");
                    String::new()
                }
            }
        } else {
            String::new()
        };

        tracing::debug!(
            url = %self.url,
            status = last_status,
            content_type = %content_type,
            resolved,
            "metadata fetch finished"
        );
        results.fulfill(last_status, content_type);
        self.finish(outcome);
    }

    async fn run_body(mut self, plan: BodyPlan, results: ResultSender) {
        let mut handler = BodyHandler {
            headers: HeaderState::new(),
            bridge:  StreamBridge::new(
                Arc::clone(&plan.sink),
                Arc::clone(&self.signals),
                plan.write_timeout,
            ),
        };

        let outcome = match self.transport.attach() {
            Ok(()) => self.pump(&mut handler, |_| false).await,
            Err(e) => Err(FetchError::TransportFailed(format!("attach failed: {e}"))),
        };

        let status = handler.headers.status_code();
        let content_type = handler.headers.content_type().to_string();
        tracing::debug!(
            url = %self.url,
            status,
            content_type = %content_type,
            delivered = handler.bridge.delivered(),
            "body fetch finished"
        );
        results.fulfill(status, content_type);

        // A caller-supplied sink stays open: its owner decides when the stream ends.
        if plan.owns_sink {
            plan.sink.close();
        }
        self.finish(outcome);
    }

    /// Advance the transport until nothing is outstanding, shutdown is
    /// signalled, or `resolved` reports that the answer is known.
    async fn pump<H, F>(&mut self, handler: &mut H, mut resolved: F) -> Result<()>
    where
        H: TransferHandler,
        F: FnMut(&T) -> bool + Send,
    {
        let mut transfers_left = 1;
        while transfers_left > 0 && !self.signals.is_shut_down() {
            match self.transport.perform(&mut *handler).await {
                Ok(Perform::Again) => continue,
                Ok(Perform::Running(left)) => transfers_left = left,
                Err(e) => return Err(FetchError::TransportFailed(format!("perform failed: {e}"))),
            }

            if resolved(&self.transport) {
                return Ok(());
            }
            if transfers_left == 0 {
                break;
            }

            if let Err(e) = self.transport.wait(self.activity_wait).await {
                return Err(FetchError::TransportFailed(format!("wait failed: {e}")));
            }
        }

        if self.signals.is_shut_down() {
            tracing::debug!(url = %self.url, "fetch interrupted by shutdown");
        }
        Ok(())
    }

    fn finish(mut self, outcome: Result<()>) {
        if let Err(e) = outcome {
            tracing::error!(url = %self.url, error = %e, "fetch ended early");
        }
        self.signals.mark_done();
        self.transport.detach();
    }
}

#[cfg(test)]
mod tests {
    use siphon_sink::Attachment;
    use tokio::io::AsyncReadExt;

    use super::*;
    use crate::effects::result;
    use crate::effects::scripted::{ScriptedTransport, Step};

    const WAIT: Duration = Duration::from_millis(10);

    fn driver(transport: ScriptedTransport) -> (TransportDriver<ScriptedTransport>, Arc<FetchSignals>) {
        let signals = Arc::new(FetchSignals::new());
        let driver = TransportDriver::new("http://example.com/", transport, Arc::clone(&signals), WAIT);
        (driver, signals)
    }

    fn body_plan(capacity: usize) -> (BodyPlan, Attachment) {
        let attachment = Attachment::with_capacity("http://example.com/", capacity);
        let writer = attachment.create_writer().unwrap();
        let plan = BodyPlan { sink: Arc::new(writer), owns_sink: true, write_timeout: WAIT };
        (plan, attachment)
    }

    #[tokio::test]
    async fn test_metadata_skips_redirects() {
        let transport = ScriptedTransport::new()
            .response(301, "text/html")
            .response(200, "application/json")
            .body("{}");
        let probe = transport.probe();
        let (driver, signals) = driver(transport);
        let (sender, status, content_type) = result::channel();

        driver.run(Plan::Metadata(MetadataPlan), sender).await;

        assert_eq!(status.await, 200);
        assert_eq!(content_type.await, "application/json");
        assert_eq!(probe.body_bytes_accepted(), 0);
        assert!(probe.detached());
        assert!(signals.is_done());
    }

    #[tokio::test]
    async fn test_metadata_without_final_status_reports_last_code() {
        let transport = ScriptedTransport::new().response(302, "text/html");
        let (driver, _signals) = driver(transport);
        let (sender, status, content_type) = result::channel();

        driver.run(Plan::Metadata(MetadataPlan), sender).await;

        assert_eq!(status.await, 302);
        assert_eq!(content_type.await, "");
    }

    #[tokio::test]
    async fn test_engine_failure_still_fulfills() {
        let transport = ScriptedTransport::new()
            .step(Step::Header("HTTP/1.1 200 OK\r\n".into()))
            .step(Step::Fail("connection reset".into()));
        let (driver, signals) = driver(transport);
        let (plan, attachment) = body_plan(16);
        let mut reader = attachment.create_reader().unwrap();
        let (sender, status, content_type) = result::channel();

        driver.run(Plan::Body(plan), sender).await;

        assert_eq!(status.await, 200);
        assert_eq!(content_type.await, "");
        let mut body = Vec::new();
        reader.read_to_end(&mut body).await.unwrap();
        assert!(body.is_empty());
        assert!(signals.is_done());
    }

    #[tokio::test]
    async fn test_attach_failure_fulfills_defaults_and_closes_sink() {
        let transport = ScriptedTransport::new().response(200, "text/plain").fail_attach();
        let (driver, _signals) = driver(transport);
        let (plan, attachment) = body_plan(16);
        let (sender, status, content_type) = result::channel();

        driver.run(Plan::Body(plan), sender).await;

        assert_eq!(status.await, 0);
        assert_eq!(content_type.await, "");
        assert!(attachment.is_closed());
    }

    #[tokio::test]
    async fn test_retry_immediately_does_not_wait() {
        let transport = ScriptedTransport::new()
            .step(Step::Again)
            .step(Step::Again)
            .response(204, "text/plain");
        let probe = transport.probe();
        let (driver, _signals) = driver(transport);
        let (sender, status, _content_type) = result::channel();

        driver.run(Plan::Metadata(MetadataPlan), sender).await;

        assert_eq!(status.await, 204);
        assert!(probe.performs() >= 3);
    }

    #[tokio::test]
    async fn test_shutdown_before_start_fulfills_immediately() {
        let transport = ScriptedTransport::new().step(Step::Stall);
        let (driver, signals) = driver(transport);
        let (plan, attachment) = body_plan(16);
        let (sender, status, _content_type) = result::channel();
        signals.shut_down();

        driver.run(Plan::Body(plan), sender).await;

        assert_eq!(status.await, 0);
        assert!(attachment.is_closed());
    }

    #[tokio::test]
    async fn test_short_write_aborts_transfer() {
        let transport = ScriptedTransport::new()
            .response(200, "audio/mpeg")
            .body("first")
            .body("second");
        let probe = transport.probe();
        let (driver, _signals) = driver(transport);
        let (plan, attachment) = body_plan(16);
        // No reader, then the reader goes away: the sink reports closed.
        drop(attachment.create_reader());
        let (sender, status, content_type) = result::channel();

        driver.run(Plan::Body(plan), sender).await;

        assert_eq!(status.await, 200);
        assert_eq!(content_type.await, "audio/mpeg");
        assert!(probe.aborted());
        assert_eq!(probe.body_bytes_accepted(), 0);
    }
}
