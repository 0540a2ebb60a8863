//! Bounded-write loop between arriving body chunks and a sink.

use std::sync::Arc;
use std::time::Duration;

use siphon_sink::{SinkWriter, WriteStatus};

use crate::effects::signals::FetchSignals;
use crate::error::FetchError;

/// Pushes body chunks into a [`SinkWriter`] while honoring its backpressure.
///
/// Each chunk is written front to back with bounded writes. A timed-out write
/// is retried, so a slow reader only slows the transfer down. The return value
/// of [`push`](StreamBridge::push) is the number of bytes consumed; anything
/// short of the chunk length tells the transport to stop the transfer.
pub(crate) struct StreamBridge {
    sink:          Arc<dyn SinkWriter>,
    signals:       Arc<FetchSignals>,
    write_timeout: Duration,
    delivered:     u64,
}

impl StreamBridge {
    pub(crate) fn new(
        sink: Arc<dyn SinkWriter>,
        signals: Arc<FetchSignals>,
        write_timeout: Duration,
    ) -> Self {
        Self { sink, signals, write_timeout, delivered: 0 }
    }

    /// Total bytes written into the sink so far.
    pub(crate) fn delivered(&self) -> u64 {
        self.delivered
    }

    /// Deliver one chunk, returning how many of its bytes the sink took.
    pub(crate) async fn push(&mut self, chunk: &[u8]) -> usize {
        // Live streams never end on their own; refusing data is how they stop.
        if self.signals.is_done() {
            return 0;
        }

        let mut written = 0;
        while written < chunk.len() && !self.signals.is_done() {
            let remaining = &chunk[written..];
            let outcome = self.sink.write(remaining, self.write_timeout).await;

            if outcome.written > remaining.len() {
                let violation = FetchError::ProtocolViolation(format!(
                    "sink reported {} bytes written for a {} byte write",
                    outcome.written,
                    remaining.len()
                ));
                tracing::error!(error = %violation, "aborting transfer");
                return 0;
            }
            written += outcome.written;
            self.delivered += outcome.written as u64;

            match outcome.status {
                WriteStatus::Closed
                | WriteStatus::BytesLessThanWordSize
                | WriteStatus::Internal => {
                    tracing::debug!(status = %outcome.status, written, "sink stopped accepting data");
                    return written;
                }
                // Timeouts are backpressure, not failure: try again.
                WriteStatus::Ok | WriteStatus::TimedOut => continue,
                status => {
                    let violation =
                        FetchError::ProtocolViolation(format!("unexpected write status: {status}"));
                    tracing::error!(error = %violation, "aborting transfer");
                    return 0;
                }
            }
        }
        written
    }
}
