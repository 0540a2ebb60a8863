use std::time::Duration;

use async_trait::async_trait;

use crate::{Attachment, WriteOutcome};

/// Write side of a bounded sink.
///
/// Implementations must never block past `timeout`: a write that cannot make
/// progress in time reports [`WriteStatus::TimedOut`](crate::WriteStatus::TimedOut)
/// with zero bytes written so the producer can retry or give up.
#[async_trait]
pub trait SinkWriter: Send + Sync {
    /// Write a prefix of `data`, waiting at most `timeout` for room.
    ///
    /// `data.len()` is the budget for this call. The returned count is never
    /// larger than the budget and always refers to the front of `data`.
    async fn write(&self, data: &[u8], timeout: Duration) -> WriteOutcome;

    /// Signal end of stream to readers. Calling it again has no effect.
    fn close(&self);

    /// The attachment this writer feeds, if it has a readable side.
    fn attachment(&self) -> Option<Attachment> {
        None
    }
}
