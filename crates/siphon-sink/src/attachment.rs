//! In-process attachment: a bounded byte buffer shared by one writer and one reader.

use std::fmt;
use std::future::poll_fn;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll, Waker};
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::io::{AsyncRead, ReadBuf};

use crate::{SinkWriter, WriteOutcome, WriteStatus};

#[derive(Default)]
struct State {
    buffer:        BytesMut,
    writer_taken:  bool,
    reader_taken:  bool,
    writer_closed: bool,
    reader_closed: bool,
    read_waker:    Option<Waker>,
    write_waker:   Option<Waker>,
}

impl State {
    fn wake_reader(&mut self) {
        if let Some(waker) = self.read_waker.take() {
            waker.wake();
        }
    }

    fn wake_writer(&mut self) {
        if let Some(waker) = self.write_waker.take() {
            waker.wake();
        }
    }
}

struct Shared {
    capacity: usize,
    state:    Mutex<State>,
}

impl Shared {
    fn lock(&self) -> Option<MutexGuard<'_, State>> {
        self.state.lock().ok()
    }
}

/// A bounded in-memory stream identified by a string id.
///
/// Bytes written through the [`AttachmentWriter`] become readable through the
/// [`AttachmentReader`] in the same order. The writer waits (up to its timeout)
/// when `capacity` bytes are buffered and unread.
#[derive(Clone)]
pub struct Attachment {
    id:     Arc<str>,
    shared: Arc<Shared>,
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("id", &self.id)
            .field("capacity", &self.shared.capacity)
            .field("buffered", &self.buffered())
            .finish()
    }
}

impl Attachment {
    /// Buffer size used by [`Attachment::new`].
    pub const DEFAULT_CAPACITY: usize = 64 * 1024;

    pub fn new(id: impl Into<String>) -> Self {
        Self::with_capacity(id, Self::DEFAULT_CAPACITY)
    }

    /// Create an attachment holding at most `capacity` unread bytes.
    ///
    /// A capacity of zero is raised to one byte.
    pub fn with_capacity(id: impl Into<String>, capacity: usize) -> Self {
        let id: String = id.into();
        Self {
            id:     Arc::from(id),
            shared: Arc::new(Shared {
                capacity: capacity.max(1),
                state:    Mutex::new(State::default()),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Number of bytes written but not yet read.
    pub fn buffered(&self) -> usize {
        self.shared.lock().map_or(0, |state| state.buffer.len())
    }

    /// `true` once the writer has signalled end of stream.
    pub fn is_closed(&self) -> bool {
        self.shared.lock().is_none_or(|state| state.writer_closed)
    }

    /// Create the single writer for this attachment.
    ///
    /// Returns `None` if a writer was already created.
    pub fn create_writer(&self) -> Option<AttachmentWriter> {
        let mut state = self.shared.lock()?;
        if state.writer_taken {
            return None;
        }
        state.writer_taken = true;
        Some(AttachmentWriter { attachment: self.clone() })
    }

    /// Create the single reader for this attachment.
    ///
    /// Returns `None` if a reader was already created.
    pub fn create_reader(&self) -> Option<AttachmentReader> {
        let mut state = self.shared.lock()?;
        if state.reader_taken {
            return None;
        }
        state.reader_taken = true;
        Some(AttachmentReader { attachment: self.clone() })
    }
}

/// Blocking-policy writer for an [`Attachment`].
///
/// Writes report [`WriteStatus::Closed`] once nothing can read the bytes any
/// more: the reader was dropped, or no reader was created and every other
/// [`Attachment`] handle is gone. Dropping the writer closes it.
pub struct AttachmentWriter {
    attachment: Attachment,
}

impl fmt::Debug for AttachmentWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttachmentWriter").field("id", &self.attachment.id).finish()
    }
}

impl AttachmentWriter {
    /// No reader exists and none can be created: the writer holds the only
    /// handle to the attachment.
    fn is_orphaned(&self, state: &State) -> bool {
        !state.reader_taken && Arc::strong_count(&self.attachment.shared) == 1
    }

    fn poll_write_some(&self, cx: &mut Context<'_>, data: &[u8]) -> Poll<WriteOutcome> {
        let shared = &self.attachment.shared;
        let Some(mut state) = shared.lock() else {
            return Poll::Ready(WriteOutcome::new(0, WriteStatus::Internal));
        };

        if state.writer_closed || state.reader_closed || self.is_orphaned(&state) {
            return Poll::Ready(WriteOutcome::closed());
        }
        if data.is_empty() {
            return Poll::Ready(WriteOutcome::new(0, WriteStatus::Ok));
        }

        let room = shared.capacity.saturating_sub(state.buffer.len());
        if room == 0 {
            state.write_waker = Some(cx.waker().clone());
            return Poll::Pending;
        }

        let n = room.min(data.len());
        state.buffer.extend_from_slice(&data[..n]);
        state.wake_reader();
        Poll::Ready(WriteOutcome::new(n, WriteStatus::Ok))
    }
}

#[async_trait]
impl SinkWriter for AttachmentWriter {
    async fn write(&self, data: &[u8], timeout: Duration) -> WriteOutcome {
        let attempt = poll_fn(|cx| self.poll_write_some(cx, data));
        match tokio::time::timeout(timeout, attempt).await {
            Ok(outcome) => outcome,
            Err(_) => WriteOutcome::timed_out(),
        }
    }

    fn close(&self) {
        let Some(mut state) = self.attachment.shared.lock() else {
            return;
        };
        if state.writer_closed {
            return;
        }
        state.writer_closed = true;
        state.wake_reader();
        tracing::trace!(id = %self.attachment.id, "attachment writer closed");
    }

    fn attachment(&self) -> Option<Attachment> {
        Some(self.attachment.clone())
    }
}

impl Drop for AttachmentWriter {
    fn drop(&mut self) {
        self.close();
    }
}

/// Async reader for an [`Attachment`].
///
/// Reads return EOF once the writer is closed and every buffered byte has been
/// consumed. Dropping the reader makes further writes report
/// [`WriteStatus::Closed`].
pub struct AttachmentReader {
    attachment: Attachment,
}

impl fmt::Debug for AttachmentReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttachmentReader").field("id", &self.attachment.id).finish()
    }
}

impl AttachmentReader {
    pub fn attachment(&self) -> &Attachment {
        &self.attachment
    }
}

impl AsyncRead for AttachmentReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let Some(mut state) = self.attachment.shared.lock() else {
            return Poll::Ready(Err(io::Error::other("attachment state poisoned")));
        };

        if !state.buffer.is_empty() {
            let n = state.buffer.len().min(buf.remaining());
            let chunk = state.buffer.split_to(n);
            buf.put_slice(&chunk);
            state.wake_writer();
            return Poll::Ready(Ok(()));
        }
        if state.writer_closed {
            return Poll::Ready(Ok(()));
        }

        state.read_waker = Some(cx.waker().clone());
        Poll::Pending
    }
}

impl Drop for AttachmentReader {
    fn drop(&mut self) {
        if let Some(mut state) = self.attachment.shared.lock() {
            state.reader_closed = true;
            state.wake_writer();
        }
    }
}
