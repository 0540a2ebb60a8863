//! Write-once result cells for the resolved status code and content type.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

/// Create the producer and the two read-ends of a fetch's result cells.
pub(crate) fn channel() -> (ResultSender, ResponseFuture<u16>, ResponseFuture<String>) {
    let (status_tx, status_rx) = oneshot::channel();
    let (content_type_tx, content_type_rx) = oneshot::channel();
    (
        ResultSender { status: status_tx, content_type: content_type_tx },
        ResponseFuture { rx: status_rx },
        ResponseFuture { rx: content_type_rx },
    )
}

/// Producer side of both cells. Consumed by [`ResultSender::fulfill`], so the
/// cells can only ever be written once.
#[derive(Debug)]
pub(crate) struct ResultSender {
    status:       oneshot::Sender<u16>,
    content_type: oneshot::Sender<String>,
}

impl ResultSender {
    pub(crate) fn fulfill(self, status: u16, content_type: String) {
        // A dropped reader only means nobody is interested any more.
        let _ = self.status.send(status);
        let _ = self.content_type.send(content_type);
    }
}

/// Read-end of one result cell.
///
/// Awaiting it suspends until the background task fulfills the cell. There is
/// no timeout; wrap it in `tokio::time::timeout` if one is needed. If the
/// producer disappears without writing (the task panicked), it resolves to
/// `T::default()`: `0` for the status code, an empty content type.
#[derive(Debug)]
pub struct ResponseFuture<T> {
    rx: oneshot::Receiver<T>,
}

impl<T: Default> ResponseFuture<T> {
    /// Block the current thread until the value is available.
    ///
    /// # Panics
    ///
    /// Panics when called from within an asynchronous execution context.
    pub fn blocking_get(self) -> T {
        self.rx.blocking_recv().unwrap_or_default()
    }
}

impl<T: Default> Future for ResponseFuture<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        Pin::new(&mut self.get_mut().rx)
            .poll(cx)
            .map(|value| value.unwrap_or_default())
    }
}
