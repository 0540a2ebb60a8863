use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::CancellationToken;

/// Cross-task flags shared by the fetcher, its driver and the stream bridge.
///
/// `done` stops body delivery; `shutdown` additionally stops the driver loop.
/// Neither flag is ever cleared.
#[derive(Debug, Default)]
pub(crate) struct FetchSignals {
    done:     AtomicBool,
    shutdown: CancellationToken,
}

impl FetchSignals {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn mark_done(&self) {
        self.done.store(true, Ordering::Release);
    }

    pub(crate) fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    /// Stop body delivery and the driver loop.
    pub(crate) fn shut_down(&self) {
        self.mark_done();
        self.shutdown.cancel();
    }

    pub(crate) fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shut_down_implies_done() {
        let signals = FetchSignals::new();
        assert!(!signals.is_done());
        assert!(!signals.is_shut_down());

        signals.shut_down();
        assert!(signals.is_done());
        assert!(signals.is_shut_down());
    }

    #[test]
    fn test_done_alone_does_not_shut_down() {
        let signals = FetchSignals::new();
        signals.mark_done();
        signals.mark_done();
        assert!(signals.is_done());
        assert!(!signals.is_shut_down());
    }
}
