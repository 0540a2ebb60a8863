use std::fmt;

/// Result of one bounded write attempt.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    /// Bytes were accepted; the count may be smaller than requested.
    Ok,
    /// Bytes were accepted and the buffer is now full.
    ///
    /// Only non-blocking writers report this.
    OkBufferFull,
    /// Nothing could be written before the timeout elapsed.
    TimedOut,
    /// The sink no longer accepts data.
    Closed,
    /// The write was smaller than the sink's word size.
    BytesLessThanWordSize,
    /// The sink failed internally.
    Internal,
}

impl fmt::Display for WriteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteStatus::Ok => write!(f, "ok"),
            WriteStatus::OkBufferFull => write!(f, "ok, buffer full"),
            WriteStatus::TimedOut => write!(f, "timed out"),
            WriteStatus::Closed => write!(f, "closed"),
            WriteStatus::BytesLessThanWordSize => write!(f, "bytes less than word size"),
            WriteStatus::Internal => write!(f, "internal error"),
        }
    }
}

/// Bytes written by a bounded write together with its status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    pub written: usize,
    pub status:  WriteStatus,
}

impl WriteOutcome {
    pub fn new(written: usize, status: WriteStatus) -> Self {
        Self { written, status }
    }

    pub fn timed_out() -> Self {
        Self::new(0, WriteStatus::TimedOut)
    }

    pub fn closed() -> Self {
        Self::new(0, WriteStatus::Closed)
    }
}
