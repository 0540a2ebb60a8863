//! Bounded, backpressure-aware byte sinks for streamed content.
//!
//! A sink accepts bytes through a bounded write that may time out instead of
//! blocking forever, so a producer can keep checking for shutdown while a slow
//! consumer drains the other side.
//!
//! # Key Features
//!
//! - **Bounded writes**: every write carries a timeout and reports a [`WriteStatus`]
//! - **Object safe**: [`SinkWriter`] is usable as `Arc<dyn SinkWriter>`
//! - **In-process attachment**: [`Attachment`] pairs one writer with one async reader
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use siphon_sink::{Attachment, SinkWriter, WriteStatus};
//! use tokio::io::AsyncReadExt;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let attachment = Attachment::new("memo");
//! let writer = attachment.create_writer().unwrap();
//! let mut reader = attachment.create_reader().unwrap();
//!
//! let outcome = writer.write(b"hello", Duration::from_millis(100)).await;
//! assert_eq!(outcome.status, WriteStatus::Ok);
//! writer.close();
//!
//! let mut body = Vec::new();
//! reader.read_to_end(&mut body).await.unwrap();
//! assert_eq!(body, b"hello");
//! # }
//! ```

pub use self::attachment::{Attachment, AttachmentReader, AttachmentWriter};
pub use self::status::{WriteOutcome, WriteStatus};
pub use self::writer::SinkWriter;

mod attachment;
mod status;
mod writer;
