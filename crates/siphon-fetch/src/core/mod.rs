//! Pure transformations used by the fetch loop.
//!
//! Nothing in here performs I/O; the driver feeds header lines and status
//! codes in and reads decisions back out.

mod headers;
mod validation;

pub use headers::{HeaderState, parse_content_type, parse_status_line};
pub use validation::is_redirect;
