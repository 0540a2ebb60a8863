//! Immutable configuration and state types.

pub mod mode;
pub mod options;

pub use mode::{FetchMode, FetcherState};
pub use options::{FetchConfig, RequestOptions};
