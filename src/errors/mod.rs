//! Error types and failure classification

pub mod feed_error;
pub mod classify;

pub use feed_error::*;
pub use classify::*;
