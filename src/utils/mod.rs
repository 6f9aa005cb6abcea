//! Utility functions and helpers

pub mod logging;
pub mod health;
pub mod display;

pub use logging::*;
pub use health::*;
pub use display::*;
