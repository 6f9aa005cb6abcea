//! Core data types and structures

pub mod pools;
pub mod market;
pub mod health;

pub use pools::*;
pub use market::*;
pub use health::*;
