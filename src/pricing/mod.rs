//! Derived market prices and probabilities

pub mod derivation;

pub use derivation::*;
