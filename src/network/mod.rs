//! Network providers, endpoint rotation and retry handling

pub mod providers;
pub mod endpoints;
pub mod retry;

pub use providers::*;
pub use endpoints::*;
pub use retry::*;
