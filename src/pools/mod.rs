//! Pool state access and price reading

pub mod info;
pub mod math;
pub mod reader;

pub use info::*;
pub use math::*;
pub use reader::*;
