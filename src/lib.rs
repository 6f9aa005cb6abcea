//! Futarchy price feed - conditional-market pool prices for Gnosis Chain
//!
//! Reads AMM pool state over JSON-RPC with endpoint fallback, per-endpoint
//! rate-limit cooldowns, a TTL cache and in-flight request deduplication,
//! then derives the YES/NO impact and implied probability of a proposal.
//! A small data layer routes named operations to on-chain and Supabase
//! fetchers.

pub mod config;
pub mod types;
pub mod errors;
pub mod network;
pub mod pools;
pub mod pricing;
pub mod fetchers;
pub mod utils;

// Re-export commonly used items
pub use config::{Config, CONFIG};
pub use errors::{FeedError, FeedResult};
pub use fetchers::{DataLayer, FetchResponse, Fetcher, OperationKind};
pub use pools::{PoolPriceReader, ReaderConfig};
pub use types::*;

// Type alias for our concrete provider
pub type ConcreteProvider = alloy::providers::RootProvider<alloy::transports::BoxTransport>;
