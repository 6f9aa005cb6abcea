//! Custom error types for the price feed

use alloy::primitives::Address;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the reader, the fetchers and the data layer.
///
/// Every variant carries owned strings instead of boxed sources so that a
/// single failed fetch can be handed to every subscriber of a shared
/// in-flight request.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeedError {
    #[error("RPC endpoint {endpoint} throttled or unreachable: {message}")]
    Throttled {
        endpoint: String,
        message: String,
        cooldown: Duration,
    },

    #[error("RPC call to {endpoint} failed: {message}")]
    Rpc {
        endpoint: String,
        message: String,
    },

    #[error("Contract interaction failed: {contract} - {message}")]
    Contract {
        contract: Address,
        message: String,
    },

    #[error("Data parsing error: {context}")]
    DataParsing {
        context: String,
    },

    #[error("No RPC endpoints configured")]
    NoEndpoints,

    #[error("Network error: {message}")]
    Network {
        message: String,
        retry_count: u32,
    },

    #[error("Upstream API error: {status} - {message}")]
    Api {
        status: u16,
        message: String,
    },

    #[error("Invalid parameters for {operation}: {reason}")]
    InvalidParams {
        operation: String,
        reason: String,
    },

    #[error("No fetcher registered for operation '{0}'")]
    UnsupportedOperation(String),
}

pub type FeedResult<T> = Result<T, FeedError>;

impl FeedError {
    /// True for the rate-limit/network class that puts an endpoint into cooldown.
    pub fn is_throttle(&self) -> bool {
        matches!(self, FeedError::Throttled { .. })
    }
}
