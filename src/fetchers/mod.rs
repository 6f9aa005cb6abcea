//! Data fetchers and the operation registry that dispatches to them

pub mod data_layer;
pub mod rpc;
pub mod supabase;

pub use data_layer::*;
pub use rpc::*;
pub use supabase::*;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use crate::errors::{FeedError, FeedResult};

/// Every operation the data layer knows how to route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    #[serde(rename = "pools.prices")]
    PoolPrices,
    #[serde(rename = "pools.candle")]
    PoolCandle,
    #[serde(rename = "proposal.status")]
    ProposalStatus,
    #[serde(rename = "market.summary")]
    MarketSummary,
}

impl OperationKind {
    pub const ALL: [OperationKind; 4] = [
        OperationKind::PoolPrices,
        OperationKind::PoolCandle,
        OperationKind::ProposalStatus,
        OperationKind::MarketSummary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::PoolPrices => "pools.prices",
            OperationKind::PoolCandle => "pools.candle",
            OperationKind::ProposalStatus => "proposal.status",
            OperationKind::MarketSummary => "market.summary",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OperationKind::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| FeedError::UnsupportedOperation(s.to_string()))
    }
}

/// Uniform result envelope: `{"status":"success","data":..}` or
/// `{"status":"error","reason":".."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FetchResponse {
    Success { data: Value },
    Error { reason: String },
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchResponse::Success { .. })
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            FetchResponse::Success { data } => Some(data),
            FetchResponse::Error { .. } => None,
        }
    }
}

impl From<FeedResult<Value>> for FetchResponse {
    fn from(result: FeedResult<Value>) -> Self {
        match result {
            Ok(data) => FetchResponse::Success { data },
            Err(e) => FetchResponse::Error { reason: e.to_string() },
        }
    }
}

/// A plugin that serves one or more operations.
#[async_trait]
pub trait Fetcher: Send + Sync {
    fn name(&self) -> &'static str;

    fn operations(&self) -> &'static [OperationKind];

    async fn fetch(&self, operation: OperationKind, params: &Value) -> FeedResult<Value>;
}

/// Deserialize operation parameters, reporting failures as `InvalidParams`.
pub fn parse_params<T: DeserializeOwned>(operation: OperationKind, params: &Value) -> FeedResult<T> {
    serde_json::from_value(params.clone()).map_err(|e| FeedError::InvalidParams {
        operation: operation.to_string(),
        reason: e.to_string(),
    })
}

pub fn to_data<T: Serialize>(operation: OperationKind, value: &T) -> FeedResult<Value> {
    serde_json::to_value(value).map_err(|e| FeedError::DataParsing {
        context: format!("serializing {} result: {}", operation, e),
    })
}
