//! Conditional market types

use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use super::PoolKind;

/// A conditional pool plus the address of the logical company token it trades.
///
/// The company token address comes from market metadata and may use any hex casing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolBinding {
    pub address: Address,
    pub company_token: String,
    #[serde(default)]
    pub kind: PoolKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketPools {
    pub yes_pool: PoolBinding,
    pub no_pool: PoolBinding,
}

/// Derived view of a YES/NO market. Missing values stay `None` and render as "N/A".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub yes_price: Option<f64>,
    pub no_price: Option<f64>,
    pub impact_pct: Option<f64>,
    pub probability: Option<f64>,
    pub timestamp: DateTime<Utc>,
    pub stale: bool,
}
