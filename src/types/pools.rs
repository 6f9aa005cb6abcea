//! Pool-related types and structures

use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tokio::time::Instant;

/// Which pool-state getter a pool exposes. Both return sqrtPriceX96 as the first word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PoolKind {
    /// Algebra (Swapr on Gnosis): `globalState()`
    #[default]
    Algebra,
    /// Uniswap V3: `slot0()`
    UniswapV3,
}

impl PoolKind {
    pub fn state_signature(&self) -> &'static str {
        match self {
            PoolKind::Algebra => "globalState()",
            PoolKind::UniswapV3 => "slot0()",
        }
    }
}

impl FromStr for PoolKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "algebra" | "swapr" => Ok(PoolKind::Algebra),
            "uniswap-v3" | "uniswap_v3" | "univ3" | "v3" => Ok(PoolKind::UniswapV3),
            other => Err(format!("unknown pool kind '{}'", other)),
        }
    }
}

/// Slot occupied by the company (base) token inside a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TokenSlot {
    #[default]
    Token0,
    Token1,
}

impl TryFrom<u8> for TokenSlot {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TokenSlot::Token0),
            1 => Ok(TokenSlot::Token1),
            other => Err(format!("token slot must be 0 or 1, got {}", other)),
        }
    }
}

impl From<TokenSlot> for u8 {
    fn from(slot: TokenSlot) -> Self {
        match slot {
            TokenSlot::Token0 => 0,
            TokenSlot::Token1 => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    pub address: Address,
    #[serde(default)]
    pub token_company_slot: TokenSlot,
    #[serde(default)]
    pub kind: PoolKind,
}

impl PoolConfig {
    pub fn new(address: Address, token_company_slot: TokenSlot) -> Self {
        Self {
            address,
            token_company_slot,
            kind: PoolKind::default(),
        }
    }

    pub fn with_kind(mut self, kind: PoolKind) -> Self {
        self.kind = kind;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolTokens {
    pub token0: Address,
    pub token1: Address,
}

/// A pool price observation.
#[derive(Debug, Clone, Serialize)]
pub struct PriceReading {
    pub price: f64,
    pub timestamp: DateTime<Utc>,
    /// Served from an expired cache entry after a failed refresh.
    pub stale: bool,
    #[serde(skip)]
    pub fetched_at: Instant,
}

impl PriceReading {
    pub fn new(price: f64) -> Self {
        Self {
            price,
            timestamp: Utc::now(),
            stale: false,
            fetched_at: Instant::now(),
        }
    }

    pub fn is_fresh(&self, ttl: std::time::Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }

    /// Same observation, with the price re-expressed by `f`.
    pub fn map_price<F: FnOnce(f64) -> f64>(&self, f: F) -> Self {
        Self {
            price: f(self.price),
            ..self.clone()
        }
    }
}

impl fmt::Display for PriceReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6} @ {}", self.price, self.timestamp.format("%H:%M:%S"))?;
        if self.stale {
            write!(f, " (stale)")?;
        }
        Ok(())
    }
}
