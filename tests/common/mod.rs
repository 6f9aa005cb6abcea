#![allow(dead_code)]

use alloy::primitives::{address, Address, U256};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futarchy_price_feed::network::{CooldownPolicy, PoolStateSource};
use futarchy_price_feed::types::{PoolKind, PoolTokens};
use futarchy_price_feed::{PoolPriceReader, ReaderConfig};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub const ENDPOINT_A: &str = "https://rpc-a.example";
pub const ENDPOINT_B: &str = "https://rpc-b.example";

pub const YES_POOL: Address = address!("1111111111111111111111111111111111111111");
pub const NO_POOL: Address = address!("2222222222222222222222222222222222222222");
/// Hex digits that read like an HTTP status.
pub const DIGIT_POOL: Address = address!("1111111111111111429111111111111111111111");
pub const COMPANY: Address = address!("9c58bacc331c9aa871afd802db6379a98e80cedb");
pub const CURRENCY: Address = address!("af204776c7245bf4147c2612bf6e5972ee483701");

/// sqrtPriceX96 for a raw price of 0.25.
pub fn sqrt_quarter() -> U256 {
    U256::from(1u128 << 95)
}

/// sqrtPriceX96 for a raw price of 1.0.
pub fn sqrt_one() -> U256 {
    U256::from(1u128 << 96)
}

/// In-memory pool state with per-endpoint failures and a call log.
pub struct ScriptedSource {
    prices: Mutex<HashMap<Address, U256>>,
    tokens: Mutex<HashMap<Address, PoolTokens>>,
    failures: Mutex<HashMap<String, String>>,
    calls: Mutex<Vec<String>>,
    token_calls: Mutex<u32>,
    delay: Duration,
    call_context: bool,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self {
            prices: Mutex::new(HashMap::new()),
            tokens: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            token_calls: Mutex::new(0),
            delay: Duration::ZERO,
            call_context: false,
        }
    }

    /// Wrap failures in the same context layer the alloy source adds.
    pub fn with_call_context(mut self) -> Self {
        self.call_context = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_price(&self, pool: Address, sqrt_price_x96: U256) {
        self.prices.lock().insert(pool, sqrt_price_x96);
    }

    pub fn set_tokens(&self, pool: Address, token0: Address, token1: Address) {
        self.tokens.lock().insert(pool, PoolTokens { token0, token1 });
    }

    pub fn fail(&self, endpoint: &str, message: &str) {
        self.failures.lock().insert(endpoint.to_string(), message.to_string());
    }

    pub fn recover(&self, endpoint: &str) {
        self.failures.lock().remove(endpoint);
    }

    /// Endpoints hit by price reads, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn token_calls(&self) -> u32 {
        *self.token_calls.lock()
    }

    fn failure_for(&self, endpoint: &str) -> Option<String> {
        self.failures.lock().get(endpoint).cloned()
    }
}

#[async_trait]
impl PoolStateSource for ScriptedSource {
    async fn sqrt_price_x96(&self, endpoint: &str, pool: Address, kind: PoolKind) -> Result<U256> {
        self.calls.lock().push(endpoint.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(message) = self.failure_for(endpoint) {
            let error = anyhow!(message);
            if self.call_context {
                return Err(error).with_context(|| format!("Failed to call {} on {}", kind.state_signature(), pool));
            }
            return Err(error);
        }
        let price = self.prices.lock().get(&pool).copied();
        price.ok_or_else(|| anyhow!("execution reverted: unknown pool {}", pool))
    }

    async fn pool_tokens(&self, endpoint: &str, pool: Address) -> Result<PoolTokens> {
        *self.token_calls.lock() += 1;
        if let Some(message) = self.failure_for(endpoint) {
            return Err(anyhow!(message));
        }
        let tokens = self.tokens.lock().get(&pool).copied();
        tokens.ok_or_else(|| anyhow!("execution reverted: unknown pool {}", pool))
    }
}

pub fn test_config() -> ReaderConfig {
    ReaderConfig {
        cache_duration: Duration::from_secs(30),
        max_attempts: 3,
        retry_delay: Duration::ZERO,
        cooldown: CooldownPolicy::fixed(Duration::from_secs(30)),
    }
}

pub fn reader_with(source: Arc<ScriptedSource>, endpoints: &[&str], config: ReaderConfig) -> PoolPriceReader {
    let urls = endpoints.iter().map(|u| u.to_string()).collect();
    PoolPriceReader::new(source, urls, config)
}
