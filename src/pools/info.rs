//! Pool state calls: token ordering and the packed price word

use alloy::{
    primitives::{Address, U256, keccak256},
    providers::Provider,
    rpc::types::eth::TransactionRequest,
    sol_types::SolValue,
};
use anyhow::{Context, Result};
use tracing::debug;
use crate::types::{PoolKind, PoolTokens};

fn selector(signature: &str) -> Vec<u8> {
    keccak256(signature)[..4].to_vec()
}

pub async fn get_pool_tokens(provider: &dyn Provider, pool: Address) -> Result<PoolTokens> {
    debug!("Getting tokens for pool {}", pool);

    let tx0 = TransactionRequest::default().to(pool).input(selector("token0()").into());
    let tx1 = TransactionRequest::default().to(pool).input(selector("token1()").into());

    let token0 = Address::abi_decode(&provider.call(&tx0).await
        .context("Failed to get token0")?, true)
        .context("Failed to decode token0")?;
    let token1 = Address::abi_decode(&provider.call(&tx1).await
        .context("Failed to get token1")?, true)
        .context("Failed to decode token1")?;

    Ok(PoolTokens { token0, token1 })
}

/// Read the sqrtPriceX96 word from `globalState()` or `slot0()`.
///
/// Both getters return a multi-field tuple whose first word is the price, so
/// only that word is decoded.
pub async fn get_sqrt_price_x96(provider: &dyn Provider, pool: Address, kind: PoolKind) -> Result<U256> {
    let signature = kind.state_signature();
    let tx = TransactionRequest::default()
        .to(pool)
        .input(selector(signature).into());

    let result = provider.call(&tx).await
        .with_context(|| format!("Failed to call {} on {}", signature, pool))?;

    decode_first_word(&result)
        .with_context(|| format!("Failed to decode {} return data for {}", signature, pool))
}

pub fn decode_first_word(data: &[u8]) -> Result<U256> {
    if data.len() < 32 {
        return Err(anyhow::anyhow!("expected at least 32 bytes, got {}", data.len()));
    }
    Ok(U256::from_be_slice(&data[..32]))
}
