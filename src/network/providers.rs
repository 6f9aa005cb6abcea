//! Network provider setup and on-chain pool state access

use alloy::{
    primitives::{Address, U256},
    providers::{Provider, ProviderBuilder},
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use crate::{
    pools::{get_pool_tokens, get_sqrt_price_x96},
    types::{PoolKind, PoolTokens},
    ConcreteProvider,
};

/// Raw pool state reads against a specific RPC endpoint.
///
/// The reader owns endpoint selection; implementations only perform the call.
#[async_trait]
pub trait PoolStateSource: Send + Sync {
    async fn sqrt_price_x96(&self, endpoint: &str, pool: Address, kind: PoolKind) -> Result<U256>;

    async fn pool_tokens(&self, endpoint: &str, pool: Address) -> Result<PoolTokens>;
}

pub fn setup_provider(rpc_url: &str) -> Result<Arc<ConcreteProvider>> {
    let provider: Arc<ConcreteProvider> = Arc::new(
        ProviderBuilder::new()
            .on_http(rpc_url.parse().with_context(|| format!("Invalid RPC URL: {}", rpc_url))?)
            .boxed()
    );
    Ok(provider)
}

/// HTTP JSON-RPC source backed by one alloy provider per endpoint URL.
#[derive(Default)]
pub struct AlloyPoolSource {
    providers: Mutex<HashMap<String, Arc<ConcreteProvider>>>,
}

impl AlloyPoolSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn provider_for(&self, url: &str) -> Result<Arc<ConcreteProvider>> {
        let mut providers = self.providers.lock();
        if let Some(provider) = providers.get(url) {
            return Ok(provider.clone());
        }
        debug!("Creating provider for {}", url);
        let provider = setup_provider(url)?;
        providers.insert(url.to_string(), provider.clone());
        Ok(provider)
    }

    /// Log the head block of each endpoint, all endpoints at once. Each probe
    /// is bounded by `timeout`. Failures are reported, not fatal.
    pub async fn probe_endpoints(&self, urls: &[String], timeout: Duration) -> usize {
        let probes = urls.iter().map(|url| self.probe_endpoint(url, timeout));
        join_all(probes).await.into_iter().filter(|reachable| *reachable).count()
    }

    async fn probe_endpoint(&self, url: &str, timeout: Duration) -> bool {
        let provider = match self.provider_for(url) {
            Ok(p) => p,
            Err(e) => {
                warn!("⚠️ Skipping RPC endpoint {}: {:#}", url, e);
                return false;
            }
        };
        match tokio::time::timeout(timeout, provider.get_block_number()).await {
            Ok(Ok(block)) => {
                info!("✅ {} at block {}", url, block);
                true
            }
            Ok(Err(e)) => {
                warn!("⚠️ {} unreachable: {}", url, e);
                false
            }
            Err(_) => {
                warn!("⚠️ {} did not answer within {:?}", url, timeout);
                false
            }
        }
    }
}

#[async_trait]
impl PoolStateSource for AlloyPoolSource {
    async fn sqrt_price_x96(&self, endpoint: &str, pool: Address, kind: PoolKind) -> Result<U256> {
        let provider = self.provider_for(endpoint)?;
        get_sqrt_price_x96(provider.as_ref(), pool, kind).await
    }

    async fn pool_tokens(&self, endpoint: &str, pool: Address) -> Result<PoolTokens> {
        let provider = self.provider_for(endpoint)?;
        get_pool_tokens(provider.as_ref(), pool).await
    }
}
