//! On-chain fetcher: pool prices and market summaries straight from the pools

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use crate::{
    errors::{classify_error, FeedError, FeedResult},
    pools::PoolPriceReader,
    pricing::{derive_snapshot, slot_of},
    types::{MarketPools, MarketSnapshot, PoolBinding, PoolConfig, PriceReading},
};
use super::{parse_params, to_data, Fetcher, OperationKind};

#[derive(Debug, Deserialize)]
struct PoolPricesParams {
    pools: Vec<PoolConfig>,
}

#[derive(Debug, Serialize)]
pub struct PoolPriceEntry {
    pub address: String,
    pub price: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
    pub stale: bool,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MarketSummary {
    #[serde(flatten)]
    pub snapshot: MarketSnapshot,
    pub errors: Vec<String>,
}

pub struct RpcPoolFetcher {
    reader: PoolPriceReader,
    serve_stale: bool,
}

impl RpcPoolFetcher {
    pub fn new(reader: PoolPriceReader, serve_stale: bool) -> Self {
        Self { reader, serve_stale }
    }

    async fn read(&self, pool: &PoolConfig) -> FeedResult<PriceReading> {
        if self.serve_stale {
            self.reader.get_price_or_stale(pool).await
        } else {
            self.reader.get_price(pool).await
        }
    }

    pub async fn pool_prices(&self, pools: &[PoolConfig]) -> Vec<PoolPriceEntry> {
        let readings = join_all(pools.iter().map(|pool| self.read(pool))).await;

        pools
            .iter()
            .zip(readings)
            .map(|(pool, reading)| match reading {
                Ok(reading) => PoolPriceEntry {
                    address: pool.address.to_string(),
                    price: Some(reading.price),
                    timestamp: Some(reading.timestamp),
                    stale: reading.stale,
                    error: None,
                },
                Err(e) => PoolPriceEntry {
                    address: pool.address.to_string(),
                    price: None,
                    timestamp: None,
                    stale: false,
                    error: Some(e.to_string()),
                },
            })
            .collect()
    }

    /// Company-token price of one conditional pool, oriented by its actual token order.
    async fn company_price(&self, binding: &PoolBinding) -> FeedResult<PriceReading> {
        let tokens = self.reader.pool_tokens(binding.address).await?;
        let slot = slot_of(&tokens, &binding.company_token).ok_or_else(|| FeedError::DataParsing {
            context: format!(
                "pool {} holds neither token0 {} nor token1 {} as company token {}",
                binding.address, tokens.token0, tokens.token1, binding.company_token
            ),
        })?;
        let pool = PoolConfig::new(binding.address, slot).with_kind(binding.kind);
        self.read(&pool).await
    }

    pub async fn market_summary(&self, market: &MarketPools) -> MarketSummary {
        let (yes, no) = futures::join!(
            self.company_price(&market.yes_pool),
            self.company_price(&market.no_pool)
        );

        let mut errors = Vec::new();
        let mut stale = false;
        let mut price_of = |side: &str, reading: FeedResult<PriceReading>| match reading {
            Ok(reading) => {
                stale |= reading.stale;
                Some(reading.price)
            }
            Err(e) => {
                warn!("⚠️ {} pool price unavailable ({:?}): {}", side, classify_error(&e), e);
                errors.push(format!("{}: {}", side, e));
                None
            }
        };
        let yes_price = price_of("YES", yes);
        let no_price = price_of("NO", no);

        MarketSummary {
            snapshot: derive_snapshot(yes_price, no_price, stale),
            errors,
        }
    }
}

#[async_trait]
impl Fetcher for RpcPoolFetcher {
    fn name(&self) -> &'static str {
        "rpc"
    }

    fn operations(&self) -> &'static [OperationKind] {
        &[OperationKind::PoolPrices, OperationKind::MarketSummary]
    }

    async fn fetch(&self, operation: OperationKind, params: &Value) -> FeedResult<Value> {
        match operation {
            OperationKind::PoolPrices => {
                let params: PoolPricesParams = parse_params(operation, params)?;
                let prices = self.pool_prices(&params.pools).await;
                to_data(operation, &serde_json::json!({ "prices": prices }))
            }
            OperationKind::MarketSummary => {
                let market: MarketPools = parse_params(operation, params)?;
                to_data(operation, &self.market_summary(&market).await)
            }
            other => Err(FeedError::UnsupportedOperation(other.to_string())),
        }
    }
}
