//! Supabase REST fetcher for candle and proposal data

use anyhow::Context;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;
use crate::{
    errors::{FeedError, FeedResult},
    network::{retry_with_backoff, RetryConfig},
};
use super::{parse_params, to_data, Fetcher, OperationKind};

#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub base_url: String,
    pub anon_key: String,
    pub candle_interval_ms: u64,
    pub candle_ttl: Duration,
    pub retry: RetryConfig,
}

impl SupabaseConfig {
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            anon_key: anon_key.into(),
            candle_interval_ms: 3_600_000,
            candle_ttl: Duration::from_secs(30),
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub address: String,
    pub interval: u64,
    pub price: f64,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalStatus {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandleParams {
    address: String,
    #[serde(default)]
    interval: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ProposalParams {
    proposal_id: String,
}

type CandleKey = (String, u64);

pub struct SupabasePoolFetcher {
    client: reqwest::Client,
    config: SupabaseConfig,
    candles: Mutex<HashMap<CandleKey, (Instant, Candle)>>,
}

impl SupabasePoolFetcher {
    pub fn new(config: SupabaseConfig) -> FeedResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| FeedError::Network {
                message: format!("Failed to build HTTP client: {}", e),
                retry_count: 0,
            })?;

        Ok(Self {
            client,
            config,
            candles: Mutex::new(HashMap::new()),
        })
    }

    async fn select_rows<T: DeserializeOwned>(&self, table: &str, query: &[(&str, String)]) -> FeedResult<Vec<T>> {
        let url = format!("{}/rest/v1/{}", self.config.base_url.trim_end_matches('/'), table);
        let client = &self.client;
        let key = self.config.anon_key.as_str();
        let url_ref = url.as_str();

        retry_with_backoff(
            move || async move {
                let response = client
                    .get(url_ref)
                    .query(query)
                    .header("apikey", key)
                    .bearer_auth(key)
                    .send()
                    .await
                    .context("Supabase request failed")?;

                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(anyhow::Error::from(FeedError::Api {
                        status: status.as_u16(),
                        message: body,
                    }));
                }

                let rows: Vec<T> = response
                    .json()
                    .await
                    .context("Failed to parse Supabase response")?;
                Ok(rows)
            },
            &self.config.retry,
            &format!("Supabase {} query", table),
        )
        .await
    }

    /// Latest candle for a pool, cached for `candle_ttl`.
    pub async fn latest_candle(&self, address: &str, interval: u64) -> FeedResult<Option<Candle>> {
        let key = (address.to_ascii_lowercase(), interval);
        let cached = self.candles.lock().get(&key).cloned();
        if let Some((fetched_at, candle)) = cached {
            if fetched_at.elapsed() < self.config.candle_ttl {
                debug!("Candle cache hit for {} @ {}ms", address, interval);
                return Ok(Some(candle));
            }
        }

        #[derive(Deserialize)]
        struct CandleRow {
            price: f64,
            timestamp: i64,
        }

        let rows: Vec<CandleRow> = self
            .select_rows(
                "pool_candles",
                &[
                    ("select", "price,timestamp".to_string()),
                    ("address", format!("eq.{}", key.0)),
                    ("interval", format!("eq.{}", interval)),
                    ("order", "timestamp.desc".to_string()),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;

        let candle = rows.into_iter().next().map(|row| Candle {
            address: key.0.clone(),
            interval,
            price: row.price,
            timestamp: row.timestamp,
        });

        if let Some(candle) = &candle {
            self.candles.lock().insert(key, (Instant::now(), candle.clone()));
        }
        Ok(candle)
    }

    pub async fn proposal_status(&self, proposal_id: &str) -> FeedResult<Option<ProposalStatus>> {
        let rows: Vec<ProposalStatus> = self
            .select_rows(
                "market_event",
                &[
                    ("select", "id,title,status".to_string()),
                    ("id", format!("eq.{}", proposal_id)),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl Fetcher for SupabasePoolFetcher {
    fn name(&self) -> &'static str {
        "supabase"
    }

    fn operations(&self) -> &'static [OperationKind] {
        &[OperationKind::PoolCandle, OperationKind::ProposalStatus]
    }

    async fn fetch(&self, operation: OperationKind, params: &Value) -> FeedResult<Value> {
        match operation {
            OperationKind::PoolCandle => {
                let params: CandleParams = parse_params(operation, params)?;
                let interval = params.interval.unwrap_or(self.config.candle_interval_ms);
                let candle = self.latest_candle(&params.address, interval).await?;
                to_data(operation, &candle)
            }
            OperationKind::ProposalStatus => {
                let params: ProposalParams = parse_params(operation, params)?;
                let status = self.proposal_status(&params.proposal_id).await?;
                to_data(operation, &status)
            }
            other => Err(FeedError::UnsupportedOperation(other.to_string())),
        }
    }
}
