//! Pool price reader with endpoint fallback, TTL cache and request deduplication

use alloy::primitives::Address;
use futures::future::{BoxFuture, FutureExt, Shared, WeakShared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use crate::{
    errors::{classify_source_error, FeedError, FeedResult, RecoveryAction},
    network::{CooldownPolicy, EndpointPool, PoolStateSource},
    pools::math::{invert_price, sqrt_price_x96_to_price},
    types::{EndpointHealth, PoolConfig, PoolKind, PoolTokens, PriceReading, TokenSlot},
};

type SharedRead = Shared<BoxFuture<'static, FeedResult<PriceReading>>>;

/// Reads in progress. Only subscribers keep a read alive; the map holds a weak
/// handle tagged with the id of the read that registered it.
type InFlight = HashMap<Address, (u64, WeakShared<BoxFuture<'static, FeedResult<PriceReading>>>)>;

#[derive(Debug, Clone)]
pub struct ReaderConfig {
    pub cache_duration: Duration,
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub cooldown: CooldownPolicy,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            cache_duration: Duration::from_secs(30),
            max_attempts: 3,
            retry_delay: Duration::from_millis(250),
            cooldown: CooldownPolicy::default(),
        }
    }
}

/// Reads pool prices over a rotating set of RPC endpoints.
///
/// Cloning is cheap; clones share the cache, the in-flight map and the
/// endpoint cooldown state.
#[derive(Clone)]
pub struct PoolPriceReader {
    inner: Arc<ReaderInner>,
}

struct ReaderInner {
    source: Arc<dyn PoolStateSource>,
    config: ReaderConfig,
    endpoints: Mutex<EndpointPool>,
    /// Raw token1/token0 readings keyed by pool.
    cache: Mutex<HashMap<Address, PriceReading>>,
    in_flight: Mutex<InFlight>,
    next_read_id: AtomicU64,
    tokens: Mutex<HashMap<Address, PoolTokens>>,
}

impl PoolPriceReader {
    pub fn new(source: Arc<dyn PoolStateSource>, rpc_urls: Vec<String>, config: ReaderConfig) -> Self {
        info!(
            "📡 Pool price reader: {} endpoints, cache {}s, {} attempts",
            rpc_urls.len(),
            config.cache_duration.as_secs(),
            config.max_attempts
        );
        Self {
            inner: Arc::new(ReaderInner {
                source,
                endpoints: Mutex::new(EndpointPool::new(rpc_urls, config.cooldown.clone())),
                config,
                cache: Mutex::new(HashMap::new()),
                in_flight: Mutex::new(HashMap::new()),
                next_read_id: AtomicU64::new(0),
                tokens: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Price of the pool's company token, oriented by its slot.
    pub async fn get_price(&self, pool: &PoolConfig) -> FeedResult<PriceReading> {
        let raw = self.raw_price(pool.address, pool.kind).await?;
        orient(raw, pool.address, pool.token_company_slot)
    }

    /// Like [`get_price`](Self::get_price), but falls back to an expired
    /// cache entry when every endpoint fails.
    pub async fn get_price_or_stale(&self, pool: &PoolConfig) -> FeedResult<PriceReading> {
        match self.raw_price(pool.address, pool.kind).await {
            Ok(raw) => orient(raw, pool.address, pool.token_company_slot),
            Err(e) => {
                let stale = self.inner.cache.lock().get(&pool.address).cloned();
                match stale {
                    Some(mut reading) => {
                        warn!(
                            "⚠️ Serving stale price for {} (age {:?}): {}",
                            pool.address,
                            reading.fetched_at.elapsed(),
                            e
                        );
                        reading.stale = true;
                        orient(reading, pool.address, pool.token_company_slot)
                    }
                    None => Err(e),
                }
            }
        }
    }

    /// Raw token1/token0 price, cached and deduplicated per pool address.
    pub async fn raw_price(&self, address: Address, kind: PoolKind) -> FeedResult<PriceReading> {
        if let Some(hit) = self.cached_price(address) {
            debug!("Cache hit for {}", address);
            return Ok(hit);
        }

        let read = {
            let mut in_flight = self.inner.in_flight.lock();
            let pending = in_flight.get(&address).and_then(|(_, weak)| weak.upgrade());
            match pending {
                Some(pending) => {
                    debug!("Joining in-flight read for {}", address);
                    pending
                }
                None => {
                    // a read may have landed between the cache check and this lock
                    if let Some(hit) = self.cached_price(address) {
                        return Ok(hit);
                    }
                    let id = self.inner.next_read_id.fetch_add(1, Ordering::Relaxed);
                    let registration = InFlightGuard {
                        inner: self.inner.clone(),
                        address,
                        id,
                    };
                    let read: SharedRead = ReaderInner::fetch_price(self.inner.clone(), address, kind, registration)
                        .boxed()
                        .shared();
                    if let Some(weak) = read.downgrade() {
                        in_flight.insert(address, (id, weak));
                    }
                    read
                }
            }
        };

        read.await
    }

    /// Fresh cached raw reading, if any.
    pub fn cached_price(&self, address: Address) -> Option<PriceReading> {
        let ttl = self.inner.config.cache_duration;
        self.inner
            .cache
            .lock()
            .get(&address)
            .filter(|reading| reading.is_fresh(ttl))
            .cloned()
    }

    pub fn invalidate(&self, address: Address) {
        self.inner.cache.lock().remove(&address);
    }

    /// token0/token1 of a pool. Fetched once, then served from memory.
    pub async fn pool_tokens(&self, address: Address) -> FeedResult<PoolTokens> {
        let known = self.inner.tokens.lock().get(&address).copied();
        if let Some(tokens) = known {
            return Ok(tokens);
        }

        let tokens = self
            .inner
            .call_with_fallback(address, "pool tokens", move |source, url| async move {
                source.pool_tokens(&url, address).await
            })
            .await?;

        self.inner.tokens.lock().insert(address, tokens);
        Ok(tokens)
    }

    pub fn endpoint_health(&self) -> Vec<EndpointHealth> {
        self.inner.endpoints.lock().health(Instant::now())
    }

    pub fn cached_pools(&self) -> usize {
        self.inner.cache.lock().len()
    }

    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.lock().len()
    }
}

impl ReaderInner {
    /// The registration lives as long as the read, polled or not.
    async fn fetch_price(
        self: Arc<Self>,
        address: Address,
        kind: PoolKind,
        _registration: InFlightGuard,
    ) -> FeedResult<PriceReading> {
        let result = self
            .call_with_fallback(address, kind.state_signature(), move |source, url| async move {
                source.sqrt_price_x96(&url, address, kind).await
            })
            .await
            .and_then(|sqrt_price_x96| {
                sqrt_price_x96_to_price(sqrt_price_x96).ok_or_else(|| FeedError::DataParsing {
                    context: format!("pool {} reported unusable sqrtPriceX96 {}", address, sqrt_price_x96),
                })
            })
            .map(PriceReading::new);

        if let Ok(reading) = &result {
            debug!("💹 {} raw price {:.8}", address, reading.price);
            self.cache.lock().insert(address, reading.clone());
        }

        result
    }

    async fn call_with_fallback<T, F, Fut>(&self, contract: Address, context: &str, call: F) -> FeedResult<T>
    where
        F: Fn(Arc<dyn PoolStateSource>, String) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut last_error = FeedError::NoEndpoints;

        for attempt in 1..=max_attempts {
            let selection = self
                .endpoints
                .lock()
                .select(Instant::now())
                .ok_or(FeedError::NoEndpoints)?;

            let outcome = call(self.source.clone(), selection.url.clone()).await;
            let e = match outcome {
                Ok(value) => {
                    self.endpoints.lock().record_success(selection.index);
                    return Ok(value);
                }
                Err(e) => e,
            };

            let message = format!("{:#}", e);
            let error = match classify_source_error(&e).recovery_action() {
                RecoveryAction::Cooldown => {
                    let cooldown = self.endpoints.lock().record_throttle(selection.index, Instant::now());
                    FeedError::Throttled {
                        endpoint: selection.url,
                        message,
                        cooldown,
                    }
                }
                RecoveryAction::Advance => {
                    self.endpoints.lock().record_failure(selection.index);
                    FeedError::Rpc {
                        endpoint: selection.url,
                        message,
                    }
                }
                RecoveryAction::Fail => {
                    warn!("❌ {} for {} failed without retry: {}", context, contract, message);
                    return Err(FeedError::Contract { contract, message });
                }
            };

            warn!(
                "Attempt {}/{} for {} of {} failed: {}",
                attempt, max_attempts, context, contract, error
            );
            last_error = error;

            if attempt < max_attempts && !self.config.retry_delay.is_zero() {
                tokio::time::sleep(self.config.retry_delay).await;
            }
        }

        Err(last_error)
    }
}

/// Removes a read's in-flight entry when the read completes or every
/// subscriber drops it. Never dropped while the in-flight lock is held.
struct InFlightGuard {
    inner: Arc<ReaderInner>,
    address: Address,
    id: u64,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut in_flight = self.inner.in_flight.lock();
        if in_flight.get(&self.address).is_some_and(|(id, _)| *id == self.id) {
            in_flight.remove(&self.address);
        }
    }
}

fn orient(reading: PriceReading, address: Address, slot: TokenSlot) -> FeedResult<PriceReading> {
    match slot {
        TokenSlot::Token0 => Ok(reading),
        TokenSlot::Token1 => invert_price(reading.price)
            .map(|inverted| reading.map_price(|_| inverted))
            .ok_or_else(|| FeedError::DataParsing {
                context: format!("cannot invert price {} of pool {}", reading.price, address),
            }),
    }
}
