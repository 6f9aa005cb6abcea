//! RPC endpoint rotation with per-endpoint cooldowns

use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};
use crate::types::EndpointHealth;

/// How long a throttled endpoint is parked: `base` plus a uniform jitter in
/// `[jitter_min, jitter_max]`.
#[derive(Debug, Clone, PartialEq)]
pub struct CooldownPolicy {
    pub base: Duration,
    pub jitter_min: Duration,
    pub jitter_max: Duration,
}

impl Default for CooldownPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(30),
            jitter_min: Duration::from_secs(1),
            jitter_max: Duration::from_secs(10),
        }
    }
}

impl CooldownPolicy {
    pub fn fixed(duration: Duration) -> Self {
        Self {
            base: duration,
            jitter_min: Duration::ZERO,
            jitter_max: Duration::ZERO,
        }
    }

    pub fn next_cooldown(&self) -> Duration {
        let span = self.jitter_max.saturating_sub(self.jitter_min);
        let jitter = span.mul_f64(rand::random::<f64>());
        self.base + self.jitter_min + jitter
    }

    pub fn max_cooldown(&self) -> Duration {
        self.base + self.jitter_min.max(self.jitter_max)
    }
}

#[derive(Debug, Clone)]
pub struct RpcEndpoint {
    pub url: String,
    cooldown_until: Option<Instant>,
    last_tried: Option<Instant>,
    consecutive_failures: u32,
}

impl RpcEndpoint {
    fn new(url: String) -> Self {
        Self {
            url,
            cooldown_until: None,
            last_tried: None,
            consecutive_failures: 0,
        }
    }

    pub fn is_cooling(&self, now: Instant) -> bool {
        self.cooldown_until.is_some_and(|until| now < until)
    }

    pub fn cooldown_remaining(&self, now: Instant) -> Duration {
        self.cooldown_until
            .map(|until| until.saturating_duration_since(now))
            .unwrap_or_default()
    }
}

/// A pick handed out by [`EndpointPool::select`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub index: usize,
    pub url: String,
    /// Every endpoint was cooling down; this one was tried least recently.
    pub forced: bool,
}

/// Fixed-order endpoint list. The cursor stays on an endpoint while it works
/// and moves forward when it fails.
#[derive(Debug)]
pub struct EndpointPool {
    endpoints: Vec<RpcEndpoint>,
    cursor: usize,
    policy: CooldownPolicy,
}

impl EndpointPool {
    pub fn new(urls: Vec<String>, policy: CooldownPolicy) -> Self {
        Self {
            endpoints: urls.into_iter().map(RpcEndpoint::new).collect(),
            cursor: 0,
            policy,
        }
    }

    pub fn select(&mut self, now: Instant) -> Option<Selection> {
        let len = self.endpoints.len();
        if len == 0 {
            return None;
        }

        let ready = (0..len)
            .map(|offset| (self.cursor + offset) % len)
            .find(|&i| !self.endpoints[i].is_cooling(now));

        let (index, forced) = match ready {
            Some(i) => (i, false),
            None => {
                // all parked: fall back to whichever was tried longest ago
                let oldest = self
                    .endpoints
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, ep)| ep.last_tried)
                    .map(|(i, _)| i)
                    .unwrap_or(self.cursor);
                debug!("All {} endpoints cooling down, forcing {}", len, self.endpoints[oldest].url);
                (oldest, true)
            }
        };

        self.cursor = index;
        let endpoint = &mut self.endpoints[index];
        endpoint.last_tried = Some(now);

        Some(Selection {
            index,
            url: endpoint.url.clone(),
            forced,
        })
    }

    pub fn record_success(&mut self, index: usize) {
        if let Some(endpoint) = self.endpoints.get_mut(index) {
            endpoint.cooldown_until = None;
            endpoint.consecutive_failures = 0;
        }
    }

    /// Park the endpoint and advance past it. Returns the cooldown applied.
    pub fn record_throttle(&mut self, index: usize, now: Instant) -> Duration {
        let cooldown = self.policy.next_cooldown();
        if let Some(endpoint) = self.endpoints.get_mut(index) {
            endpoint.cooldown_until = Some(now + cooldown);
            endpoint.consecutive_failures += 1;
            warn!(
                "⏸️ RPC endpoint {} cooling down for {:.1}s (failures: {})",
                endpoint.url,
                cooldown.as_secs_f64(),
                endpoint.consecutive_failures
            );
        }
        self.advance_from(index);
        cooldown
    }

    /// Advance past the endpoint without parking it.
    pub fn record_failure(&mut self, index: usize) {
        if let Some(endpoint) = self.endpoints.get_mut(index) {
            endpoint.consecutive_failures += 1;
        }
        self.advance_from(index);
    }

    fn advance_from(&mut self, index: usize) {
        if !self.endpoints.is_empty() {
            self.cursor = (index + 1) % self.endpoints.len();
        }
    }

    pub fn health(&self, now: Instant) -> Vec<EndpointHealth> {
        self.endpoints
            .iter()
            .map(|ep| EndpointHealth {
                url: ep.url.clone(),
                cooling_down: ep.is_cooling(now),
                cooldown_remaining: ep.cooldown_remaining(now),
                consecutive_failures: ep.consecutive_failures,
            })
            .collect()
    }
}
