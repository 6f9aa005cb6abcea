//! Health monitoring types

use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Serialize)]
pub struct EndpointHealth {
    pub url: String,
    pub cooling_down: bool,
    pub cooldown_remaining: Duration,
    pub consecutive_failures: u32,
}

#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub endpoints_available: usize,
    pub endpoints_cooling: usize,
    pub cached_pools: usize,
    pub in_flight: usize,
    pub uptime_seconds: u64,
}
