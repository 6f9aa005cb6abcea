//! Health monitoring utilities

use std::time::Instant;
use crate::{
    pools::PoolPriceReader,
    types::HealthStatus,
};

pub fn run_health_check(reader: &PoolPriceReader, start_time: Instant) -> HealthStatus {
    let endpoints = reader.endpoint_health();
    let cooling = endpoints.iter().filter(|ep| ep.cooling_down).count();

    HealthStatus {
        endpoints_available: endpoints.len() - cooling,
        endpoints_cooling: cooling,
        cached_pools: reader.cached_pools(),
        in_flight: reader.in_flight(),
        uptime_seconds: start_time.elapsed().as_secs(),
    }
}
