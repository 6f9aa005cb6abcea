//! Display and printing utilities

use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use tracing::{info, warn};
use crate::types::{EndpointHealth, HealthStatus, MarketSnapshot};

pub const NOT_AVAILABLE: &str = "N/A";

fn to_decimal(value: Option<f64>) -> Option<Decimal> {
    value.filter(|v| v.is_finite()).and_then(Decimal::from_f64)
}

/// Price rounded to `dp` decimals, or "N/A".
pub fn format_price(value: Option<f64>, dp: u32) -> String {
    match to_decimal(value) {
        Some(d) => format!("{:.*}", dp as usize, d.round_dp(dp)),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Signed percentage with two decimals, e.g. "+12.50%".
pub fn format_impact(value: Option<f64>) -> String {
    match to_decimal(value) {
        Some(d) => {
            let rounded = d.round_dp(2);
            let sign = if rounded > Decimal::ZERO { "+" } else { "" };
            format!("{}{:.2}%", sign, rounded)
        }
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Probability in [0, 1] rendered as a percentage with one decimal.
pub fn format_probability(value: Option<f64>) -> String {
    match to_decimal(value) {
        Some(d) => format!("{:.1}%", (d * dec!(100)).round_dp(1)),
        None => NOT_AVAILABLE.to_string(),
    }
}

pub fn print_market_snapshot(label: &str, snapshot: &MarketSnapshot) {
    info!(
        "💹 {} | YES: {} | NO: {} | Impact: {} | Probability: {}{}",
        label,
        format_price(snapshot.yes_price, 4),
        format_price(snapshot.no_price, 4),
        format_impact(snapshot.impact_pct),
        format_probability(snapshot.probability),
        if snapshot.stale { " (stale)" } else { "" }
    );
}

pub fn print_endpoint_health(endpoints: &[EndpointHealth]) {
    for ep in endpoints {
        if ep.cooling_down {
            warn!(
                "   ⏸️ {} cooling down ({:.0}s left, {} failures)",
                ep.url,
                ep.cooldown_remaining.as_secs_f64(),
                ep.consecutive_failures
            );
        } else {
            info!("   ✅ {} ready ({} failures)", ep.url, ep.consecutive_failures);
        }
    }
}

pub fn print_health_status(health: &HealthStatus) {
    info!(
        "🏥 Health Check: RPC ready={} cooling={} | cached pools={} | in flight={} | uptime={}s",
        health.endpoints_available,
        health.endpoints_cooling,
        health.cached_pools,
        health.in_flight,
        health.uptime_seconds
    );
}
