//! Natural prices, impact and implied probability from raw pool prices
//!
//! A raw pool price is token1 per token0. Which logical token sits in slot 0
//! is decided per pool, since two pools of the same market may be ordered
//! differently. Every derived value is `None` when it would otherwise be
//! infinite or NaN.

use chrono::Utc;
use crate::{
    pools::invert_price,
    types::{MarketSnapshot, PoolTokens, TokenSlot},
};

/// Case-insensitive address comparison, tolerant of a missing `0x` prefix.
pub fn same_address(a: &str, b: &str) -> bool {
    fn strip(s: &str) -> &str {
        let s = s.trim();
        s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s)
    }
    let (a, b) = (strip(a), strip(b));
    !a.is_empty() && a.eq_ignore_ascii_case(b)
}

/// Slot holding `token` in this pool, or `None` if the pool does not contain it.
pub fn slot_of(tokens: &PoolTokens, token: &str) -> Option<TokenSlot> {
    if same_address(&tokens.token0.to_string(), token) {
        Some(TokenSlot::Token0)
    } else if same_address(&tokens.token1.to_string(), token) {
        Some(TokenSlot::Token1)
    } else {
        None
    }
}

/// Price of the base token in units of the other token.
pub fn natural_price(raw_price: f64, base_slot: TokenSlot) -> Option<f64> {
    if !raw_price.is_finite() || raw_price == 0.0 {
        return None;
    }
    match base_slot {
        TokenSlot::Token0 => Some(raw_price),
        TokenSlot::Token1 => invert_price(raw_price),
    }
}

/// `(yes - no) / max(yes, no) * 100`
pub fn impact_pct(yes_price: Option<f64>, no_price: Option<f64>) -> Option<f64> {
    let (yes, no) = (yes_price?, no_price?);
    let denominator = yes.max(no);
    if denominator == 0.0 || !denominator.is_finite() {
        return None;
    }
    let impact = (yes - no) / denominator * 100.0;
    impact.is_finite().then_some(impact)
}

/// `yes / (yes + no)`
pub fn implied_probability(yes_price: Option<f64>, no_price: Option<f64>) -> Option<f64> {
    let (yes, no) = (yes_price?, no_price?);
    let sum = yes + no;
    if sum == 0.0 || !sum.is_finite() {
        return None;
    }
    let probability = yes / sum;
    probability.is_finite().then_some(probability)
}

pub fn derive_snapshot(yes_price: Option<f64>, no_price: Option<f64>, stale: bool) -> MarketSnapshot {
    MarketSnapshot {
        yes_price,
        no_price,
        impact_pct: impact_pct(yes_price, no_price),
        probability: implied_probability(yes_price, no_price),
        timestamp: Utc::now(),
        stale,
    }
}
