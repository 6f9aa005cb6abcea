//! Fixed-point price math

use alloy::primitives::U256;

/// 2^96 as a float.
pub const Q96: f64 = 79_228_162_514_264_337_593_543_950_336.0;

/// Convert a sqrtPriceX96 word to the raw token1/token0 price.
///
/// Returns `None` for an uninitialised pool (zero price) or a value that does
/// not fit a finite float.
pub fn sqrt_price_x96_to_price(sqrt_price_x96: U256) -> Option<f64> {
    if sqrt_price_x96.is_zero() {
        return None;
    }
    let sqrt_price = sqrt_price_x96.to_string().parse::<f64>().ok()? / Q96;
    let price = sqrt_price * sqrt_price;
    (price.is_finite() && price > 0.0).then_some(price)
}

/// Re-express a raw token1/token0 price from the other side of the pool.
pub fn invert_price(price: f64) -> Option<f64> {
    if price == 0.0 || !price.is_finite() {
        return None;
    }
    let inverted = 1.0 / price;
    inverted.is_finite().then_some(inverted)
}
