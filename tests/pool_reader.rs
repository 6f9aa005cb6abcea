mod common;

use common::*;
use futarchy_price_feed::types::{PoolConfig, TokenSlot};
use futarchy_price_feed::{FeedError, PoolPriceReader};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

fn yes_pool(slot: TokenSlot) -> PoolConfig {
    PoolConfig::new(YES_POOL, slot)
}

#[tokio::test(start_paused = true)]
async fn reads_price_then_serves_cache_within_ttl() {
    let source = Arc::new(ScriptedSource::new());
    source.set_price(YES_POOL, sqrt_quarter());
    let reader = reader_with(source.clone(), &[ENDPOINT_A], test_config());

    let first = assert_ok!(reader.get_price(&yes_pool(TokenSlot::Token0)).await);
    assert_eq!(first.price, 0.25);
    assert!(!first.stale);

    tokio::time::advance(Duration::from_millis(1)).await;
    let second = assert_ok!(reader.get_price(&yes_pool(TokenSlot::Token0)).await);
    assert_eq!(second.price, 0.25);
    assert_eq!(source.call_count(), 1);
    assert_eq!(reader.cached_pools(), 1);
}

#[tokio::test(start_paused = true)]
async fn refetches_once_ttl_expires() {
    let source = Arc::new(ScriptedSource::new());
    source.set_price(YES_POOL, sqrt_quarter());
    let reader = reader_with(source.clone(), &[ENDPOINT_A], test_config());

    assert_ok!(reader.get_price(&yes_pool(TokenSlot::Token0)).await);
    source.set_price(YES_POOL, sqrt_one());

    tokio::time::advance(Duration::from_secs(29)).await;
    let cached = assert_ok!(reader.get_price(&yes_pool(TokenSlot::Token0)).await);
    assert_eq!(cached.price, 0.25);

    tokio::time::advance(Duration::from_secs(1)).await;
    let fresh = assert_ok!(reader.get_price(&yes_pool(TokenSlot::Token0)).await);
    assert_eq!(fresh.price, 1.0);
    assert_eq!(source.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn concurrent_reads_share_one_call() {
    let source = Arc::new(ScriptedSource::new().with_delay(Duration::from_millis(100)));
    source.set_price(YES_POOL, sqrt_quarter());
    let reader = reader_with(source.clone(), &[ENDPOINT_A, ENDPOINT_B], test_config());

    let pool = yes_pool(TokenSlot::Token0);
    let results = join_all((0..5).map(|_| reader.get_price(&pool))).await;

    for result in results {
        assert_eq!(assert_ok!(result).price, 0.25);
    }
    assert_eq!(source.call_count(), 1);
    assert_eq!(reader.in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn concurrent_reads_share_one_failure() {
    let source = Arc::new(ScriptedSource::new().with_delay(Duration::from_millis(50)));
    source.set_price(YES_POOL, sqrt_quarter());
    source.fail(ENDPOINT_A, "execution reverted");
    let reader = reader_with(source.clone(), &[ENDPOINT_A], test_config());

    let pool = yes_pool(TokenSlot::Token0);
    let results = join_all((0..3).map(|_| reader.get_price(&pool))).await;

    for result in results {
        assert!(matches!(result, Err(FeedError::Contract { .. })));
    }
    assert_eq!(source.call_count(), 1);
    assert_eq!(reader.in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn abandoned_read_releases_its_in_flight_entry() {
    let source = Arc::new(ScriptedSource::new().with_delay(Duration::from_millis(100)));
    source.set_price(YES_POOL, sqrt_quarter());
    let reader = reader_with(source.clone(), &[ENDPOINT_A], test_config());
    let pool = yes_pool(TokenSlot::Token0);

    let abandoned = tokio::time::timeout(Duration::from_millis(10), reader.get_price(&pool)).await;
    assert_err!(abandoned);
    assert_eq!(source.call_count(), 1);
    assert_eq!(reader.in_flight(), 0);

    // a later read starts over instead of joining the dropped one
    let reading = assert_ok!(reader.get_price(&pool).await);
    assert_eq!(reading.price, 0.25);
    assert_eq!(source.call_count(), 2);
    assert_eq!(reader.in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn orientation_is_applied_per_call_on_shared_cache() {
    let source = Arc::new(ScriptedSource::new());
    source.set_price(YES_POOL, sqrt_quarter());
    let reader = reader_with(source.clone(), &[ENDPOINT_A], test_config());

    let direct = assert_ok!(reader.get_price(&yes_pool(TokenSlot::Token0)).await);
    let inverted = assert_ok!(reader.get_price(&yes_pool(TokenSlot::Token1)).await);

    assert_eq!(direct.price, 0.25);
    assert_eq!(inverted.price, 4.0);
    assert_eq!(source.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn throttled_endpoint_is_not_retried_during_cooldown() {
    let source = Arc::new(ScriptedSource::new());
    source.set_price(YES_POOL, sqrt_quarter());
    source.fail(ENDPOINT_A, "HTTP error 429 with body: Too Many Requests");
    let reader = reader_with(source.clone(), &[ENDPOINT_A, ENDPOINT_B], test_config());
    let pool = yes_pool(TokenSlot::Token0);

    assert_ok!(reader.get_price(&pool).await);
    assert_eq!(source.calls(), vec![ENDPOINT_A, ENDPOINT_B]);
    source.recover(ENDPOINT_A);

    // B keeps failing softly, which moves the cursor back toward A each time
    source.fail(ENDPOINT_B, "server returned an error response: internal error");
    for secs in [5, 10, 14] {
        tokio::time::advance(Duration::from_secs(secs)).await;
        reader.invalidate(YES_POOL);
        let _ = reader.get_price(&pool).await;
    }
    assert!(
        source.calls()[1..].iter().all(|url| url == ENDPOINT_B),
        "A was called while cooling down: {:?}",
        source.calls()
    );

    // 29s elapsed so far
    tokio::time::advance(Duration::from_secs(1)).await;
    reader.invalidate(YES_POOL);
    assert_ok!(reader.get_price(&pool).await);
    assert_eq!(source.calls().last().map(String::as_str), Some(ENDPOINT_A));

    let health = reader.endpoint_health();
    assert!(health.iter().all(|ep| !ep.cooling_down));
}

#[tokio::test(start_paused = true)]
async fn all_throttled_forces_least_recently_tried() {
    let source = Arc::new(ScriptedSource::new());
    source.set_price(YES_POOL, sqrt_quarter());
    source.fail(ENDPOINT_A, "429 Too Many Requests");
    source.fail(ENDPOINT_B, "error sending request for url");
    let reader = reader_with(source.clone(), &[ENDPOINT_A, ENDPOINT_B], test_config());

    let err = assert_err!(reader.get_price(&yes_pool(TokenSlot::Token0)).await);

    assert_eq!(source.calls(), vec![ENDPOINT_A, ENDPOINT_B, ENDPOINT_A]);
    match err {
        FeedError::Throttled { endpoint, cooldown, .. } => {
            assert_eq!(endpoint, ENDPOINT_A);
            assert_eq!(cooldown, Duration::from_secs(30));
        }
        other => panic!("expected Throttled, got {:?}", other),
    }
    assert!(err_is_not_cached(&reader));
}

fn err_is_not_cached(reader: &PoolPriceReader) -> bool {
    reader.cached_price(YES_POOL).is_none() && reader.in_flight() == 0
}

#[tokio::test(start_paused = true)]
async fn soft_rpc_errors_advance_without_cooldown() {
    let source = Arc::new(ScriptedSource::new());
    source.set_price(YES_POOL, sqrt_quarter());
    source.fail(ENDPOINT_A, "server returned an error response: internal error");
    let reader = reader_with(source.clone(), &[ENDPOINT_A, ENDPOINT_B], test_config());

    assert_ok!(reader.get_price(&yes_pool(TokenSlot::Token0)).await);
    assert_eq!(source.calls(), vec![ENDPOINT_A, ENDPOINT_B]);

    let health = reader.endpoint_health();
    assert!(!health[0].cooling_down);
    assert_eq!(health[0].consecutive_failures, 1);
    assert_eq!(health[1].consecutive_failures, 0);
}

#[tokio::test(start_paused = true)]
async fn pool_address_digits_do_not_trigger_cooldown() {
    let source = Arc::new(ScriptedSource::new().with_call_context());
    source.set_price(DIGIT_POOL, sqrt_quarter());
    source.fail(ENDPOINT_A, "server returned an error response: error code -32000: header not found");
    let reader = reader_with(source.clone(), &[ENDPOINT_A, ENDPOINT_B], test_config());

    let reading = assert_ok!(reader.get_price(&PoolConfig::new(DIGIT_POOL, TokenSlot::Token0)).await);
    assert_eq!(reading.price, 0.25);
    assert_eq!(source.calls(), vec![ENDPOINT_A, ENDPOINT_B]);

    let health = reader.endpoint_health();
    assert!(!health[0].cooling_down);
    assert_eq!(health[0].consecutive_failures, 1);
}

#[tokio::test(start_paused = true)]
async fn wrapped_rate_limit_still_parks_endpoint() {
    let source = Arc::new(ScriptedSource::new().with_call_context());
    source.set_price(DIGIT_POOL, sqrt_quarter());
    source.fail(ENDPOINT_A, "HTTP error 429 with body: Too Many Requests");
    let reader = reader_with(source.clone(), &[ENDPOINT_A, ENDPOINT_B], test_config());

    assert_ok!(reader.get_price(&PoolConfig::new(DIGIT_POOL, TokenSlot::Token0)).await);

    let health = reader.endpoint_health();
    assert!(health[0].cooling_down);
    assert_eq!(health[0].cooldown_remaining, Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn revert_fails_without_trying_other_endpoints() {
    let source = Arc::new(ScriptedSource::new());
    source.fail(ENDPOINT_A, "server returned an error response: execution reverted");
    let reader = reader_with(source.clone(), &[ENDPOINT_A, ENDPOINT_B], test_config());

    let err = assert_err!(reader.get_price(&yes_pool(TokenSlot::Token0)).await);

    assert!(matches!(err, FeedError::Contract { contract, .. } if contract == YES_POOL));
    assert_eq!(source.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn zero_sqrt_price_is_a_parse_error_and_not_cached() {
    let source = Arc::new(ScriptedSource::new());
    source.set_price(YES_POOL, alloy::primitives::U256::ZERO);
    let reader = reader_with(source.clone(), &[ENDPOINT_A], test_config());

    let err = assert_err!(reader.get_price(&yes_pool(TokenSlot::Token0)).await);
    assert!(matches!(err, FeedError::DataParsing { .. }));

    source.set_price(YES_POOL, sqrt_quarter());
    let reading = assert_ok!(reader.get_price(&yes_pool(TokenSlot::Token0)).await);
    assert_eq!(reading.price, 0.25);
    assert_eq!(source.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn stale_reading_served_when_refresh_fails() {
    let source = Arc::new(ScriptedSource::new());
    source.set_price(YES_POOL, sqrt_quarter());
    let reader = reader_with(source.clone(), &[ENDPOINT_A], test_config());
    let pool = yes_pool(TokenSlot::Token1);

    assert_ok!(reader.get_price(&pool).await);
    tokio::time::advance(Duration::from_secs(31)).await;
    source.fail(ENDPOINT_A, "connection reset by peer");

    assert_err!(reader.get_price(&pool).await);
    let stale = assert_ok!(reader.get_price_or_stale(&pool).await);
    assert!(stale.stale);
    assert_eq!(stale.price, 4.0);
}

#[tokio::test(start_paused = true)]
async fn stale_fallback_without_history_propagates_error() {
    let source = Arc::new(ScriptedSource::new());
    source.fail(ENDPOINT_A, "connection refused");
    let reader = reader_with(source.clone(), &[ENDPOINT_A], test_config());

    let err = assert_err!(reader.get_price_or_stale(&yes_pool(TokenSlot::Token0)).await);
    assert!(err.is_throttle());
}

#[tokio::test(start_paused = true)]
async fn pool_tokens_are_fetched_once() {
    let source = Arc::new(ScriptedSource::new());
    source.set_tokens(YES_POOL, COMPANY, CURRENCY);
    let reader = reader_with(source.clone(), &[ENDPOINT_A], test_config());

    let first = assert_ok!(reader.pool_tokens(YES_POOL).await);
    let second = assert_ok!(reader.pool_tokens(YES_POOL).await);

    assert_eq!(first, second);
    assert_eq!(first.token0, COMPANY);
    assert_eq!(source.token_calls(), 1);
}

#[tokio::test]
async fn no_endpoints_is_reported() {
    let source = Arc::new(ScriptedSource::new());
    source.set_price(YES_POOL, sqrt_quarter());
    let reader = reader_with(source.clone(), &[], test_config());

    let err = assert_err!(reader.get_price(&yes_pool(TokenSlot::Token0)).await);
    assert_eq!(err, FeedError::NoEndpoints);
    assert_eq!(source.call_count(), 0);
}
