//! Feed configuration settings and environment variable handling

use std::env;
use std::time::Duration;
use crate::{
    network::CooldownPolicy,
    pools::ReaderConfig,
    types::PoolKind,
};

// Configuration constants
pub const DEFAULT_CACHE_DURATION_SECS: u64 = 30;
pub const MIN_CACHE_DURATION_SECS: u64 = 1;
pub const MAX_CACHE_DURATION_SECS: u64 = 600;

// Cooldown constants, tuned for public Gnosis RPC providers
pub const DEFAULT_COOLDOWN_BASE_SECS: u64 = 30;
pub const DEFAULT_COOLDOWN_JITTER_MIN_SECS: u64 = 1;
pub const DEFAULT_COOLDOWN_JITTER_MAX_SECS: u64 = 10;

pub const DEFAULT_MAX_RPC_ATTEMPTS: u32 = 3;
pub const MAX_RPC_ATTEMPTS: u32 = 10;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 250;

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 15;
pub const MIN_POLL_INTERVAL_SECS: u64 = 1;

pub const DEFAULT_CANDLE_INTERVAL_MS: u64 = 3_600_000;

pub const DEFAULT_RPC_URLS: &[&str] = &[
    "https://rpc.gnosischain.com",
    "https://gnosis-rpc.publicnode.com",
    "https://rpc.ankr.com/gnosis",
    "https://gnosis.drpc.org",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub network: String,
    pub rpc_urls: Vec<String>,
    // Reader tuning
    pub cache_duration_secs: u64,
    pub cooldown_base_secs: u64,
    pub cooldown_jitter_min_secs: u64,
    pub cooldown_jitter_max_secs: u64,
    pub max_rpc_attempts: u32,
    pub retry_delay_ms: u64,
    pub serve_stale_on_error: bool,
    // Monitor loop
    pub poll_interval_secs: u64,
    pub pool_kind: PoolKind,
    pub yes_pool_address: Option<String>,
    pub no_pool_address: Option<String>,
    pub company_token_yes: Option<String>,
    pub company_token_no: Option<String>,
    pub proposal_id: Option<String>,
    // Supabase
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    pub candle_interval_ms: u64,
    // Logging
    pub log_json: bool,
}

impl Config {
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup. `load` feeds it the process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let rpc_urls: Vec<String> = non_empty("RPC_URLS")
            .map(|list| {
                list.split(',')
                    .map(|u| u.trim().to_string())
                    .filter(|u| !u.is_empty())
                    .collect()
            })
            .filter(|urls: &Vec<String>| !urls.is_empty())
            .unwrap_or_else(|| DEFAULT_RPC_URLS.iter().map(|u| u.to_string()).collect());

        let jitter_min = non_empty("COOLDOWN_JITTER_MIN_SECS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_COOLDOWN_JITTER_MIN_SECS);

        Self {
            network: non_empty("NETWORK").unwrap_or_else(|| "gnosis".to_string()),
            rpc_urls,
            cache_duration_secs: non_empty("CACHE_DURATION_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_CACHE_DURATION_SECS)
                .max(MIN_CACHE_DURATION_SECS)
                .min(MAX_CACHE_DURATION_SECS),
            cooldown_base_secs: non_empty("COOLDOWN_BASE_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_COOLDOWN_BASE_SECS),
            cooldown_jitter_min_secs: jitter_min,
            cooldown_jitter_max_secs: non_empty("COOLDOWN_JITTER_MAX_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_COOLDOWN_JITTER_MAX_SECS)
                .max(jitter_min),
            max_rpc_attempts: non_empty("MAX_RPC_ATTEMPTS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_MAX_RPC_ATTEMPTS)
                .max(1)
                .min(MAX_RPC_ATTEMPTS),
            retry_delay_ms: non_empty("RETRY_DELAY_MS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_RETRY_DELAY_MS),
            serve_stale_on_error: non_empty("SERVE_STALE_ON_ERROR")
                .unwrap_or_else(|| "true".to_string())
                .parse()
                .unwrap_or(true),
            poll_interval_secs: non_empty("POLL_INTERVAL_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_POLL_INTERVAL_SECS)
                .max(MIN_POLL_INTERVAL_SECS),
            pool_kind: non_empty("POOL_KIND")
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
            yes_pool_address: non_empty("YES_POOL_ADDRESS"),
            no_pool_address: non_empty("NO_POOL_ADDRESS"),
            company_token_yes: non_empty("COMPANY_TOKEN_YES"),
            company_token_no: non_empty("COMPANY_TOKEN_NO"),
            proposal_id: non_empty("PROPOSAL_ID"),
            supabase_url: non_empty("SUPABASE_URL"),
            supabase_anon_key: non_empty("SUPABASE_ANON_KEY"),
            candle_interval_ms: non_empty("CANDLE_INTERVAL_MS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_CANDLE_INTERVAL_MS),
            log_json: non_empty("LOG_JSON")
                .unwrap_or_else(|| "false".to_string())
                .parse()
                .unwrap_or(false),
        }
    }

    pub fn cooldown_policy(&self) -> CooldownPolicy {
        CooldownPolicy {
            base: Duration::from_secs(self.cooldown_base_secs),
            jitter_min: Duration::from_secs(self.cooldown_jitter_min_secs),
            jitter_max: Duration::from_secs(self.cooldown_jitter_max_secs),
        }
    }

    pub fn reader_config(&self) -> ReaderConfig {
        ReaderConfig {
            cache_duration: Duration::from_secs(self.cache_duration_secs),
            max_attempts: self.max_rpc_attempts,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            cooldown: self.cooldown_policy(),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn supabase_enabled(&self) -> bool {
        self.supabase_url.is_some() && self.supabase_anon_key.is_some()
    }
}
