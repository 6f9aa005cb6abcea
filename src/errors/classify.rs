//! Failure classification for RPC reads

use alloy::rpc::json_rpc::RpcError;
use alloy::transports::TransportError;
use super::FeedError;

/// Coarse failure classes used to pick a recovery action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Rate limits, CORS rejections and transport-level failures.
    RateLimit,
    /// Reverts and undecodable return data. Every endpoint would answer the same.
    Contract,
    /// Anything else the endpoint reported.
    Rpc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Park the endpoint for a cooldown window, then try the next one.
    Cooldown,
    /// Try the next endpoint without penalising this one.
    Advance,
    /// Stop retrying and surface the error.
    Fail,
}

const RATE_LIMIT_MARKERS: &[&str] = &[
    "http error 429",
    "status 429",
    "status code 429",
    "429 too many requests",
    "rate limit",
    "ratelimit",
    "rate-limit",
    "too many requests",
    "cors",
    "network",
    "fetch",
    "connection",
    "timed out",
    "timeout",
    "error sending request",
    "dns error",
];

const CONTRACT_MARKERS: &[&str] = &[
    "execution reverted",
    "revert",
    "failed to decode",
    "abi decode",
    "invalid opcode",
];

impl ErrorClass {
    pub fn recovery_action(self) -> RecoveryAction {
        match self {
            ErrorClass::RateLimit => RecoveryAction::Cooldown,
            ErrorClass::Rpc => RecoveryAction::Advance,
            ErrorClass::Contract => RecoveryAction::Fail,
        }
    }
}

/// Classify a single error message, case-insensitively.
///
/// Pass the innermost message only: context layers carry addresses, and hex
/// digits must never be read as status codes.
pub fn classify_message(message: &str) -> ErrorClass {
    let lowered = message.to_ascii_lowercase();

    if CONTRACT_MARKERS.iter().any(|m| lowered.contains(m)) {
        return ErrorClass::Contract;
    }
    if RATE_LIMIT_MARKERS.iter().any(|m| lowered.contains(m)) {
        return ErrorClass::RateLimit;
    }
    ErrorClass::Rpc
}

/// Classify a JSON-RPC transport failure by its variant.
pub fn classify_transport(error: &TransportError) -> ErrorClass {
    match error {
        RpcError::Transport(_) => ErrorClass::RateLimit,
        RpcError::ErrorResp(payload) if payload.code == 429 => ErrorClass::RateLimit,
        RpcError::ErrorResp(payload) => classify_message(&payload.message),
        _ => ErrorClass::Rpc,
    }
}

/// Classify a source failure: typed alloy errors first, then context layers
/// for contract markers, then the root cause for everything else.
pub fn classify_source_error(error: &anyhow::Error) -> ErrorClass {
    for cause in error.chain() {
        if let Some(transport) = cause.downcast_ref::<TransportError>() {
            return classify_transport(transport);
        }
        if cause.downcast_ref::<alloy::sol_types::Error>().is_some() {
            return ErrorClass::Contract;
        }
    }

    let contract_layer = error.chain().any(|cause| {
        let lowered = cause.to_string().to_ascii_lowercase();
        CONTRACT_MARKERS.iter().any(|m| lowered.contains(m))
    });
    if contract_layer {
        return ErrorClass::Contract;
    }

    classify_message(&error.root_cause().to_string())
}

pub fn classify_error(error: &FeedError) -> ErrorClass {
    match error {
        FeedError::Throttled { .. } => ErrorClass::RateLimit,
        FeedError::Network { .. } => ErrorClass::RateLimit,
        FeedError::Api { status: 429, .. } => ErrorClass::RateLimit,
        FeedError::Contract { .. } | FeedError::DataParsing { .. } => ErrorClass::Contract,
        FeedError::Rpc { message, .. } => classify_message(message),
        FeedError::Api { .. }
        | FeedError::NoEndpoints
        | FeedError::InvalidParams { .. }
        | FeedError::UnsupportedOperation(_) => ErrorClass::Rpc,
    }
}
