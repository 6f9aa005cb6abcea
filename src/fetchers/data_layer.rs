//! Operation dispatch table

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;
use super::{FetchResponse, Fetcher, OperationKind};

#[derive(Default)]
pub struct DataLayer {
    handlers: HashMap<OperationKind, Arc<dyn Fetcher>>,
}

impl DataLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route every operation the fetcher declares to it. A later registration
    /// for the same operation replaces the earlier one.
    pub fn register(&mut self, fetcher: Arc<dyn Fetcher>) -> &mut Self {
        for &op in fetcher.operations() {
            if let Some(previous) = self.handlers.insert(op, fetcher.clone()) {
                warn!(
                    "Operation {} moved from fetcher '{}' to '{}'",
                    op,
                    previous.name(),
                    fetcher.name()
                );
            }
        }
        info!("🔌 Registered fetcher '{}' for {:?}", fetcher.name(), fetcher.operations());
        self
    }

    pub fn handles(&self, operation: OperationKind) -> bool {
        self.handlers.contains_key(&operation)
    }

    pub fn missing_operations(&self) -> Vec<OperationKind> {
        OperationKind::ALL
            .into_iter()
            .filter(|op| !self.handlers.contains_key(op))
            .collect()
    }

    pub async fn fetch(&self, operation: OperationKind, params: &Value) -> FetchResponse {
        let Some(fetcher) = self.handlers.get(&operation) else {
            warn!("No fetcher registered for {}", operation);
            return FetchResponse::Error {
                reason: format!("No fetcher registered for operation '{}'", operation),
            };
        };

        let request_id = Uuid::new_v4();
        let started = Instant::now();
        debug!(%request_id, %operation, fetcher = fetcher.name(), "Dispatching fetch");

        let response: FetchResponse = fetcher.fetch(operation, params).await.into();

        match &response {
            FetchResponse::Success { .. } => {
                debug!(%request_id, %operation, elapsed_ms = started.elapsed().as_millis() as u64, "Fetch succeeded");
            }
            FetchResponse::Error { reason } => {
                warn!(%request_id, %operation, %reason, "Fetch failed");
            }
        }
        response
    }

    /// String-keyed entry point for callers holding an operation name.
    pub async fn fetch_named(&self, operation: &str, params: &Value) -> FetchResponse {
        match operation.parse::<OperationKind>() {
            Ok(op) => self.fetch(op, params).await,
            Err(e) => FetchResponse::Error { reason: e.to_string() },
        }
    }
}
