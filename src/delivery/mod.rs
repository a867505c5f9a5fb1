//! Batch delivery
//!
//! Feeds webhook bodies to a [`Reconciler`], redelivering transient failures
//! according to a [`RedeliveryPolicy`]. Sequential by default; with a
//! concurrency above one, events run through `buffer_unordered` and may
//! complete out of order.

pub mod retry;

pub use retry::{redeliver, RedeliveryPolicy, RetryDecision, RetryableError};

use crate::error::{Result, SyncError};
use crate::metrics;
use crate::reconcile::{ReconcileOutcome, Reconciler};
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// One webhook body awaiting reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Label used in logs and reports
    pub id: String,
    pub body: Vec<u8>,
}

impl Delivery {
    pub fn new(id: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            body: body.into(),
        }
    }

    /// Split raw input into deliveries
    ///
    /// A top-level JSON array is a batch, one delivery per element; anything
    /// else is a single delivery passed through untouched.
    pub fn split(raw: &[u8]) -> Result<Vec<Delivery>> {
        match serde_json::from_slice::<Value>(raw) {
            Ok(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| -> Result<Delivery> {
                    Ok(Delivery::new(format!("#{}", i), serde_json::to_vec(item)?))
                })
                .collect(),
            _ => Ok(vec![Delivery::new("#0", raw.to_vec())]),
        }
    }
}

/// Result of delivering one event
#[derive(Debug)]
pub struct DeliveryReport {
    pub id: String,
    pub result: std::result::Result<ReconcileOutcome, SyncError>,

    /// Attempts made, including the first
    pub attempts: u32,
}

impl DeliveryReport {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Drives a batch of deliveries through one reconciler
pub struct BatchDriver {
    reconciler: Arc<Reconciler>,
    policy: RedeliveryPolicy,
    concurrency: usize,
}

impl BatchDriver {
    pub fn new(reconciler: Arc<Reconciler>) -> Self {
        Self {
            reconciler,
            policy: RedeliveryPolicy::default(),
            concurrency: 1,
        }
    }

    pub fn with_policy(mut self, policy: RedeliveryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Deliver one event, redelivering on transient failure
    pub async fn deliver(&self, delivery: Delivery) -> DeliveryReport {
        let direction = self.reconciler.direction();
        let reconciler = &self.reconciler;
        let body = &delivery.body;
        let mut first = true;

        let (result, attempts) = redeliver(&self.policy, &delivery.id, move || {
            if !std::mem::take(&mut first) {
                metrics::record_redelivery(direction.as_str());
            }
            reconciler.reconcile(body)
        })
        .await;

        if let Err(ref e) = result {
            warn!(delivery = %delivery.id, attempts, "Delivery failed: {}", e);
        }

        DeliveryReport {
            id: delivery.id,
            result,
            attempts,
        }
    }

    /// Deliver every event, returning one report per delivery
    ///
    /// Reports come back in input order when sequential, in completion
    /// order otherwise.
    pub async fn run(&self, deliveries: Vec<Delivery>) -> Vec<DeliveryReport> {
        let total = deliveries.len();

        let reports: Vec<DeliveryReport> = if self.concurrency == 1 {
            let mut reports = Vec::with_capacity(total);
            for delivery in deliveries {
                reports.push(self.deliver(delivery).await);
            }
            reports
        } else {
            stream::iter(deliveries)
                .map(|delivery| self.deliver(delivery))
                .buffer_unordered(self.concurrency)
                .collect()
                .await
        };

        let failed = reports.iter().filter(|r| !r.is_ok()).count();
        info!(total, failed, "Batch delivered");
        reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_array() {
        let deliveries = Delivery::split(br#"[{"id": "a"}, {"id": "b"}]"#).unwrap();
        assert_eq!(deliveries.len(), 2);
        assert_eq!(deliveries[1].id, "#1");
        assert_eq!(deliveries[1].body, br#"{"id":"b"}"#.to_vec());
    }

    #[test]
    fn test_split_single_and_garbage() {
        let single = Delivery::split(br#"{"id": "a"}"#).unwrap();
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].body, br#"{"id": "a"}"#.to_vec());

        // Left for the reconciler to reject
        let garbage = Delivery::split(b"not json").unwrap();
        assert_eq!(garbage[0].body, b"not json".to_vec());
    }

    #[test]
    fn test_concurrency_floor() {
        use crate::integrations::DryRunClient;
        use crate::mapping::{Field, FieldMapper, FieldPaths, Schema, ServiceTable};
        use crate::store::MemoryStore;

        let mapper = FieldMapper::new(
            Schema::inbound("ServiceNow", &ServiceTable::builtin()),
            &FieldPaths::new().with(Field::LocalId, "id"),
        )
        .unwrap();
        let reconciler = Reconciler::new(
            mapper,
            Arc::new(MemoryStore::new()),
            Arc::new(DryRunClient::new("service_desk")),
        );
        let driver = BatchDriver::new(Arc::new(reconciler)).with_concurrency(0);
        assert_eq!(driver.concurrency, 1);
    }
}
