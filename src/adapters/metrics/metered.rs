//! Activity log decorator that counts operations by outcome.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::domain::activity::{Action, ActivityRecord};
use crate::ports::activity::ActivityLog;

use super::prometheus::MetricsRegistry;

/// Wraps any `ActivityLog`, bumping `reserve_operations_total` on every
/// record before forwarding it.
pub struct MeteredActivityLog<L> {
    inner: L,
    metrics: Arc<MetricsRegistry>,
}

impl<L: ActivityLog> MeteredActivityLog<L> {
    pub fn new(inner: L, metrics: Arc<MetricsRegistry>) -> Self {
        Self { inner, metrics }
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }
}

#[async_trait]
impl<L: ActivityLog> ActivityLog for MeteredActivityLog<L> {
    fn record(&self, action: Action, params: Value, result: Value) {
        let outcome = match result.get("error") {
            None | Some(Value::Null) => "ok",
            Some(_) => "error",
        };
        self.metrics
            .operations_total
            .with_label_values(&[&action.to_string(), outcome])
            .inc();
        self.inner.record(action, params, result);
    }

    async fn get_all_records(&self) -> Result<Vec<ActivityRecord>> {
        self.inner.get_all_records().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::activity::RamActivityLog;
    use serde_json::json;

    #[tokio::test]
    async fn test_counts_and_forwards() {
        let metrics = Arc::new(MetricsRegistry::new().unwrap());
        let log = MeteredActivityLog::new(RamActivityLog::new(), Arc::clone(&metrics));

        log.record(Action::Deposit, json!({}), json!({ "tx": "0x1", "error": null }));
        log.record(Action::Deposit, json!({}), json!({ "tx": null, "error": "boom" }));
        log.record(Action::Withdraw, json!({}), json!({ "error": null }));

        let ops = &metrics.operations_total;
        assert_eq!(ops.with_label_values(&["deposit", "ok"]).get(), 1);
        assert_eq!(ops.with_label_values(&["deposit", "error"]).get(), 1);
        assert_eq!(ops.with_label_values(&["withdraw", "ok"]).get(), 1);
        assert_eq!(log.get_all_records().await.unwrap().len(), 3);
        assert_eq!(log.inner().len(), 3);
    }
}
