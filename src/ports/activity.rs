//! Activity Port - Audit Trail Interface
//!
//! Every orchestrated write operation appends exactly one record here,
//! whether it succeeded or not. Appends are fire-and-forget from the
//! caller's point of view; the implementation decides whether the
//! actual write happens inline or on a background task, but it must
//! never silently drop a record.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::activity::{Action, ActivityRecord};

/// Append-only store of audit records.
#[async_trait]
pub trait ActivityLog: Send + Sync + 'static {
  /// Append a record for `action` without waiting for it to be persisted.
  fn record(&self, action: Action, params: Value, result: Value);

  /// Full history, oldest first.
  ///
  /// Unbounded: callers that keep the process running for a long time
  /// are expected to rotate the underlying storage externally.
  async fn get_all_records(&self) -> anyhow::Result<Vec<ActivityRecord>>;
}
