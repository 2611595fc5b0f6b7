//! In-memory activity log.
//!
//! Appends synchronously under a short mutex; suitable for tests and
//! for deployments that ship records elsewhere via `get_all_records`.

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::domain::activity::{Action, ActivityRecord};
use crate::ports::activity::ActivityLog;

#[derive(Default)]
pub struct RamActivityLog {
    records: Mutex<Vec<ActivityRecord>>,
}

impl RamActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[async_trait]
impl ActivityLog for RamActivityLog {
    fn record(&self, action: Action, params: Value, result: Value) {
        self.records
            .lock()
            .push(ActivityRecord::new(action, params, result));
    }

    async fn get_all_records(&self) -> Result<Vec<ActivityRecord>> {
        Ok(self.records.lock().clone())
    }
}
