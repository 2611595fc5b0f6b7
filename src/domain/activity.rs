//! Audit trail entries for orchestrated operations.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::market::now_ms;

/// Operation kinds that produce an audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Trade,
    Deposit,
    Withdraw,
    SetRates,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Trade => "trade",
            Self::Deposit => "deposit",
            Self::Withdraw => "withdraw",
            Self::SetRates => "set_rates",
        };
        f.write_str(s)
    }
}

/// One immutable audit entry: what was asked and what came back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: Uuid,
    pub action: Action,
    /// Operation inputs.
    pub params: Value,
    /// Operation outputs, always including an `error` key (`null` on success).
    pub result: Value,
    /// Creation time (Unix ms).
    pub timestamp: u64,
}

impl ActivityRecord {
    pub fn new(action: Action, params: Value, result: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            action,
            params,
            result,
            timestamp: now_ms(),
        }
    }

    /// The recorded error text, if the operation failed.
    pub fn error(&self) -> Option<&str> {
        self.result.get("error").and_then(Value::as_str)
    }
}
