//! Liqui API Request/Response Types
//!
//! Wire types for the Liqui public (`/api/3`) and trading (`/tapi`)
//! endpoints. Private calls share the `{success, return, error}`
//! envelope.

use std::collections::HashMap;

use serde::Deserialize;

use crate::domain::error::ExchangeError;

/// One pair's book: `[rate, amount]` levels, best first.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PairDepth {
  #[serde(default)]
  pub asks: Vec<[f64; 2]>,
  #[serde(default)]
  pub bids: Vec<[f64; 2]>,
}

/// Depth response keyed by Liqui pair name (`omg_eth`).
pub type DepthResponse = HashMap<String, PairDepth>;

/// Envelope of every trading API response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
  pub success: i32,
  #[serde(rename = "return")]
  pub data: Option<T>,
  #[serde(default)]
  pub error: String,
}

impl<T> ApiResponse<T> {
  /// Unwrap the payload, turning `success != 1` into a rejection.
  pub fn into_result(self) -> Result<T, ExchangeError> {
    match (self.success, self.data) {
      (1, Some(data)) => Ok(data),
      (1, None) => Err(ExchangeError::Decode("missing return payload".into())),
      _ => Err(ExchangeError::Rejected(self.error)),
    }
  }
}

/// `getInfo` payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InfoReturn {
  /// Available funds keyed by lowercase coin name.
  #[serde(default)]
  pub funds: HashMap<String, f64>,
}

/// `Trade` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct TradeReturn {
  pub received: f64,
  pub remains: f64,
  #[serde(default)]
  pub order_id: u64,
}

/// `WithdrawCoin` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct WithdrawReturn {
  #[serde(rename = "tId", default)]
  pub transaction_id: u64,
}
