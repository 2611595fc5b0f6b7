//! Market data types for every snapshot domain.
//!
//! Fetch results carry their own validity flag and error text instead of
//! being wrapped in `Result`: a broken exchange produces invalid entries,
//! never a missing one.

use std::collections::HashMap;
use std::fmt;

use alloy::primitives::U256;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::token::{PairId, TokenId};

/// Current wall-clock time in Unix milliseconds.
pub fn now_ms() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default()
}

/// Stable exchange identifier, e.g. `"liqui"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExchangeId(String);

impl ExchangeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ExchangeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Direction of an exchange trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeType {
    Buy,
    Sell,
}

impl fmt::Display for TradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// What an exchange reports back after accepting a trade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeOutcome {
    /// Amount filled immediately.
    pub done: f64,
    /// Amount still resting on the book.
    pub remaining: f64,
    /// Whether the order is fully closed.
    pub finished: bool,
}

/// One order book level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceEntry {
    pub quantity: f64,
    pub rate: f64,
}

impl PriceEntry {
    pub fn new(quantity: f64, rate: f64) -> Self {
        Self { quantity, rate }
    }
}

/// One exchange's order book for one pair, as of one fetch cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExchangePrice {
    pub valid: bool,
    pub error: String,
    /// When the request was issued (Unix ms).
    pub timestamp: u64,
    /// When the response arrived (Unix ms).
    pub return_time: u64,
    /// Bids, best first.
    pub bids: Vec<PriceEntry>,
    /// Asks, best first.
    pub asks: Vec<PriceEntry>,
}

impl ExchangePrice {
    /// Entry for a pair whose fetch failed.
    pub fn invalid(timestamp: u64, return_time: u64, error: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: error.into(),
            timestamp,
            return_time,
            bids: Vec::new(),
            asks: Vec::new(),
        }
    }
}

/// Prices of one pair across exchanges.
pub type OnePrice = HashMap<ExchangeId, ExchangePrice>;

/// Payload of the price domain.
pub type AllPrices = HashMap<PairId, OnePrice>;

/// One exchange's account balances.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EBalanceEntry {
    pub valid: bool,
    pub error: String,
    pub timestamp: u64,
    pub return_time: u64,
    /// Available amount per token, in display units.
    pub balance: HashMap<TokenId, f64>,
}

impl EBalanceEntry {
    pub fn invalid(timestamp: u64, return_time: u64, error: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: error.into(),
            timestamp,
            return_time,
            balance: HashMap::new(),
        }
    }
}

/// Payload of the exchange-balance domain.
pub type AllEBalances = HashMap<ExchangeId, EBalanceEntry>;

/// The reserve's on-chain balance of one token, raw.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceEntry {
    pub valid: bool,
    pub error: String,
    pub timestamp: u64,
    pub return_time: u64,
    pub balance: U256,
}

/// Payload of the balance domain.
pub type AllBalances = HashMap<TokenId, BalanceEntry>;

/// On-chain rate of one pair, raw 18-decimal fixed point.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateEntry {
    pub rate: U256,
    pub expiry_block: u64,
    pub balance: U256,
}

/// Payload of the rate domain: one fetch of every pair's rate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllRates {
    pub valid: bool,
    pub error: String,
    pub timestamp: u64,
    pub return_time: u64,
    pub data: HashMap<PairId, RateEntry>,
}
