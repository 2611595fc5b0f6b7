//! Exchange Port - Centralized Exchange Capability Interface
//!
//! One implementation per exchange. The orchestrator and the fetcher
//! depend only on this trait, so exchanges can be swapped or mocked
//! freely.
//!
//! Key contract: the fetch methods are infallible. A transport or API
//! failure is folded into the returned data as `valid = false` plus the
//! error text, and every configured pair is still present. One broken
//! exchange therefore degrades a fetch cycle instead of aborting it.

use std::collections::HashMap;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;

use crate::domain::error::ExchangeError;
use crate::domain::market::{EBalanceEntry, ExchangeId, ExchangePrice, TradeOutcome, TradeType};
use crate::domain::token::{PairId, Token, TokenPair};

/// Capabilities every exchange adapter provides.
///
/// Implementations must be safe to share across tasks; the core never
/// mutates adapter state.
#[async_trait]
pub trait Exchange: Send + Sync + 'static {
  /// Stable identifier of this exchange.
  fn id(&self) -> ExchangeId;

  /// Deposit address of `token` on this exchange.
  ///
  /// `None` means the token is not supported and nothing should be
  /// attempted against the exchange for it.
  fn address(&self, token: &Token) -> Option<Address>;

  /// Pairs this exchange is configured to quote.
  fn token_pairs(&self) -> Vec<TokenPair>;

  /// Place a limit order of `amount` base units at `rate`.
  ///
  /// # Errors
  /// `ExchangeError` on rejection or transport failure.
  async fn trade(
    &self,
    trade_type: TradeType,
    base: &Token,
    quote: &Token,
    rate: f64,
    amount: f64,
  ) -> Result<TradeOutcome, ExchangeError>;

  /// Withdraw raw `amount` of `token` to `destination`.
  ///
  /// # Errors
  /// `ExchangeError` if the token is unsupported or the exchange refuses.
  async fn withdraw(
    &self,
    token: &Token,
    amount: U256,
    destination: Address,
  ) -> Result<(), ExchangeError>;

  /// Order books of every configured pair, one entry per pair, always.
  async fn fetch_price_data(&self) -> HashMap<PairId, ExchangePrice>;

  /// Account balances, marked invalid on failure.
  async fn fetch_ebalance_data(&self) -> EBalanceEntry;
}
