//! Blockchain Port - On-chain Reserve Interface
//!
//! Sends funds out of the reserve wallet, publishes conversion rates
//! and reads the reserve's token balances.

use std::collections::HashMap;

use alloy::primitives::{Address, TxHash, U256};
use async_trait::async_trait;

use crate::domain::error::ChainError;
use crate::domain::market::BalanceEntry;
use crate::domain::token::{Token, TokenId};

/// Capabilities of the blockchain adapter.
#[async_trait]
pub trait Blockchain: Send + Sync + 'static {
  /// Transfer raw `amount` of `token` from the reserve to `destination`.
  ///
  /// # Errors
  /// `ChainError` if the transaction could not be submitted.
  async fn send(
    &self,
    token: &Token,
    amount: U256,
    destination: Address,
  ) -> Result<TxHash, ChainError>;

  /// Publish conversion rates for `sources[i] -> dests[i]`.
  ///
  /// # Errors
  /// `ChainError::LengthMismatch` if the four slices differ in length;
  /// this is checked before any RPC call. `ChainError::Submission` if
  /// the transaction is refused.
  async fn set_rates(
    &self,
    sources: &[Address],
    dests: &[Address],
    rates: &[U256],
    expiry_blocks: &[u64],
  ) -> Result<TxHash, ChainError>;

  /// Reserve balance of every token in `tokens`; a token whose lookup
  /// fails is present with `valid = false`.
  async fn fetch_balance_data(&self, tokens: &[Token]) -> HashMap<TokenId, BalanceEntry>;
}

/// Shared length check for `set_rates` inputs.
pub fn check_rate_lengths(
  sources: usize,
  dests: usize,
  rates: usize,
  expiry_blocks: usize,
) -> Result<(), ChainError> {
  if sources == dests && sources == rates && sources == expiry_blocks {
    Ok(())
  } else {
    Err(ChainError::LengthMismatch {
      sources,
      dests,
      rates,
      expiry_blocks,
    })
  }
}
