//! Reserve Core Use Case - Audited Write Operations
//!
//! Executes trades, deposits, withdrawals and rate updates against the
//! exchange and blockchain ports. Every invocation ends in exactly one
//! activity record, successful or not, and precondition failures never
//! reach an adapter.

use std::sync::Arc;

use alloy::primitives::{Address, TxHash, U256};
use anyhow::Result;
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use crate::domain::activity::{Action, ActivityRecord};
use crate::domain::error::CoreError;
use crate::domain::market::{TradeOutcome, TradeType};
use crate::domain::token::{PairId, Token};
use crate::ports::activity::ActivityLog;
use crate::ports::blockchain::{check_rate_lengths, Blockchain};
use crate::ports::exchange::Exchange;

/// Orchestrates reserve write operations and their audit trail.
///
/// Holds shared references only; adapters and the log are owned by the
/// wiring layer.
pub struct ReserveCore<B: Blockchain, A: ActivityLog> {
  blockchain: Arc<B>,
  activity: Arc<A>,
  /// Fixed destination of exchange withdrawals.
  reserve_manager: Address,
}

impl<B: Blockchain, A: ActivityLog> ReserveCore<B, A> {
  pub fn new(blockchain: Arc<B>, activity: Arc<A>, reserve_manager: Address) -> Self {
    Self {
      blockchain,
      activity,
      reserve_manager,
    }
  }

  pub fn reserve_manager(&self) -> Address {
    self.reserve_manager
  }

  /// Place a limit order on `exchange`.
  #[instrument(
    skip(self, exchange, base, quote),
    fields(exchange = %exchange.id(), pair = %PairId::new(&base.id, &quote.id))
  )]
  pub async fn trade(
    &self,
    exchange: &dyn Exchange,
    trade_type: TradeType,
    base: &Token,
    quote: &Token,
    rate: f64,
    amount: f64,
  ) -> Result<TradeOutcome, CoreError> {
    let params = json!({
      "exchange": exchange.id(),
      "type": trade_type,
      "base": base.id,
      "quote": quote.id,
      "rate": rate,
      "amount": amount,
    });

    let outcome = exchange
      .trade(trade_type, base, quote, rate, amount)
      .await
      .map_err(CoreError::from);

    let result = match &outcome {
      Ok(o) => json!({
        "done": o.done,
        "remaining": o.remaining,
        "finished": o.finished,
        "error": Value::Null,
      }),
      Err(e) => json!({
        "done": 0.0,
        "remaining": 0.0,
        "finished": false,
        "error": e.to_string(),
      }),
    };

    self.audit(Action::Trade, params, result, &outcome);
    outcome
  }

  /// Move `amount` of `token` from the reserve wallet to the exchange's
  /// deposit address.
  #[instrument(skip(self, exchange, token), fields(exchange = %exchange.id(), token = %token.id))]
  pub async fn deposit(
    &self,
    exchange: &dyn Exchange,
    token: &Token,
    amount: U256,
  ) -> Result<TxHash, CoreError> {
    let params = json!({
      "exchange": exchange.id(),
      "token": token.id,
      "amount": amount.to_string(),
    });

    let outcome = match exchange.address(token) {
      Some(address) => self
        .blockchain
        .send(token, amount, address)
        .await
        .map_err(CoreError::from),
      None => Err(CoreError::UnsupportedToken {
        exchange: exchange.id(),
        token: token.id.clone(),
      }),
    };

    let result = tx_result(&outcome);
    self.audit(Action::Deposit, params, result, &outcome);
    outcome
  }

  /// Withdraw `amount` of `token` from the exchange back to the reserve
  /// manager address.
  #[instrument(skip(self, exchange, token), fields(exchange = %exchange.id(), token = %token.id))]
  pub async fn withdraw(
    &self,
    exchange: &dyn Exchange,
    token: &Token,
    amount: U256,
  ) -> Result<(), CoreError> {
    let params = json!({
      "exchange": exchange.id(),
      "token": token.id,
      "amount": amount.to_string(),
    });

    let outcome = if exchange.address(token).is_some() {
      exchange
        .withdraw(token, amount, self.reserve_manager)
        .await
        .map_err(CoreError::from)
    } else {
      Err(CoreError::UnsupportedToken {
        exchange: exchange.id(),
        token: token.id.clone(),
      })
    };

    let result = json!({
      "error": outcome.as_ref().err().map(ToString::to_string),
    });
    self.audit(Action::Withdraw, params, result, &outcome);
    outcome
  }

  /// Publish conversion rates `sources[i] -> dests[i]` on chain.
  ///
  /// Rates are raw 18-decimal fixed point and are audited as exact
  /// decimal strings.
  #[instrument(skip_all, fields(pairs = sources.len()))]
  pub async fn set_rates(
    &self,
    sources: &[Token],
    dests: &[Token],
    rates: &[U256],
    expiry_blocks: &[u64],
  ) -> Result<TxHash, CoreError> {
    let params = json!({
      "sources": sources.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(),
      "dests": dests.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(),
      "rates": rates.iter().map(ToString::to_string).collect::<Vec<_>>(),
      "expiry_blocks": expiry_blocks,
    });

    let outcome = match check_rate_lengths(
      sources.len(),
      dests.len(),
      rates.len(),
      expiry_blocks.len(),
    ) {
      Ok(()) => {
        let source_addrs: Vec<Address> = sources.iter().map(|t| t.address).collect();
        let dest_addrs: Vec<Address> = dests.iter().map(|t| t.address).collect();
        self
          .blockchain
          .set_rates(&source_addrs, &dest_addrs, rates, expiry_blocks)
          .await
          .map_err(CoreError::from)
      }
      Err(_) => Err(CoreError::LengthMismatch {
        sources: sources.len(),
        dests: dests.len(),
        rates: rates.len(),
        expiry_blocks: expiry_blocks.len(),
      }),
    };

    let result = tx_result(&outcome);
    self.audit(Action::SetRates, params, result, &outcome);
    outcome
  }

  /// Full audit history, oldest first.
  pub async fn get_records(&self) -> Result<Vec<ActivityRecord>> {
    self.activity.get_all_records().await
  }

  fn audit<T>(
    &self,
    action: Action,
    params: Value,
    result: Value,
    outcome: &Result<T, CoreError>,
  ) {
    match outcome {
      Ok(_) => info!(%action, "Operation completed"),
      Err(e) if e.is_precondition() => warn!(%action, error = %e, "Operation refused"),
      Err(e) => warn!(%action, error = %e, "Operation failed"),
    }
    self.activity.record(action, params, result);
  }
}

fn tx_result(outcome: &Result<TxHash, CoreError>) -> Value {
  json!({
    "tx": outcome.as_ref().ok().map(ToString::to_string),
    "error": outcome.as_ref().err().map(ToString::to_string),
  })
}
