//! Reserve Data Use Case - Versioned Read Envelopes
//!
//! Serves point-in-time reads of the four data domains. Each read takes
//! the current snapshot in one store call and wraps it with its version
//! and the request/return timestamps. Raw fixed-point balances and rates
//! are converted to floats here, on the way out, and nowhere else.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, instrument};

use crate::domain::error::DataError;
use crate::domain::market::{
  now_ms, AllBalances, AllEBalances, AllPrices, AllRates, OnePrice,
};
use crate::domain::token::{big_to_float, PairId, TokenId, TokenRegistry, RATE_DECIMALS};
use crate::ports::storage::{SnapshotStore, Version};

/// Uniform read envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataResponse<T> {
  pub version: Version,
  /// When the read started (Unix ms).
  pub timestamp: u64,
  /// When the snapshot was in hand (Unix ms).
  pub return_time: u64,
  pub data: T,
}

/// On-chain balance of one token in display units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceResponse {
  pub valid: bool,
  pub error: String,
  pub timestamp: u64,
  pub return_time: u64,
  pub balance: f64,
}

/// Rate of one pair in display units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateResponse {
  pub valid: bool,
  pub error: String,
  pub timestamp: u64,
  pub return_time: u64,
  pub rate: f64,
  pub expiry_block: u64,
  pub balance: f64,
}

/// One store per data domain, each versioned independently.
#[derive(Clone)]
pub struct DataStores {
  pub prices: Arc<dyn SnapshotStore<AllPrices>>,
  pub ebalances: Arc<dyn SnapshotStore<AllEBalances>>,
  pub balances: Arc<dyn SnapshotStore<AllBalances>>,
  pub rates: Arc<dyn SnapshotStore<AllRates>>,
}

/// Read-side orchestrator over the snapshot stores.
pub struct ReserveData {
  stores: DataStores,
  tokens: Arc<TokenRegistry>,
}

impl ReserveData {
  pub fn new(stores: DataStores, tokens: Arc<TokenRegistry>) -> Self {
    Self { stores, tokens }
  }

  pub fn current_price_version(&self) -> Result<Version, DataError> {
    Ok(self.stores.prices.current_version()?)
  }

  pub fn current_ebalance_version(&self) -> Result<Version, DataError> {
    Ok(self.stores.ebalances.current_version()?)
  }

  pub fn current_balance_version(&self) -> Result<Version, DataError> {
    Ok(self.stores.balances.current_version()?)
  }

  pub fn current_rate_version(&self) -> Result<Version, DataError> {
    Ok(self.stores.rates.current_version()?)
  }

  /// Every pair's prices across every exchange.
  #[instrument(skip(self))]
  pub fn get_all_prices(&self) -> Result<DataResponse<AllPrices>, DataError> {
    envelope(self.stores.prices.as_ref(), |data| Ok(data.clone()))
  }

  /// Prices of one `BASE-QUOTE` pair across every exchange.
  ///
  /// # Errors
  /// `DataError::UnknownPair` if the pair is malformed or absent from the
  /// current snapshot; store errors otherwise.
  #[instrument(skip(self))]
  pub fn get_one_price(&self, pair: &str) -> Result<DataResponse<OnePrice>, DataError> {
    let pair_id = self
      .tokens
      .parse_pair(pair)
      .map_err(|_| DataError::UnknownPair(pair.to_string()))?
      .pair_id();

    envelope(self.stores.prices.as_ref(), |data| {
      data
        .get(&pair_id)
        .cloned()
        .ok_or_else(|| DataError::UnknownPair(pair.to_string()))
    })
  }

  #[instrument(skip(self))]
  pub fn get_all_ebalances(&self) -> Result<DataResponse<AllEBalances>, DataError> {
    envelope(self.stores.ebalances.as_ref(), |data| Ok(data.clone()))
  }

  /// Reserve balances converted with each token's decimals.
  ///
  /// # Errors
  /// `DataError::UnknownToken` if the snapshot names a token that is not
  /// registered; no partial data is returned.
  #[instrument(skip(self))]
  pub fn get_all_balances(
    &self,
  ) -> Result<DataResponse<HashMap<TokenId, BalanceResponse>>, DataError> {
    envelope(self.stores.balances.as_ref(), |data| {
      data
        .iter()
        .map(|(id, entry)| -> Result<_, DataError> {
          let token = self.tokens.get(id)?;
          Ok((
            id.clone(),
            BalanceResponse {
              valid: entry.valid,
              error: entry.error.clone(),
              timestamp: entry.timestamp,
              return_time: entry.return_time,
              balance: big_to_float(entry.balance, token.decimals),
            },
          ))
        })
        .collect()
    })
  }

  /// Conversion rates, 18-decimal fixed point converted to floats.
  #[instrument(skip(self))]
  pub fn get_all_rates(&self) -> Result<DataResponse<HashMap<PairId, RateResponse>>, DataError> {
    envelope(self.stores.rates.as_ref(), |all| {
      Ok(
        all
          .data
          .iter()
          .map(|(pair, entry)| {
            (
              pair.clone(),
              RateResponse {
                valid: all.valid,
                error: all.error.clone(),
                timestamp: all.timestamp,
                return_time: all.return_time,
                rate: big_to_float(entry.rate, RATE_DECIMALS),
                expiry_block: entry.expiry_block,
                balance: big_to_float(entry.balance, RATE_DECIMALS),
              },
            )
          })
          .collect(),
      )
    })
  }
}

/// Atomic current read of `store`, shaped by `view` and stamped.
fn envelope<T, R>(
  store: &dyn SnapshotStore<T>,
  view: impl FnOnce(&T) -> Result<R, DataError>,
) -> Result<DataResponse<R>, DataError> {
  let timestamp = now_ms();
  let (version, snapshot) = store.read_current()?;
  let return_time = now_ms();
  let data = view(&snapshot)?;
  debug!(version, "Served snapshot");
  Ok(DataResponse {
    version,
    timestamp,
    return_time,
    data,
  })
}

#[cfg(test)]
mod tests {
  use alloy::primitives::{Address, U256};

  use super::*;
  use crate::adapters::storage::RamSnapshotStore;
  use crate::domain::error::StoreError;
  use crate::domain::market::{BalanceEntry, ExchangeId, ExchangePrice, PriceEntry, RateEntry};
  use crate::domain::token::{float_to_big, Token};

  struct Fixture {
    data: ReserveData,
    prices: Arc<RamSnapshotStore<AllPrices>>,
    balances: Arc<RamSnapshotStore<AllBalances>>,
    rates: Arc<RamSnapshotStore<AllRates>>,
  }

  fn fixture() -> Fixture {
    let prices = Arc::new(RamSnapshotStore::<AllPrices>::new("price"));
    let ebalances = Arc::new(RamSnapshotStore::<AllEBalances>::new("ebalance"));
    let balances = Arc::new(RamSnapshotStore::<AllBalances>::new("balance"));
    let rates = Arc::new(RamSnapshotStore::<AllRates>::new("rate"));
    let tokens = TokenRegistry::new([
      Token::new("ETH", Address::ZERO, 18),
      Token::new("KNC", Address::repeat_byte(1), 18),
      Token::new("DGD", Address::repeat_byte(2), 9),
    ]);

    let stores = DataStores {
      prices: prices.clone(),
      ebalances,
      balances: balances.clone(),
      rates: rates.clone(),
    };

    Fixture {
      data: ReserveData::new(stores, Arc::new(tokens)),
      prices,
      balances,
      rates,
    }
  }

  fn one_price(rate: f64) -> OnePrice {
    let book = ExchangePrice {
      valid: true,
      bids: vec![PriceEntry::new(10.0, rate)],
      ..Default::default()
    };
    HashMap::from([(ExchangeId::from("liqui"), book)])
  }

  #[test]
  fn test_empty_store_fails_without_data() {
    let f = fixture();
    assert_eq!(
      f.data.get_all_prices().unwrap_err(),
      DataError::Store(StoreError::NotInitialized)
    );
    assert!(f.data.current_rate_version().is_err());
  }

  #[test]
  fn test_envelope_carries_current_version() {
    let f = fixture();
    f.prices.write(HashMap::from([(PairId::new("KNC", "ETH"), one_price(0.001))]));
    f.prices.write(HashMap::from([(PairId::new("KNC", "ETH"), one_price(0.002))]));

    let resp = f.data.get_all_prices().unwrap();
    assert_eq!(resp.version, 2);
    assert!(resp.timestamp <= resp.return_time);
    assert_eq!(resp.data[&PairId::new("KNC", "ETH")], one_price(0.002));
    assert_eq!(f.data.current_price_version().unwrap(), 2);
  }

  #[test]
  fn test_one_price_unknown_pair() {
    let f = fixture();
    f.prices.write(HashMap::from([(PairId::new("KNC", "ETH"), one_price(0.001))]));

    let resp = f.data.get_one_price("KNC-ETH").unwrap();
    assert_eq!(resp.version, 1);
    assert_eq!(resp.data, one_price(0.001));

    assert_eq!(
      f.data.get_one_price("DGD-ETH").unwrap_err(),
      DataError::UnknownPair("DGD-ETH".into())
    );
    assert_eq!(
      f.data.get_one_price("OMG-ETH").unwrap_err(),
      DataError::UnknownPair("OMG-ETH".into())
    );
    assert_eq!(
      f.data.get_one_price("garbage").unwrap_err(),
      DataError::UnknownPair("garbage".into())
    );
  }

  #[test]
  fn test_balances_use_token_decimals() {
    let f = fixture();
    let entry = |raw: U256| BalanceEntry {
      valid: true,
      balance: raw,
      ..Default::default()
    };
    f.balances.write(HashMap::from([
      ("KNC".to_string(), entry(float_to_big(12.5, 18))),
      ("DGD".to_string(), entry(U256::from(3_000_000_000u64))),
    ]));

    let resp = f.data.get_all_balances().unwrap();
    assert_eq!(resp.data["KNC"].balance, 12.5);
    assert_eq!(resp.data["DGD"].balance, 3.0);
    assert!(resp.data["DGD"].valid);

    // the raw snapshot is untouched
    let (_, raw) = f.balances.read_current().unwrap();
    assert_eq!(raw["DGD"].balance, U256::from(3_000_000_000u64));
  }

  #[test]
  fn test_balances_unknown_token_fails() {
    let f = fixture();
    f.balances.write(HashMap::from([(
      "OMG".to_string(),
      BalanceEntry::default(),
    )]));

    assert_eq!(
      f.data.get_all_balances().unwrap_err(),
      DataError::UnknownToken("OMG".into())
    );
  }

  #[test]
  fn test_rates_converted_at_18_decimals() {
    let f = fixture();
    f.rates.write(AllRates {
      valid: true,
      error: String::new(),
      timestamp: 5,
      return_time: 7,
      data: HashMap::from([(
        PairId::new("KNC", "ETH"),
        RateEntry {
          rate: float_to_big(0.25, RATE_DECIMALS),
          expiry_block: 4_000_000,
          balance: float_to_big(100.0, RATE_DECIMALS),
        },
      )]),
    });

    let resp = f.data.get_all_rates().unwrap();
    let rate = &resp.data[&PairId::new("KNC", "ETH")];
    assert_eq!(resp.version, 1);
    assert!(rate.valid);
    assert_eq!(rate.rate, 0.25);
    assert_eq!(rate.balance, 100.0);
    assert_eq!(rate.expiry_block, 4_000_000);
    assert_eq!((rate.timestamp, rate.return_time), (5, 7));
  }
}
