//! Fetcher Use Case - Periodic Snapshot Writer
//!
//! On a fixed interval, pulls every exchange's order books and account
//! balances plus the reserve's on-chain balances, all concurrently, and
//! writes one new snapshot per domain. Adapters fold their own failures
//! into invalid entries, so a broken exchange degrades a cycle instead
//! of aborting it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument};

use crate::adapters::metrics::{HealthState, MetricsRegistry};
use crate::domain::market::{AllBalances, AllEBalances, AllPrices};
use crate::domain::token::Token;
use crate::ports::blockchain::Blockchain;
use crate::ports::exchange::Exchange;
use crate::ports::storage::Version;

use super::reserve_data::DataStores;

/// Versions written by one fetch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleVersions {
  pub price: Version,
  pub ebalance: Version,
  pub balance: Version,
}

/// Periodic writer of the price, exchange-balance and balance domains.
pub struct Fetcher<B: Blockchain> {
  exchanges: Vec<Arc<dyn Exchange>>,
  blockchain: Arc<B>,
  /// Tokens whose reserve balance is tracked.
  tokens: Vec<Token>,
  stores: DataStores,
  interval: Duration,
  metrics: Option<Arc<MetricsRegistry>>,
  health: Option<Arc<HealthState>>,
  shutdown_rx: broadcast::Receiver<()>,
}

impl<B: Blockchain> Fetcher<B> {
  pub fn new(
    exchanges: Vec<Arc<dyn Exchange>>,
    blockchain: Arc<B>,
    tokens: Vec<Token>,
    stores: DataStores,
    interval: Duration,
    shutdown_rx: broadcast::Receiver<()>,
  ) -> Self {
    Self {
      exchanges,
      blockchain,
      tokens,
      stores,
      interval,
      metrics: None,
      health: None,
      shutdown_rx,
    }
  }

  pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
    self.metrics = Some(metrics);
    self
  }

  pub fn with_health(mut self, health: Arc<HealthState>) -> Self {
    self.health = Some(health);
    self
  }

  /// Fetch on every tick until the shutdown signal fires.
  #[instrument(skip(self), name = "fetch_loop")]
  pub async fn run(&mut self) {
    info!(
      exchanges = self.exchanges.len(),
      tokens = self.tokens.len(),
      interval_ms = self.interval.as_millis() as u64,
      "Starting fetcher"
    );

    let mut ticker = tokio::time::interval(self.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
      tokio::select! {
        _ = self.shutdown_rx.recv() => {
          info!("Shutdown signal received, stopping fetcher");
          break;
        }
        _ = ticker.tick() => {
          self.run_once().await;
        }
      }
    }
  }

  /// One complete fetch cycle.
  #[instrument(skip(self), name = "fetch_cycle")]
  pub async fn run_once(&self) -> CycleVersions {
    let start = Instant::now();

    let price_pulls = join_all(
      self
        .exchanges
        .iter()
        .map(|e| async move { (e.id(), e.fetch_price_data().await) }),
    );
    let ebalance_pulls = join_all(
      self
        .exchanges
        .iter()
        .map(|e| async move { (e.id(), e.fetch_ebalance_data().await) }),
    );
    let balance_pull = self.blockchain.fetch_balance_data(&self.tokens);

    let (prices, ebalances, balances) = tokio::join!(price_pulls, ebalance_pulls, balance_pull);

    let mut all_prices: AllPrices = HashMap::new();
    for (exchange, books) in prices {
      for (pair, price) in books {
        if !price.valid {
          self.count_invalid(exchange.as_str(), "price");
        }
        all_prices
          .entry(pair)
          .or_default()
          .insert(exchange.clone(), price);
      }
    }

    let mut all_ebalances: AllEBalances = HashMap::new();
    for (exchange, entry) in ebalances {
      if !entry.valid {
        self.count_invalid(exchange.as_str(), "ebalance");
      }
      all_ebalances.insert(exchange, entry);
    }

    let all_balances: AllBalances = balances;
    for entry in all_balances.values().filter(|e| !e.valid) {
      debug!(error = %entry.error, "Invalid reserve balance");
      self.count_invalid("chain", "balance");
    }

    let versions = CycleVersions {
      price: self.stores.prices.write(all_prices),
      ebalance: self.stores.ebalances.write(all_ebalances),
      balance: self.stores.balances.write(all_balances),
    };

    let elapsed = start.elapsed();
    if let Some(metrics) = &self.metrics {
      for (domain, version) in [
        ("price", versions.price),
        ("ebalance", versions.ebalance),
        ("balance", versions.balance),
      ] {
        metrics
          .snapshot_version
          .with_label_values(&[domain])
          .set(version as i64);
      }
      metrics.fetch_cycle_seconds.observe(elapsed.as_secs_f64());
    }
    if let Some(health) = &self.health {
      health.mark_snapshots_ready();
    }

    info!(
      price_version = versions.price,
      ebalance_version = versions.ebalance,
      balance_version = versions.balance,
      elapsed_ms = elapsed.as_millis() as u64,
      "Fetch cycle complete"
    );

    versions
  }

  fn count_invalid(&self, source: &str, kind: &str) {
    if let Some(metrics) = &self.metrics {
      metrics
        .fetch_invalid_total
        .with_label_values(&[source, kind])
        .inc();
    }
  }
}

#[cfg(test)]
mod tests {
  use alloy::primitives::{Address, TxHash, U256};
  use async_trait::async_trait;

  use super::*;
  use crate::adapters::storage::RamSnapshotStore;
  use crate::domain::error::{ChainError, ExchangeError};
  use crate::domain::market::{
    AllRates, BalanceEntry, EBalanceEntry, ExchangeId, ExchangePrice, PriceEntry, TradeOutcome,
    TradeType,
  };
  use crate::domain::token::{PairId, TokenId, TokenPair};
  use crate::ports::storage::SnapshotStore;

  struct StaticExchange {
    id: &'static str,
    down: bool,
    pairs: Vec<PairId>,
  }

  #[async_trait]
  impl Exchange for StaticExchange {
    fn id(&self) -> ExchangeId {
      ExchangeId::from(self.id)
    }

    fn address(&self, _: &Token) -> Option<Address> {
      None
    }

    fn token_pairs(&self) -> Vec<TokenPair> {
      Vec::new()
    }

    async fn trade(
      &self,
      _: TradeType,
      _: &Token,
      _: &Token,
      _: f64,
      _: f64,
    ) -> Result<TradeOutcome, ExchangeError> {
      unreachable!("fetcher never trades")
    }

    async fn withdraw(&self, _: &Token, _: U256, _: Address) -> Result<(), ExchangeError> {
      unreachable!("fetcher never withdraws")
    }

    async fn fetch_price_data(&self) -> HashMap<PairId, ExchangePrice> {
      self
        .pairs
        .iter()
        .map(|p| {
          let price = if self.down {
            ExchangePrice::invalid(1, 2, "connection refused")
          } else {
            ExchangePrice {
              valid: true,
              bids: vec![PriceEntry::new(1.0, 0.5)],
              ..Default::default()
            }
          };
          (p.clone(), price)
        })
        .collect()
    }

    async fn fetch_ebalance_data(&self) -> EBalanceEntry {
      if self.down {
        EBalanceEntry::invalid(1, 2, "connection refused")
      } else {
        EBalanceEntry {
          valid: true,
          balance: HashMap::from([("ETH".to_string(), 3.0)]),
          ..Default::default()
        }
      }
    }
  }

  struct StaticChain;

  #[async_trait]
  impl Blockchain for StaticChain {
    async fn send(&self, _: &Token, _: U256, _: Address) -> Result<TxHash, ChainError> {
      unreachable!("fetcher never sends")
    }

    async fn set_rates(
      &self,
      _: &[Address],
      _: &[Address],
      _: &[U256],
      _: &[u64],
    ) -> Result<TxHash, ChainError> {
      unreachable!("fetcher never sets rates")
    }

    async fn fetch_balance_data(&self, tokens: &[Token]) -> HashMap<TokenId, BalanceEntry> {
      tokens
        .iter()
        .map(|t| {
          (
            t.id.clone(),
            BalanceEntry {
              valid: true,
              balance: U256::from(7u64),
              ..Default::default()
            },
          )
        })
        .collect()
    }
  }

  fn stores() -> DataStores {
    DataStores {
      prices: Arc::new(RamSnapshotStore::<AllPrices>::new("price")),
      ebalances: Arc::new(RamSnapshotStore::<AllEBalances>::new("ebalance")),
      balances: Arc::new(RamSnapshotStore::<AllBalances>::new("balance")),
      rates: Arc::new(RamSnapshotStore::<AllRates>::new("rate")),
    }
  }

  fn fetcher(exchanges: Vec<Arc<dyn Exchange>>, stores: DataStores) -> Fetcher<StaticChain> {
    let (_tx, rx) = broadcast::channel(1);
    Fetcher::new(
      exchanges,
      Arc::new(StaticChain),
      vec![Token::new("ETH", Address::ZERO, 18)],
      stores,
      Duration::from_millis(10),
      rx,
    )
  }

  #[tokio::test]
  async fn test_one_broken_exchange_degrades_cycle() {
    let pairs = vec![PairId::new("KNC", "ETH"), PairId::new("OMG", "ETH")];
    let exchanges: Vec<Arc<dyn Exchange>> = vec![
      Arc::new(StaticExchange {
        id: "liqui",
        down: false,
        pairs: pairs.clone(),
      }),
      Arc::new(StaticExchange {
        id: "bittrex",
        down: true,
        pairs: pairs.clone(),
      }),
    ];
    let stores = stores();
    let metrics = Arc::new(MetricsRegistry::new().unwrap());
    let health = Arc::new(HealthState::new());
    let fetcher = fetcher(exchanges, stores.clone())
      .with_metrics(Arc::clone(&metrics))
      .with_health(Arc::clone(&health));

    let versions = fetcher.run_once().await;
    assert_eq!(
      versions,
      CycleVersions {
        price: 1,
        ebalance: 1,
        balance: 1,
      }
    );

    let (_, prices) = stores.prices.read_current().unwrap();
    for pair in &pairs {
      let one = &prices[pair];
      assert!(one[&ExchangeId::from("liqui")].valid);
      let broken = &one[&ExchangeId::from("bittrex")];
      assert!(!broken.valid);
      assert_eq!(broken.error, "connection refused");
    }

    let (_, ebalances) = stores.ebalances.read_current().unwrap();
    assert_eq!(ebalances.len(), 2);
    assert!(!ebalances[&ExchangeId::from("bittrex")].valid);

    let (_, balances) = stores.balances.read_current().unwrap();
    assert_eq!(balances["ETH"].balance, U256::from(7u64));

    assert_eq!(
      metrics
        .fetch_invalid_total
        .with_label_values(&["bittrex", "price"])
        .get(),
      2
    );
    assert_eq!(
      metrics.snapshot_version.with_label_values(&["price"]).get(),
      1
    );
    assert!(health.is_ready());
  }

  #[tokio::test]
  async fn test_rates_domain_untouched() {
    let stores = stores();
    let fetcher = fetcher(Vec::new(), stores.clone());
    fetcher.run_once().await;
    fetcher.run_once().await;

    assert_eq!(stores.prices.current_version().unwrap(), 2);
    assert!(stores.rates.current_version().is_err());
  }

  #[tokio::test]
  async fn test_run_stops_on_shutdown() {
    let (tx, rx) = broadcast::channel(1);
    let stores = stores();
    let mut fetcher = Fetcher::new(
      Vec::new(),
      Arc::new(StaticChain),
      Vec::new(),
      stores.clone(),
      Duration::from_millis(5),
      rx,
    );

    let handle = tokio::spawn(async move { fetcher.run().await });
    tokio::time::sleep(Duration::from_millis(30)).await;
    tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(1), handle)
      .await
      .unwrap()
      .unwrap();

    assert!(stores.prices.current_version().unwrap() >= 1);
  }
}
