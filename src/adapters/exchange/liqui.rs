//! Liqui Exchange Adapter - Implements the `Exchange` port
//!
//! Maps reserve tokens/pairs onto Liqui's lowercase `base_quote` names
//! and folds every fetch failure into invalid-flagged data.

use std::collections::HashMap;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use tracing::{info, instrument, warn};

use crate::domain::error::ExchangeError;
use crate::domain::market::{
    now_ms, EBalanceEntry, ExchangeId, ExchangePrice, PriceEntry, TradeOutcome, TradeType,
};
use crate::domain::token::{big_to_float, PairId, Token, TokenId, TokenPair};
use crate::ports::exchange::Exchange;

use super::types::{DepthResponse, InfoReturn, TradeReturn};

/// Raw Liqui API surface the adapter needs.
///
/// Implemented over HTTP by `LiquiHttp`; tests substitute a fake.
#[async_trait]
pub trait LiquiEndpoint: Send + Sync + 'static {
    /// Order books for `pairs`, a `-`-joined list of Liqui pair names.
    async fn depth(&self, pairs: &str) -> Result<DepthResponse, ExchangeError>;

    async fn get_info(&self) -> Result<InfoReturn, ExchangeError>;

    async fn trade(
        &self,
        pair: &str,
        trade_type: TradeType,
        rate: f64,
        amount: f64,
    ) -> Result<TradeReturn, ExchangeError>;

    async fn withdraw(&self, coin: &str, amount: f64, address: Address)
        -> Result<(), ExchangeError>;
}

/// Liqui pair name for a base/quote symbol pair.
fn liqui_pair(base: &str, quote: &str) -> String {
    format!("{}_{}", base.to_lowercase(), quote.to_lowercase())
}

fn levels(raw: &[[f64; 2]]) -> Vec<PriceEntry> {
    raw.iter()
        .map(|[rate, quantity]| PriceEntry::new(*quantity, *rate))
        .collect()
}

pub struct Liqui<E> {
    endpoint: E,
    pairs: Vec<TokenPair>,
    /// Deposit address per supported token.
    addresses: HashMap<TokenId, Address>,
    /// Tokens reported in balance fetches.
    tokens: Vec<Token>,
}

impl<E: LiquiEndpoint> Liqui<E> {
    pub const ID: &'static str = "liqui";

    pub fn new(
        endpoint: E,
        pairs: Vec<TokenPair>,
        addresses: HashMap<TokenId, Address>,
        tokens: Vec<Token>,
    ) -> Self {
        Self {
            endpoint,
            pairs,
            addresses,
            tokens,
        }
    }
}

#[async_trait]
impl<E: LiquiEndpoint> Exchange for Liqui<E> {
    fn id(&self) -> ExchangeId {
        ExchangeId::from(Self::ID)
    }

    fn address(&self, token: &Token) -> Option<Address> {
        self.addresses.get(&token.id).copied()
    }

    fn token_pairs(&self) -> Vec<TokenPair> {
        self.pairs.clone()
    }

    #[instrument(skip(self, base, quote), fields(pair = %PairId::new(&base.id, &quote.id)))]
    async fn trade(
        &self,
        trade_type: TradeType,
        base: &Token,
        quote: &Token,
        rate: f64,
        amount: f64,
    ) -> Result<TradeOutcome, ExchangeError> {
        let ret = self
            .endpoint
            .trade(&liqui_pair(&base.id, &quote.id), trade_type, rate, amount)
            .await?;

        info!(
            order_id = ret.order_id,
            received = ret.received,
            remains = ret.remains,
            "Liqui order placed"
        );
        Ok(TradeOutcome {
            done: ret.received,
            remaining: ret.remains,
            finished: ret.remains == 0.0,
        })
    }

    #[instrument(skip(self, token), fields(token = %token.id))]
    async fn withdraw(
        &self,
        token: &Token,
        amount: U256,
        destination: Address,
    ) -> Result<(), ExchangeError> {
        if !self.addresses.contains_key(&token.id) {
            return Err(ExchangeError::UnsupportedToken {
                exchange: self.id(),
                token: token.id.clone(),
            });
        }

        self.endpoint
            .withdraw(&token.id, big_to_float(amount, token.decimals), destination)
            .await
    }

    #[instrument(skip(self), fields(pairs = self.pairs.len()))]
    async fn fetch_price_data(&self) -> HashMap<PairId, ExchangePrice> {
        let names: Vec<String> = self
            .pairs
            .iter()
            .map(|p| liqui_pair(&p.base.id, &p.quote.id))
            .collect();

        let timestamp = now_ms();
        let response = self.endpoint.depth(&names.join("-")).await;
        let return_time = now_ms();

        match response {
            Err(e) => {
                warn!(error = %e, "Liqui depth fetch failed");
                let error = e.to_string();
                self.pairs
                    .iter()
                    .map(|p| {
                        (
                            p.pair_id(),
                            ExchangePrice::invalid(timestamp, return_time, error.clone()),
                        )
                    })
                    .collect()
            }
            Ok(depth) => self
                .pairs
                .iter()
                .zip(&names)
                .map(|(pair, name)| {
                    let price = match depth.get(name) {
                        Some(book) => ExchangePrice {
                            valid: true,
                            error: String::new(),
                            timestamp,
                            return_time,
                            bids: levels(&book.bids),
                            asks: levels(&book.asks),
                        },
                        None => ExchangePrice::invalid(
                            timestamp,
                            return_time,
                            format!("pair {name} missing from depth response"),
                        ),
                    };
                    (pair.pair_id(), price)
                })
                .collect(),
        }
    }

    #[instrument(skip(self))]
    async fn fetch_ebalance_data(&self) -> EBalanceEntry {
        let timestamp = now_ms();
        let response = self.endpoint.get_info().await;
        let return_time = now_ms();

        match response {
            Ok(info) => EBalanceEntry {
                valid: true,
                error: String::new(),
                timestamp,
                return_time,
                balance: self
                    .tokens
                    .iter()
                    .map(|t| {
                        let amount = info
                            .funds
                            .get(&t.id.to_lowercase())
                            .copied()
                            .unwrap_or(0.0);
                        (t.id.clone(), amount)
                    })
                    .collect(),
            },
            Err(e) => {
                warn!(error = %e, "Liqui balance fetch failed");
                EBalanceEntry::invalid(timestamp, return_time, e.to_string())
            }
        }
    }
}
