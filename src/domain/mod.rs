//! Domain layer - reference data, market data and audit types.
//!
//! Pure types only: no I/O, no locking. Everything here is
//! serializable and testable in isolation.

pub mod activity;
pub mod error;
pub mod market;
pub mod token;

pub use activity::{Action, ActivityRecord};
pub use error::{ChainError, CoreError, DataError, ExchangeError, StoreError};
pub use market::{
    AllBalances, AllEBalances, AllPrices, AllRates, BalanceEntry, EBalanceEntry,
    ExchangeId, ExchangePrice, OnePrice, PriceEntry, RateEntry, TradeOutcome, TradeType,
};
pub use token::{PairId, Token, TokenId, TokenPair, TokenRegistry};
