//! Token reference data and fixed-point conversion.
//!
//! Tokens and pairs are static reference data loaded from config at
//! startup. Raw on-chain quantities stay `U256` everywhere; conversion
//! to display floats happens only at read time via [`big_to_float`].

use std::collections::HashMap;
use std::fmt;

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use super::error::DataError;

/// Token symbol, e.g. `"OMG"`.
pub type TokenId = String;

/// Decimals used by on-chain rates and rate balances.
pub const RATE_DECIMALS: u8 = 18;

/// A token the reserve can hold or quote.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    /// Symbol, unique within the registry.
    pub id: TokenId,
    /// ERC-20 contract address (zero-like sentinel for native ETH).
    pub address: Address,
    /// Decimal precision of raw amounts.
    pub decimals: u8,
}

impl Token {
    pub fn new(id: impl Into<TokenId>, address: Address, decimals: u8) -> Self {
        Self {
            id: id.into(),
            address,
            decimals,
        }
    }

    /// Whether this is the chain's native asset rather than an ERC-20.
    pub fn is_native(&self) -> bool {
        self.id == "ETH"
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Stable identifier of a (base, quote) pair, formatted `BASE-QUOTE`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PairId(String);

impl PairId {
    pub fn new(base: &str, quote: &str) -> Self {
        Self(format!("{base}-{quote}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PairId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A tradable (base, quote) combination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenPair {
    pub base: Token,
    pub quote: Token,
}

impl TokenPair {
    pub fn new(base: Token, quote: Token) -> Self {
        Self { base, quote }
    }

    pub fn pair_id(&self) -> PairId {
        PairId::new(&self.base.id, &self.quote.id)
    }
}

/// Lookup table of every token the reserve knows about.
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    tokens: HashMap<TokenId, Token>,
}

impl TokenRegistry {
    pub fn new(tokens: impl IntoIterator<Item = Token>) -> Self {
        Self {
            tokens: tokens.into_iter().map(|t| (t.id.clone(), t)).collect(),
        }
    }

    pub fn get(&self, id: &str) -> Result<&Token, DataError> {
        self.tokens
            .get(id)
            .ok_or_else(|| DataError::UnknownToken(id.to_string()))
    }

    /// Build a pair from two registered symbols.
    pub fn pair(&self, base: &str, quote: &str) -> Result<TokenPair, DataError> {
        Ok(TokenPair::new(self.get(base)?.clone(), self.get(quote)?.clone()))
    }

    /// Parse a `BASE-QUOTE` string into a pair of registered tokens.
    pub fn parse_pair(&self, s: &str) -> Result<TokenPair, DataError> {
        let (base, quote) = s
            .split_once('-')
            .ok_or_else(|| DataError::UnknownPair(s.to_string()))?;
        self.pair(base, quote)
    }

    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.tokens.values()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Convert a raw fixed-point integer to a display float.
///
/// Precision loss is acceptable here: the result is only ever shown to
/// readers, never written back.
pub fn big_to_float(raw: U256, decimals: u8) -> f64 {
    let scale = 10f64.powi(i32::from(decimals));
    // f64 parse of the decimal string is exact up to f64 precision for any U256.
    let value: f64 = raw.to_string().parse().unwrap_or(f64::MAX);
    value / scale
}

/// Convert a display float back to a raw fixed-point integer (truncating).
pub fn float_to_big(value: f64, decimals: u8) -> U256 {
    if !value.is_finite() || value <= 0.0 {
        return U256::ZERO;
    }
    let scaled = value * 10f64.powi(i32::from(decimals));
    U256::from_str_radix(&format!("{:.0}", scaled.trunc()), 10).unwrap_or(U256::ZERO)
}
