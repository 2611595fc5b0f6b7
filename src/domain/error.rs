//! Error taxonomy shared by ports, adapters and use cases.
//!
//! - Precondition failures (`CoreError::UnsupportedToken`,
//!   `CoreError::LengthMismatch`) are raised before any adapter call.
//! - Adapter failures (`ExchangeError`, `ChainError`) come from the
//!   outside world and are passed through untouched.
//! - Store failures (`StoreError`) surface on reads only.

use thiserror::Error;

use super::market::ExchangeId;
use super::token::TokenId;

/// Snapshot store read failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Nothing has been written to the store yet.
    #[error("store has not been written yet")]
    NotInitialized,

    /// The version was never written or has been evicted.
    #[error("version {0} doesn't exist")]
    VersionNotFound(u64),
}

/// Failures reported by an exchange adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExchangeError {
    #[error("exchange {exchange} doesn't support token {token}")]
    UnsupportedToken { exchange: ExchangeId, token: TokenId },

    /// The exchange answered but refused the request.
    #[error("exchange rejected request: {0}")]
    Rejected(String),

    #[error("exchange transport failure: {0}")]
    Transport(String),

    #[error("malformed exchange response: {0}")]
    Decode(String),
}

/// Failures reported by the blockchain adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// Input rejected before anything was sent to the chain.
    #[error(
        "sources, dests, rates and expiry blocks must have the same length \
         (got {sources}/{dests}/{rates}/{expiry_blocks})"
    )]
    LengthMismatch {
        sources: usize,
        dests: usize,
        rates: usize,
        expiry_blocks: usize,
    },

    #[error("transaction submission failed: {0}")]
    Submission(String),

    #[error("rpc call failed: {0}")]
    Rpc(String),
}

/// Outcome errors of orchestrated write operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("exchange {exchange} doesn't support token {token}")]
    UnsupportedToken { exchange: ExchangeId, token: TokenId },

    #[error(
        "sources, dests, rates and expiry blocks must have the same length \
         (got {sources}/{dests}/{rates}/{expiry_blocks})"
    )]
    LengthMismatch {
        sources: usize,
        dests: usize,
        rates: usize,
        expiry_blocks: usize,
    },

    #[error(transparent)]
    Exchange(#[from] ExchangeError),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

impl CoreError {
    /// True when the operation was refused without touching any adapter.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedToken { .. } | Self::LengthMismatch { .. }
        )
    }
}

/// Read-side failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("unknown token {0}")]
    UnknownToken(TokenId),

    #[error("unknown token pair {0}")]
    UnknownPair(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precondition_classification() {
        let unsupported = CoreError::UnsupportedToken {
            exchange: ExchangeId::from("liqui"),
            token: "KNC".to_string(),
        };
        assert!(unsupported.is_precondition());
        assert_eq!(
            unsupported.to_string(),
            "exchange liqui doesn't support token KNC"
        );

        let mismatch = CoreError::LengthMismatch {
            sources: 3,
            dests: 2,
            rates: 3,
            expiry_blocks: 3,
        };
        assert!(mismatch.is_precondition());

        let chain = CoreError::from(ChainError::Submission("nonce too low".into()));
        assert!(!chain.is_precondition());
        assert_eq!(
            chain.to_string(),
            "transaction submission failed: nonce too low"
        );
    }

    #[test]
    fn test_store_error_display() {
        assert_eq!(
            StoreError::VersionNotFound(7).to_string(),
            "version 7 doesn't exist"
        );
    }
}
