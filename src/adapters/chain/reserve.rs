//! EVM Reserve Adapter - Implements the `Blockchain` port
//!
//! - `send`: `IReserve.withdraw(token, amount, destination)` on the
//!   reserve contract (the contract handles both ERC-20 and ETH)
//! - `set_rates`: `IConversionRates.setRate(..)` on the pricing contract
//! - `fetch_balance_data`: `balanceOf(reserve)` per token, or the native
//!   balance for ETH

use std::collections::HashMap;
use std::marker::PhantomData;

use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::Provider;
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::SolCall;
use alloy::transports::Transport;
use async_trait::async_trait;
use futures_util::future::join_all;
use tracing::{info, instrument, warn};

use crate::domain::error::ChainError;
use crate::domain::market::{now_ms, BalanceEntry};
use crate::domain::token::{Token, TokenId};
use crate::ports::blockchain::{check_rate_lengths, Blockchain};

use super::contracts::{IConversionRates, IERC20, IReserve};

/// On-chain reserve operations over any alloy provider.
pub struct EvmBlockchain<T, P> {
    provider: P,
    /// Reserve contract holding the inventory.
    reserve: Address,
    /// Conversion rates contract.
    pricing: Address,
    _transport: PhantomData<fn() -> T>,
}

impl<T, P> EvmBlockchain<T, P>
where
    T: Transport + Clone,
    P: Provider<T>,
{
    pub fn new(provider: P, reserve: Address, pricing: Address) -> Self {
        Self {
            provider,
            reserve,
            pricing,
            _transport: PhantomData,
        }
    }

    pub fn reserve_address(&self) -> Address {
        self.reserve
    }

    async fn submit(&self, to: Address, calldata: Vec<u8>) -> Result<TxHash, ChainError> {
        let tx = TransactionRequest::default()
            .to(to)
            .input(Bytes::from(calldata).into());

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| ChainError::Submission(e.to_string()))?;

        Ok(*pending.tx_hash())
    }

    async fn balance_of(&self, token: &Token) -> Result<U256, ChainError> {
        if token.is_native() {
            return self
                .provider
                .get_balance(self.reserve)
                .await
                .map_err(|e| ChainError::Rpc(e.to_string()));
        }

        let call = IERC20::balanceOfCall {
            owner: self.reserve,
        };
        let tx = TransactionRequest::default()
            .to(token.address)
            .input(Bytes::from(call.abi_encode()).into());

        let raw = self
            .provider
            .call(&tx)
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;

        IERC20::balanceOfCall::abi_decode_returns(&raw, true)
            .map(|ret| ret._0)
            .map_err(|e| ChainError::Rpc(format!("bad balanceOf return: {e}")))
    }
}

#[async_trait]
impl<T, P> Blockchain for EvmBlockchain<T, P>
where
    T: Transport + Clone,
    P: Provider<T> + 'static,
{
    #[instrument(skip(self), fields(token = %token.id))]
    async fn send(
        &self,
        token: &Token,
        amount: U256,
        destination: Address,
    ) -> Result<TxHash, ChainError> {
        let call = IReserve::withdrawCall {
            token: token.address,
            amount,
            destination,
        };
        let tx_hash = self.submit(self.reserve, call.abi_encode()).await?;
        info!(tx = %tx_hash, %amount, %destination, "Reserve withdrawal submitted");
        Ok(tx_hash)
    }

    #[instrument(skip_all, fields(pairs = sources.len()))]
    async fn set_rates(
        &self,
        sources: &[Address],
        dests: &[Address],
        rates: &[U256],
        expiry_blocks: &[u64],
    ) -> Result<TxHash, ChainError> {
        check_rate_lengths(sources.len(), dests.len(), rates.len(), expiry_blocks.len())?;

        let call = IConversionRates::setRateCall {
            sources: sources.to_vec(),
            dests: dests.to_vec(),
            conversionRates: rates.to_vec(),
            expiryBlocks: expiry_blocks.iter().map(|b| U256::from(*b)).collect(),
            validate: true,
        };
        let tx_hash = self.submit(self.pricing, call.abi_encode()).await?;
        info!(tx = %tx_hash, "Rates submitted");
        Ok(tx_hash)
    }

    #[instrument(skip_all, fields(tokens = tokens.len()))]
    async fn fetch_balance_data(&self, tokens: &[Token]) -> HashMap<TokenId, BalanceEntry> {
        let lookups = tokens.iter().map(|token| async move {
            let timestamp = now_ms();
            let result = self.balance_of(token).await;
            let return_time = now_ms();

            let entry = match result {
                Ok(balance) => BalanceEntry {
                    valid: true,
                    error: String::new(),
                    timestamp,
                    return_time,
                    balance,
                },
                Err(e) => {
                    warn!(token = %token.id, error = %e, "Balance lookup failed");
                    BalanceEntry {
                        valid: false,
                        error: e.to_string(),
                        timestamp,
                        return_time,
                        balance: U256::ZERO,
                    }
                }
            };
            (token.id.clone(), entry)
        });

        join_all(lookups).await.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::providers::ProviderBuilder;

    // Nothing listens on port 1, so any RPC attempt fails fast.
    const DEAD_RPC: &str = "http://127.0.0.1:1";

    fn blockchain() -> EvmBlockchain<
        alloy::transports::http::Http<alloy::transports::http::Client>,
        impl Provider<alloy::transports::http::Http<alloy::transports::http::Client>>,
    > {
        let provider = ProviderBuilder::new().on_http(DEAD_RPC.parse().unwrap());
        EvmBlockchain::new(provider, Address::repeat_byte(0x01), Address::repeat_byte(0x02))
    }

    #[tokio::test]
    async fn test_set_rates_rejects_mismatched_lengths_before_rpc() {
        let chain = blockchain();
        let addr = Address::repeat_byte(0xaa);
        let err = chain
            .set_rates(
                &[addr, addr, addr],
                &[addr, addr],
                &[U256::from(1), U256::from(2), U256::from(3)],
                &[10, 11, 12],
            )
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ChainError::LengthMismatch {
                sources: 3,
                dests: 2,
                rates: 3,
                expiry_blocks: 3,
            }
        );
    }

    #[tokio::test]
    async fn test_send_failure_is_submission_error() {
        let chain = blockchain();
        let token = Token::new("OMG", Address::repeat_byte(0x11), 18);
        let err = chain
            .send(&token, U256::from(5), Address::repeat_byte(0x22))
            .await
            .unwrap_err();
        assert!(matches!(err, ChainError::Submission(_)));
    }

    #[tokio::test]
    async fn test_balance_fetch_marks_every_token_invalid_on_rpc_failure() {
        let chain = blockchain();
        let tokens = vec![
            Token::new("ETH", Address::repeat_byte(0xee), 18),
            Token::new("OMG", Address::repeat_byte(0x11), 18),
        ];
        let balances = chain.fetch_balance_data(&tokens).await;
        assert_eq!(balances.len(), 2);
        for entry in balances.values() {
            assert!(!entry.valid);
            assert!(!entry.error.is_empty());
            assert!(entry.return_time >= entry.timestamp);
        }
    }
}
