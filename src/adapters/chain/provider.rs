//! RPC Provider - alloy-rs 0.9 Connection Management
//!
//! Builds the signing HTTP provider shared by every chain operation and
//! validates the chain ID at startup.

use std::str::FromStr;

use alloy::network::EthereumWallet;
use alloy::providers::{Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::{Client, Http};
use alloy::transports::Transport;
use anyhow::{Context, Result};
use tracing::{info, instrument};

/// Build an HTTP provider that fills nonce/gas/chain-id and signs with
/// the reserve operator key.
///
/// The key comes from the environment (never config.toml).
pub fn connect_http(
    rpc_url: &str,
    private_key: &str,
) -> Result<impl Provider<Http<Client>> + 'static> {
    let signer = PrivateKeySigner::from_str(private_key.trim_start_matches("0x"))
        .context("Invalid operator private key")?;
    let operator = signer.address();

    let provider = ProviderBuilder::new()
        .with_recommended_fillers()
        .wallet(EthereumWallet::from(signer))
        .on_http(rpc_url.parse().context("Invalid RPC URL")?);

    info!(operator = %operator, "RPC provider configured");
    Ok(provider)
}

/// Fail unless the node reports `expected` as its chain ID.
#[instrument(skip(provider))]
pub async fn ensure_chain_id<T, P>(provider: &P, expected: u64) -> Result<()>
where
    T: Transport + Clone,
    P: Provider<T>,
{
    let chain_id = provider
        .get_chain_id()
        .await
        .context("Failed to query chain ID")?;

    anyhow::ensure!(
        chain_id == expected,
        "Expected chain_id={expected}, node reports {chain_id}"
    );

    info!(chain_id, "Connected to RPC");
    Ok(())
}
