//! Chain Adapters - EVM Blockchain Interaction Layer
//!
//! Provides on-chain access via alloy-rs 0.9 for:
//! - RPC provider construction with a local signer
//! - Reserve withdrawals (deposits into exchanges)
//! - Conversion rate publishing
//! - Reserve balance reads

pub mod contracts;
pub mod provider;
pub mod reserve;

pub use provider::{connect_http, ensure_chain_id};
pub use reserve::EvmBlockchain;
