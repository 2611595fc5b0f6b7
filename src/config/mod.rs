//! Configuration Module - TOML-based Reserve Configuration
//!
//! Loads and validates configuration from `config.toml`. Token
//! addresses, contract addresses and exchange pairs are externalized
//! here; secrets (operator key, exchange API credentials) come from the
//! environment only.

pub mod loader;

use std::collections::HashMap;

use alloy::primitives::Address;
use serde::Deserialize;

use crate::domain::token::{Token, TokenRegistry};

/// Top-level reserve configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// Service identity and logging.
  pub service: ServiceConfig,
  /// Every token the reserve handles.
  pub tokens: Vec<TokenConfig>,
  /// Snapshot store settings.
  #[serde(default)]
  pub storage: StorageConfig,
  /// Chain endpoint and contract addresses.
  pub chain: ChainConfig,
  /// Connected exchanges.
  #[serde(default)]
  pub exchanges: Vec<ExchangeConfig>,
  /// Snapshot fetch loop.
  #[serde(default)]
  pub fetcher: FetcherConfig,
  /// Audit log location.
  #[serde(default)]
  pub activity: ActivityConfig,
  /// Metrics and monitoring.
  #[serde(default)]
  pub metrics: MetricsConfig,
}

impl AppConfig {
  /// Registry of the configured tokens.
  pub fn token_registry(&self) -> TokenRegistry {
    TokenRegistry::new(
      self
        .tokens
        .iter()
        .map(|t| Token::new(t.id.clone(), t.address, t.decimals)),
    )
  }
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
  /// Human-readable service name.
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
}

/// One token definition.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
  /// Symbol, e.g. `KNC`. `ETH` is the native coin.
  pub id: String,
  pub address: Address,
  pub decimals: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
  /// Versions kept per data domain (current + previous at minimum).
  #[serde(default = "default_retention")]
  pub retention: usize,
}

impl Default for StorageConfig {
  fn default() -> Self {
    Self {
      retention: default_retention(),
    }
  }
}

/// Chain endpoint and reserve contracts.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
  /// JSON-RPC endpoint.
  pub rpc_url: String,
  /// Expected chain ID, checked at startup.
  #[serde(default = "default_chain_id")]
  pub chain_id: u64,
  /// Reserve contract holding the funds.
  pub reserve_address: Address,
  /// Conversion rates contract.
  pub pricing_address: Address,
  /// Destination of every exchange withdrawal.
  pub reserve_manager: Address,
}

/// One exchange connection.
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeConfig {
  /// Exchange identifier; only `liqui` is supported.
  pub name: String,
  #[serde(default = "default_liqui_url")]
  pub base_url: String,
  /// Quoted pairs as `BASE-QUOTE`.
  pub pairs: Vec<String>,
  /// Deposit address per token symbol.
  #[serde(default)]
  pub addresses: HashMap<String, Address>,
  /// Request timeout in milliseconds.
  #[serde(default = "default_timeout_ms")]
  pub timeout_ms: u64,
  /// Public API request budget.
  #[serde(default = "default_requests_per_second")]
  pub requests_per_second: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
  /// Delay between fetch cycles in milliseconds.
  #[serde(default = "default_interval_ms")]
  pub interval_ms: u64,
}

impl Default for FetcherConfig {
  fn default() -> Self {
    Self {
      interval_ms: default_interval_ms(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActivityConfig {
  /// Directory for the JSONL audit log.
  #[serde(default = "default_data_dir")]
  pub data_dir: String,
}

impl Default for ActivityConfig {
  fn default() -> Self {
    Self {
      data_dir: default_data_dir(),
    }
  }
}

/// Metrics and monitoring configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
  /// Enable Prometheus metrics export.
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Metrics server bind address.
  #[serde(default = "default_metrics_addr")]
  pub bind_address: String,
  /// Health check endpoint port.
  #[serde(default = "default_health_port")]
  pub health_port: u16,
}

impl Default for MetricsConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      bind_address: default_metrics_addr(),
      health_port: default_health_port(),
    }
  }
}

// Default value functions for serde

fn default_log_level() -> String {
  "info".to_string()
}

fn default_true() -> bool {
  true
}

fn default_retention() -> usize {
  2
}

fn default_chain_id() -> u64 {
  1
}

fn default_liqui_url() -> String {
  "https://api.liqui.io".to_string()
}

fn default_timeout_ms() -> u64 {
  10_000
}

fn default_requests_per_second() -> u32 {
  5
}

fn default_interval_ms() -> u64 {
  3_000
}

fn default_data_dir() -> String {
  "data".to_string()
}

fn default_metrics_addr() -> String {
  "0.0.0.0:9090".to_string()
}

fn default_health_port() -> u16 {
  8080
}
