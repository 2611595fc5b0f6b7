//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::AppConfig;

/// Exchanges this build can connect to.
const SUPPORTED_EXCHANGES: &[&str] = &["liqui"];

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails (including malformed addresses)
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config = parse_config(&content)?;

  info!(
    tokens = config.tokens.len(),
    exchanges = config.exchanges.len(),
    retention = config.storage.retention,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  let config: AppConfig = toml::from_str(content)
    .with_context(|| "Failed to parse config.toml")?;

  validate_config(&config)?;
  Ok(config)
}

/// Validate all configuration parameters.
///
/// Checks for:
/// - Non-empty, unique token definitions
/// - Retention window of at least two versions
/// - Unique exchange names
/// - Pairs and deposit addresses referencing configured tokens
/// - Positive intervals and timeouts
fn validate_config(config: &AppConfig) -> Result<()> {
  // Token validation
  anyhow::ensure!(
    !config.tokens.is_empty(),
    "At least one token must be configured"
  );

  let mut seen = HashSet::new();
  for token in &config.tokens {
    anyhow::ensure!(!token.id.is_empty(), "Token with empty id");
    anyhow::ensure!(
      seen.insert(token.id.as_str()),
      "Token {} is configured twice",
      token.id
    );
    anyhow::ensure!(
      token.decimals <= 36,
      "Token {} has implausible decimals {}",
      token.id,
      token.decimals
    );
  }

  // Storage validation
  anyhow::ensure!(
    config.storage.retention >= 2,
    "storage.retention must be at least 2, got {}",
    config.storage.retention
  );

  // Chain validation
  anyhow::ensure!(
    !config.chain.rpc_url.is_empty(),
    "chain.rpc_url must not be empty"
  );

  // Exchange validation
  let registry = config.token_registry();
  let mut exchange_names = HashSet::new();
  for exchange in &config.exchanges {
    anyhow::ensure!(
      SUPPORTED_EXCHANGES.contains(&exchange.name.as_str()),
      "Unsupported exchange {}",
      exchange.name
    );
    anyhow::ensure!(
      exchange_names.insert(exchange.name.as_str()),
      "Exchange {} is configured twice",
      exchange.name
    );
    anyhow::ensure!(
      exchange.timeout_ms > 0,
      "Exchange {} timeout_ms must be positive",
      exchange.name
    );
    anyhow::ensure!(
      exchange.requests_per_second > 0,
      "Exchange {} requests_per_second must be positive",
      exchange.name
    );
    for pair in &exchange.pairs {
      registry
        .parse_pair(pair)
        .with_context(|| format!("Exchange {} pair {}", exchange.name, pair))?;
    }
    for token in exchange.addresses.keys() {
      registry
        .get(token)
        .with_context(|| format!("Exchange {} deposit address", exchange.name))?;
    }
  }

  // Fetcher validation
  anyhow::ensure!(
    config.fetcher.interval_ms > 0,
    "fetcher.interval_ms must be positive"
  );

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  const BASE: &str = r#"
[service]
name = "reserve"

[[tokens]]
id = "ETH"
address = "0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee"
decimals = 18

[[tokens]]
id = "KNC"
address = "0xdd974d5c2e2928dea5f71b9825b8b646686bd200"
decimals = 18

[chain]
rpc_url = "http://localhost:8545"
reserve_address = "0x0000000000000000000000000000000000000001"
pricing_address = "0x0000000000000000000000000000000000000002"
reserve_manager = "0x0000000000000000000000000000000000000003"

[[exchanges]]
name = "liqui"
pairs = ["KNC-ETH"]

[exchanges.addresses]
KNC = "0x0000000000000000000000000000000000000004"
"#;

  #[test]
  fn test_load_nonexistent_file() {
    let result = load_config("nonexistent.toml");
    assert!(result.is_err());
  }

  #[test]
  fn test_defaults_applied() {
    let config = parse_config(BASE).unwrap();
    assert_eq!(config.storage.retention, 2);
    assert_eq!(config.fetcher.interval_ms, 3_000);
    assert_eq!(config.service.log_level, "info");
    assert_eq!(config.exchanges[0].base_url, "https://api.liqui.io");
    assert_eq!(config.token_registry().len(), 2);
  }

  #[test]
  fn test_retention_below_two_rejected() {
    let toml = format!("{BASE}\n[storage]\nretention = 1\n");
    let err = parse_config(&toml).unwrap_err();
    assert!(err.to_string().contains("retention"));
  }

  #[test]
  fn test_pair_with_unknown_token_rejected() {
    let toml = BASE.replace("\"KNC-ETH\"", "\"OMG-ETH\"");
    assert!(parse_config(&toml).is_err());
  }

  #[test]
  fn test_duplicate_token_rejected() {
    let toml = BASE.replace("id = \"KNC\"", "id = \"ETH\"");
    let err = parse_config(&toml).unwrap_err();
    assert!(err.to_string().contains("configured twice"));
  }

  #[test]
  fn test_duplicate_exchange_rejected() {
    let toml = format!("{BASE}\n[[exchanges]]\nname = \"liqui\"\npairs = []\n");
    let err = parse_config(&toml).unwrap_err();
    assert!(err.to_string().contains("configured twice"));
  }

  #[test]
  fn test_malformed_address_rejected() {
    let toml = BASE.replace("0x0000000000000000000000000000000000000001", "0x1234");
    assert!(parse_config(&toml).is_err());
  }
}
