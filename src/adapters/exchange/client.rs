//! Liqui HTTP Client - Rate-limited REST Endpoint
//!
//! Implements `LiquiEndpoint` over reqwest. Public depth requests are
//! retried with exponential backoff; signed trading calls are sent
//! exactly once since they are not idempotent.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use anyhow::{Context, Result};
use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

use crate::domain::error::ExchangeError;
use crate::domain::market::TradeType;

use super::auth::LiquiAuth;
use super::liqui::LiquiEndpoint;
use super::types::{ApiResponse, DepthResponse, InfoReturn, TradeReturn, WithdrawReturn};

/// Configuration for the Liqui HTTP client.
#[derive(Debug, Clone)]
pub struct LiquiClientConfig {
  /// Base URL, without trailing slash.
  pub base_url: String,
  pub timeout: Duration,
  /// Request budget shared by public and private calls.
  pub requests_per_second: u32,
  /// Retries for public requests only.
  pub max_retries: u32,
  pub retry_base_delay: Duration,
}

impl Default for LiquiClientConfig {
  fn default() -> Self {
    Self {
      base_url: "https://api.liqui.io".to_string(),
      timeout: Duration::from_secs(10),
      requests_per_second: 5,
      max_retries: 2,
      retry_base_delay: Duration::from_millis(200),
    }
  }
}

/// Rate-limited HTTP endpoint for the Liqui API.
pub struct LiquiHttp {
  http: Client,
  auth: Arc<LiquiAuth>,
  config: LiquiClientConfig,
  limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
  /// Held from nonce allocation until the signed request is sent.
  private: Mutex<()>,
}

impl LiquiHttp {
  pub fn new(auth: Arc<LiquiAuth>, config: LiquiClientConfig) -> Result<Self> {
    let http = Client::builder()
      .timeout(config.timeout)
      .pool_max_idle_per_host(5)
      .build()
      .context("Failed to build HTTP client")?;

    let rps = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
    let limiter = RateLimiter::direct(Quota::per_second(rps));

    Ok(Self {
      http,
      auth,
      config,
      limiter,
      private: Mutex::new(()),
    })
  }

  /// GET a public endpoint, retrying transport and 5xx failures.
  async fn get_public(&self, path: &str) -> Result<serde_json::Value, ExchangeError> {
    let url = format!("{}{}", self.config.base_url, path);
    let mut last_error = ExchangeError::Transport("no attempt made".into());

    for attempt in 0..=self.config.max_retries {
      if attempt > 0 {
        let delay = self.config.retry_base_delay * 2u32.pow(attempt - 1);
        debug!(attempt, delay_ms = delay.as_millis(), "Retrying request");
        sleep(delay).await;
      }
      self.limiter.until_ready().await;

      match self.http.get(&url).send().await {
        Ok(resp) if resp.status().is_server_error() => {
          warn!(status = %resp.status(), "Server error, retrying");
          last_error = ExchangeError::Transport(format!("server error {}", resp.status()));
        }
        Ok(resp) => return decode(resp).await,
        Err(e) => {
          warn!(error = %e, attempt, "Request failed");
          last_error = ExchangeError::Transport(e.to_string());
        }
      }
    }

    Err(last_error)
  }

  /// POST a signed trading API call. Not retried.
  ///
  /// Liqui rejects any nonce lower than the last one it accepted, so
  /// private calls are sent one at a time with the nonce taken after the
  /// rate limiter wait.
  async fn post_private<T: DeserializeOwned>(
    &self,
    method: &str,
    params: &[(&str, String)],
  ) -> Result<T, ExchangeError> {
    let resp = {
      let _guard = self.private.lock().await;
      self.limiter.until_ready().await;

      let body = encode_body(method, self.auth.next_nonce(), params);
      let signature = self.auth.sign(&body);
      self
        .http
        .post(format!("{}/tapi", self.config.base_url))
        .header("Content-Type", "application/x-www-form-urlencoded")
        .header("Key", self.auth.api_key())
        .header("Sign", signature)
        .body(body)
        .send()
        .await
        .map_err(|e| ExchangeError::Transport(e.to_string()))?
    };

    let value = decode(resp).await?;
    let envelope: ApiResponse<T> =
      serde_json::from_value(value).map_err(|e| ExchangeError::Decode(e.to_string()))?;
    envelope.into_result()
  }
}

#[async_trait]
impl LiquiEndpoint for LiquiHttp {
  #[instrument(skip(self))]
  async fn depth(&self, pairs: &str) -> Result<DepthResponse, ExchangeError> {
    let value = self
      .get_public(&format!("/api/3/depth/{pairs}?ignore_invalid=1"))
      .await?;

    // Public errors come back as 200 with {"success":0,"error":..}.
    if value.get("success").and_then(serde_json::Value::as_i64) == Some(0) {
      let error = value
        .get("error")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("unknown error");
      return Err(ExchangeError::Rejected(error.to_string()));
    }

    serde_json::from_value(value).map_err(|e| ExchangeError::Decode(e.to_string()))
  }

  #[instrument(skip(self))]
  async fn get_info(&self) -> Result<InfoReturn, ExchangeError> {
    self.post_private("getInfo", &[]).await
  }

  #[instrument(skip(self))]
  async fn trade(
    &self,
    pair: &str,
    trade_type: TradeType,
    rate: f64,
    amount: f64,
  ) -> Result<TradeReturn, ExchangeError> {
    self
      .post_private(
        "Trade",
        &[
          ("pair", pair.to_string()),
          ("type", trade_type.to_string()),
          ("rate", rate.to_string()),
          ("amount", amount.to_string()),
        ],
      )
      .await
  }

  #[instrument(skip(self))]
  async fn withdraw(
    &self,
    coin: &str,
    amount: f64,
    address: Address,
  ) -> Result<(), ExchangeError> {
    let ret: WithdrawReturn = self
      .post_private(
        "WithdrawCoin",
        &[
          ("coinName", coin.to_string()),
          ("amount", amount.to_string()),
          ("address", address.to_string()),
        ],
      )
      .await?;
    debug!(transaction_id = ret.transaction_id, "Withdrawal accepted");
    Ok(())
  }
}

async fn decode(resp: reqwest::Response) -> Result<serde_json::Value, ExchangeError> {
  let status = resp.status();
  if !status.is_success() {
    let body = resp.text().await.unwrap_or_default();
    return Err(ExchangeError::Rejected(format!("HTTP {status}: {body}")));
  }
  resp
    .json()
    .await
    .map_err(|e| ExchangeError::Decode(e.to_string()))
}

/// Urlencoded trading API body; `method` and `nonce` always lead.
fn encode_body(method: &str, nonce: u64, params: &[(&str, String)]) -> String {
  let mut body = format!("method={method}&nonce={nonce}");
  for (key, value) in params {
    body.push('&');
    body.push_str(key);
    body.push('=');
    body.push_str(&urlencoding::encode(value));
  }
  body
}
