//! Exchange Adapters - Centralized Exchange Integrations
//!
//! One `Exchange` implementation per exchange. Currently:
//! - `liqui`: Liqui adapter over the `LiquiEndpoint` seam
//! - `client`: reqwest-based `LiquiEndpoint` with signing and rate limiting

pub mod auth;
pub mod client;
pub mod liqui;
pub mod types;

pub use auth::LiquiAuth;
pub use client::{LiquiClientConfig, LiquiHttp};
pub use liqui::{Liqui, LiquiEndpoint};
