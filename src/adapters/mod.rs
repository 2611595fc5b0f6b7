//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (HTTP clients, blockchain RPC, file I/O).
//! Each sub-module groups adapters by infrastructure concern.
//!
//! Adapter categories:
//! - `activity`: in-memory and JSONL audit logs
//! - `chain`: EVM reserve contracts via alloy-rs
//! - `exchange`: centralized exchange REST clients
//! - `metrics`: Prometheus metrics export and health checks
//! - `storage`: in-memory versioned snapshot stores

pub mod activity;
pub mod chain;
pub mod exchange;
pub mod metrics;
pub mod storage;
