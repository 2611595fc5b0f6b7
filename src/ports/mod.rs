//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the usecases layer requires
//! from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `Exchange`: Centralized exchange trading, withdrawals and data fetch
//! - `Blockchain`: On-chain transfers, rate publishing and balances
//! - `SnapshotStore`: Versioned per-domain market data snapshots
//! - `ActivityLog`: Append-only audit trail

pub mod activity;
pub mod blockchain;
pub mod exchange;
pub mod storage;

pub use activity::ActivityLog;
pub use blockchain::Blockchain;
pub use exchange::Exchange;
pub use storage::{SnapshotStore, Version};
