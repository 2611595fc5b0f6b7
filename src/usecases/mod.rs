//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain logic with port interfaces to implement the
//! reserve's workflows:
//! - `ReserveCore`: audited trades, deposits, withdrawals and rate updates
//! - `ReserveData`: versioned read envelopes over the snapshot stores
//! - `Fetcher`: periodic writer of fresh snapshots

pub mod fetcher;
pub mod reserve_core;
pub mod reserve_data;

pub use fetcher::{CycleVersions, Fetcher};
pub use reserve_core::ReserveCore;
pub use reserve_data::{BalanceResponse, DataResponse, DataStores, RateResponse, ReserveData};
