//! Storage Adapters - Versioned Snapshot Stores
//!
//! Implements the `SnapshotStore` port in RAM. Snapshots are not
//! persisted; after a restart the next fetch cycle writes version 1.

pub mod ram;

pub use ram::{DEFAULT_RETENTION, RamSnapshotStore};
