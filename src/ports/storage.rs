//! Storage Port - Versioned Snapshot Store Interface
//!
//! One store instance per data domain (price, balance, exchange
//! balance, rate). Writers replace the whole payload; readers see
//! immutable snapshots addressed by version.
//!
//! Versions are strictly increasing per store and never reused. Only a
//! bounded window of recent versions is retained.

use std::sync::Arc;

use crate::domain::error::StoreError;

/// Monotonic per-store version number. The first write is version 1.
pub type Version = u64;

/// Multiple-reader / single-writer versioned snapshot store.
///
/// All methods are in-memory and never block on I/O, so the trait is
/// synchronous.
pub trait SnapshotStore<T>: Send + Sync {
  /// Latest written version.
  ///
  /// # Errors
  /// `StoreError::NotInitialized` if nothing was ever written.
  fn current_version(&self) -> Result<Version, StoreError>;

  /// Snapshot stored under `version`.
  ///
  /// # Errors
  /// `StoreError::VersionNotFound` if the version was never written or
  /// has been evicted by retention.
  fn read(&self, version: Version) -> Result<Arc<T>, StoreError>;

  /// Latest version and its snapshot, observed under a single lock
  /// acquisition.
  ///
  /// Calling `current_version()` then `read(v)` is not atomic: two
  /// writes landing in between evict `v`. Readers that need the latest
  /// data should use this instead.
  fn read_current(&self) -> Result<(Version, Arc<T>), StoreError>;

  /// Store a new snapshot, evict versions outside the retention window
  /// and return the newly assigned version.
  fn write(&self, data: T) -> Version;
}
