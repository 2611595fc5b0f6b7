//! In-memory versioned snapshot store.
//!
//! Implements the `SnapshotStore` port with a `parking_lot::RwLock`
//! around a version counter and a bounded `BTreeMap` of snapshots.
//! Locks are held only for the map lookup/insert.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::domain::error::StoreError;
use crate::ports::storage::{SnapshotStore, Version};

/// Number of versions kept by default: the current one and its predecessor.
pub const DEFAULT_RETENTION: usize = 2;

struct Inner<T> {
    /// Last assigned version; 0 means never written.
    version: Version,
    snapshots: BTreeMap<Version, Arc<T>>,
}

/// RAM-backed store for one data domain.
pub struct RamSnapshotStore<T> {
    /// Domain name, for logs only.
    domain: &'static str,
    retention: usize,
    inner: RwLock<Inner<T>>,
}

impl<T> RamSnapshotStore<T> {
    /// Store with the default retention window of 2.
    pub fn new(domain: &'static str) -> Self {
        Self::with_retention(domain, DEFAULT_RETENTION)
    }

    /// Store retaining the `retention` most recent versions (at least 1).
    pub fn with_retention(domain: &'static str, retention: usize) -> Self {
        Self {
            domain,
            retention: retention.max(1),
            inner: RwLock::new(Inner {
                version: 0,
                snapshots: BTreeMap::new(),
            }),
        }
    }

    pub fn domain(&self) -> &'static str {
        self.domain
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    /// Versions currently held, oldest first.
    pub fn retained_versions(&self) -> Vec<Version> {
        self.inner.read().snapshots.keys().copied().collect()
    }
}

impl<T: Send + Sync> SnapshotStore<T> for RamSnapshotStore<T> {
    fn current_version(&self) -> Result<Version, StoreError> {
        match self.inner.read().version {
            0 => Err(StoreError::NotInitialized),
            v => Ok(v),
        }
    }

    fn read(&self, version: Version) -> Result<Arc<T>, StoreError> {
        self.inner
            .read()
            .snapshots
            .get(&version)
            .cloned()
            .ok_or(StoreError::VersionNotFound(version))
    }

    fn read_current(&self) -> Result<(Version, Arc<T>), StoreError> {
        let inner = self.inner.read();
        if inner.version == 0 {
            return Err(StoreError::NotInitialized);
        }
        inner
            .snapshots
            .get(&inner.version)
            .map(|data| (inner.version, Arc::clone(data)))
            .ok_or(StoreError::VersionNotFound(inner.version))
    }

    fn write(&self, data: T) -> Version {
        let mut inner = self.inner.write();
        inner.version += 1;
        let version = inner.version;
        inner.snapshots.insert(version, Arc::new(data));
        while inner.snapshots.len() > self.retention {
            inner.snapshots.pop_first();
        }
        drop(inner);

        debug!(domain = self.domain, version, "Snapshot stored");
        version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_empty_store_not_initialized() {
        let store: RamSnapshotStore<String> = RamSnapshotStore::new("price");
        assert_eq!(store.current_version(), Err(StoreError::NotInitialized));
        assert_eq!(store.read_current().unwrap_err(), StoreError::NotInitialized);
        assert_eq!(store.read(1).unwrap_err(), StoreError::VersionNotFound(1));
    }

    #[test]
    fn test_write_read_evict_scenario() {
        let store = RamSnapshotStore::new("price");

        assert_eq!(store.write("A"), 1);
        assert_eq!(store.current_version(), Ok(1));
        assert_eq!(*store.read(1).unwrap(), "A");

        assert_eq!(store.write("B"), 2);
        assert_eq!(*store.read(1).unwrap(), "A");
        assert_eq!(*store.read(2).unwrap(), "B");

        assert_eq!(store.write("C"), 3);
        assert_eq!(store.read(1).unwrap_err(), StoreError::VersionNotFound(1));
        assert_eq!(*store.read(2).unwrap(), "B");
        assert_eq!(*store.read(3).unwrap(), "C");
        assert_eq!(store.retained_versions(), vec![2, 3]);
    }

    #[test]
    fn test_sequential_versions_and_retention() {
        let store = RamSnapshotStore::new("rate");
        for k in 1..=20u64 {
            assert_eq!(store.write(k * 10), k);
            assert_eq!(store.current_version(), Ok(k));
            assert_eq!(*store.read(k).unwrap(), k * 10);
            if k >= 2 {
                assert_eq!(*store.read(k - 1).unwrap(), (k - 1) * 10);
            }
            if k >= 3 {
                assert_eq!(
                    store.read(k - 2).unwrap_err(),
                    StoreError::VersionNotFound(k - 2)
                );
            }
        }
    }

    #[test]
    fn test_repeated_reads_identical() {
        let store = RamSnapshotStore::new("balance");
        store.write(vec![1, 2, 3]);
        let a = store.read(1).unwrap();
        let b = store.read(1).unwrap();
        assert_eq!(a, b);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_configurable_retention() {
        let store = RamSnapshotStore::with_retention("ebalance", 3);
        for i in 0..5 {
            store.write(i);
        }
        assert_eq!(store.retained_versions(), vec![3, 4, 5]);
        assert!(store.read(2).is_err());

        let minimal = RamSnapshotStore::with_retention("ebalance", 0);
        assert_eq!(minimal.retention(), 1);
        minimal.write(1);
        minimal.write(2);
        assert_eq!(minimal.retained_versions(), vec![2]);
    }

    #[test]
    fn test_read_current_returns_matching_pair() {
        let store = RamSnapshotStore::new("price");
        store.write("A");
        store.write("B");
        let (version, data) = store.read_current().unwrap();
        assert_eq!(version, 2);
        assert_eq!(*data, "B");
    }

    #[test]
    fn test_split_read_loses_version_after_two_writes() {
        // The two-call read path: observe a version, then two writes land
        // before the read.
        let store = RamSnapshotStore::new("price");
        store.write("A");
        let observed = store.current_version().unwrap();
        store.write("B");
        store.write("C");
        assert_eq!(
            store.read(observed).unwrap_err(),
            StoreError::VersionNotFound(observed)
        );
        // The atomic path is unaffected.
        let (version, data) = store.read_current().unwrap();
        assert_eq!((version, *data), (3, "C"));
    }

    #[test]
    fn test_read_current_never_fails_under_concurrent_writes() {
        let store = Arc::new(RamSnapshotStore::new("price"));
        store.write(0u64);

        let writer = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 1..=5_000u64 {
                    store.write(i);
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let mut last = 0;
                    for _ in 0..5_000 {
                        let (version, data) = store.read_current().unwrap();
                        // Payload i is always written as version i + 1.
                        assert_eq!(*data + 1, version);
                        assert!(version >= last);
                        last = version;
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for r in readers {
            r.join().unwrap();
        }
        assert_eq!(store.current_version(), Ok(5_001));
    }

    #[test]
    fn test_concurrent_writers_get_unique_versions() {
        let store = Arc::new(RamSnapshotStore::new("balance"));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || (0..250).map(|_| store.write(())).collect::<Vec<_>>())
            })
            .collect();

        let mut versions: Vec<Version> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        versions.sort_unstable();
        let expected: Vec<Version> = (1..=2_000).collect();
        assert_eq!(versions, expected);
    }
}
