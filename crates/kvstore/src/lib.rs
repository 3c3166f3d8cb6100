//! Copyright (c) 2023 University of New Hampshire
//! SPDX-License-Identifier: MIT
//! C1: a typed wrapper over a transactional KV store, with range scans and a
//! cluster-wide distributed lock. Two backends ship: [`etcd::EtcdKv`] for
//! production, and [`memory::MemoryKv`] for local development and tests.
//! Both implement the same [`KvStore`] trait so the rest of the system never
//! sees which one it is talking to.

pub mod error;
pub mod etcd;
pub mod memory;

use std::time::Duration;

use async_trait::async_trait;

pub use error::StorageError;
pub use etcd::EtcdKv;
pub use memory::MemoryKv;

/// Low ASCII boundary appended to a prefix to begin a range scan of its children.
pub const RANGE_LO_SUFFIX: char = ' '; // 0x20
/// High ASCII boundary appended to a prefix to end a range scan of its children.
pub const RANGE_HI_SUFFIX: char = '~'; // 0x7E

/// `[prefix+RANGE_LO_SUFFIX, prefix+RANGE_HI_SUFFIX]`, the inclusive bounds
/// that enumerate every key stored under `prefix`.
pub fn range_bounds(prefix: &str) -> (String, String) {
    (
        format!("{prefix}{RANGE_LO_SUFFIX}"),
        format!("{prefix}{RANGE_HI_SUFFIX}"),
    )
}

/// An acquired distributed lock. Dropping it without calling
/// [`KvStore::dist_unlock`] leaves the lock held until its lease expires.
pub enum LockHandle {
    Etcd { key: Vec<u8> },
    Memory { _guard: tokio::sync::OwnedMutexGuard<()> },
}

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn store(&self, key: &str, value: &str) -> Result<(), StorageError>;

    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Scans every key `lo <= k <= hi`. Callers normally derive `lo`/`hi`
    /// from [`range_bounds`] for a common prefix.
    async fn get_range(&self, lo: &str, hi: &str) -> Result<Vec<(String, String)>, StorageError>;

    /// All entries stored under `prefix`.
    async fn get_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, StorageError> {
        let (lo, hi) = range_bounds(prefix);
        self.get_range(&lo, &hi).await
    }

    /// Acquires a cluster-wide mutex named `name`, held for at most `lease`.
    async fn dist_lock(&self, name: &str, lease: Duration) -> Result<LockHandle, StorageError>;

    async fn dist_unlock(&self, handle: LockHandle) -> Result<(), StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_bounds_use_space_and_tilde() {
        let (lo, hi) = range_bounds("/params/");
        assert_eq!(lo, "/params/ ");
        assert_eq!(hi, "/params/~");
    }
}
