//! Development/test [`KvStore`] backend: an in-process `BTreeMap` guarded by
//! a `parking_lot::RwLock`, with named locks handed out of a `DashMap`.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::RwLock;

use crate::{error::StorageError, KvStore, LockHandle};

#[derive(Default)]
pub struct MemoryKv {
    data: Arc<RwLock<BTreeMap<String, String>>>,
    locks: Arc<DashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl KvStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.data.read().get(key).cloned())
    }

    async fn store(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.data.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.data.write().remove(key);
        Ok(())
    }

    async fn get_range(&self, lo: &str, hi: &str) -> Result<Vec<(String, String)>, StorageError> {
        let data = self.data.read();
        Ok(data
            .range((Bound::Included(lo.to_string()), Bound::Included(hi.to_string())))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn dist_lock(&self, name: &str, _lease: Duration) -> Result<LockHandle, StorageError> {
        let mutex = self
            .locks
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone();
        let guard = mutex.lock_owned().await;
        Ok(LockHandle::Memory { _guard: guard })
    }

    async fn dist_unlock(&self, handle: LockHandle) -> Result<(), StorageError> {
        match handle {
            LockHandle::Memory { _guard } => Ok(()),
            LockHandle::Etcd { .. } => {
                tracing::warn!("asked the memory backend to unlock an etcd-backend lock handle");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stores_and_retrieves() {
        let kv = MemoryKv::new();
        kv.store("/params/Default", "x").await.unwrap();
        assert_eq!(kv.get("/params/Default").await.unwrap(), Some("x".to_string()));
        assert_eq!(kv.get("/params/missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_removes_key() {
        let kv = MemoryKv::new();
        kv.store("/k", "v").await.unwrap();
        kv.delete("/k").await.unwrap();
        assert_eq!(kv.get("/k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn prefix_scan_finds_only_children() {
        let kv = MemoryKv::new();
        kv.store("/params/Default", "a").await.unwrap();
        kv.store("/params/Global", "b").await.unwrap();
        kv.store("/images/kernel/abc", "c").await.unwrap();

        let mut found = kv.get_prefix("/params/").await.unwrap();
        found.sort();
        assert_eq!(
            found,
            vec![
                ("/params/Default".to_string(), "a".to_string()),
                ("/params/Global".to_string(), "b".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn lock_serialises_contenders() {
        let kv = Arc::new(MemoryKv::new());
        let handle = kv.dist_lock("boot", Duration::from_secs(5)).await.unwrap();

        let kv2 = kv.clone();
        let waiter = tokio::spawn(async move {
            kv2.dist_lock("boot", Duration::from_secs(5)).await.unwrap();
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        kv.dist_unlock(handle).await.unwrap();
        waiter.await.unwrap();
    }
}
