//! Production [`KvStore`] backend: a real etcd cluster accessed through
//! `etcd-client`, which natively provides both the transactional range-scan
//! KV surface and a cluster-wide lock primitive this adapter needs.

use std::time::Duration;

use etcd_client::{Client, GetOptions, LockOptions};

use crate::{error::StorageError, KvStore, LockHandle};

pub struct EtcdKv {
    client: Client,
    /// Serialises local contenders through the round trip to acquire the
    /// remote lock, per the concurrency model's local-mutex-before-network rule.
    local_lock_gate: tokio::sync::Mutex<()>,
}

impl EtcdKv {
    pub async fn connect(endpoints: &[String]) -> Result<Self, StorageError> {
        let client = Client::connect(endpoints, None)
            .await
            .map_err(StorageError::backend)?;
        Ok(Self {
            client,
            local_lock_gate: tokio::sync::Mutex::new(()),
        })
    }
}

#[async_trait::async_trait]
impl KvStore for EtcdKv {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut kv = self.client.kv_client();
        let resp = kv.get(key, None).await.map_err(StorageError::backend)?;
        match resp.kvs().first() {
            Some(kv) => {
                let value = std::str::from_utf8(kv.value()).map_err(StorageError::backend)?;
                Ok(Some(value.to_string()))
            }
            None => Ok(None),
        }
    }

    async fn store(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut kv = self.client.kv_client();
        kv.put(key, value, None).await.map_err(StorageError::backend)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let mut kv = self.client.kv_client();
        kv.delete(key, None).await.map_err(StorageError::backend)?;
        Ok(())
    }

    async fn get_range(&self, lo: &str, hi: &str) -> Result<Vec<(String, String)>, StorageError> {
        let mut kv = self.client.kv_client();
        let opts = GetOptions::new().with_range(hi.as_bytes().to_vec());
        let resp = kv.get(lo, Some(opts)).await.map_err(StorageError::backend)?;

        resp.kvs()
            .iter()
            .map(|kv| {
                let k = std::str::from_utf8(kv.key())
                    .map_err(StorageError::backend)?
                    .to_string();
                let v = std::str::from_utf8(kv.value())
                    .map_err(StorageError::backend)?
                    .to_string();
                Ok((k, v))
            })
            .collect()
    }

    async fn dist_lock(&self, name: &str, lease: Duration) -> Result<LockHandle, StorageError> {
        let _gate = self.local_lock_gate.lock().await;

        let mut lease_client = self.client.lease_client();
        let lease_resp = lease_client
            .grant(lease.as_secs() as i64, None)
            .await
            .map_err(|e| StorageError::Lock {
                name: name.to_string(),
                source: e.to_string(),
            })?;

        let mut lock_client = self.client.lock_client();
        let lock_resp = lock_client
            .lock(name, Some(LockOptions::new().with_lease(lease_resp.id())))
            .await
            .map_err(|e| StorageError::Lock {
                name: name.to_string(),
                source: e.to_string(),
            })?;

        Ok(LockHandle::Etcd {
            key: lock_resp.key().to_vec(),
        })
    }

    async fn dist_unlock(&self, handle: LockHandle) -> Result<(), StorageError> {
        match handle {
            LockHandle::Etcd { key } => {
                let mut lock_client = self.client.lock_client();
                lock_client.unlock(key).await.map_err(StorageError::backend)?;
                Ok(())
            }
            LockHandle::Memory { .. } => {
                tracing::warn!("asked the etcd backend to unlock a memory-backend lock handle");
                Ok(())
            }
        }
    }
}
