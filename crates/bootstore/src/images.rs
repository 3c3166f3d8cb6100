//! C2: content-addressed registry of kernel/initrd images.

use std::sync::Arc;

use dashmap::DashMap;
use kvstore::KvStore;
use models::{image_key, image_type_prefix, ImageData, ImageType};

use crate::error::BootstoreError;

/// Distributed-lock name guarding image registry writes and reference
/// cleanup. Parameter-store writes never take this lock (see the
/// concurrency design's note on lock scope).
const IMAGE_LOCK: &str = "bss/image-registry";

pub struct ImageRegistry {
    kv: Arc<dyn KvStore>,
    cache: DashMap<String, ImageData>,
}

impl ImageRegistry {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self {
            kv,
            cache: DashMap::new(),
        }
    }

    /// Linear scan of the `imtype` range, lock-free.
    pub async fn find_image(
        &self,
        path: &str,
        imtype: ImageType,
    ) -> Result<Option<String>, BootstoreError> {
        let prefix = image_type_prefix(imtype);
        let entries = self.kv.get_prefix(&prefix).await?;
        for (key, value) in entries {
            let data: ImageData = serde_json::from_str(&value)
                .map_err(|e| BootstoreError::Corrupt(key.clone(), e.to_string()))?;
            if data.path == path {
                return Ok(Some(key));
            }
        }
        Ok(None)
    }

    /// Idempotent: returns the existing id on a hit, else creates a new entry.
    pub async fn store_image(
        &self,
        path: &str,
        imtype: ImageType,
    ) -> Result<String, BootstoreError> {
        let lease = config::settings().kv.lock_lease();
        let handle = self.kv.dist_lock(IMAGE_LOCK, lease).await?;

        let result = async {
            if let Some(existing) = self.find_image(path, imtype).await? {
                return Ok(existing);
            }
            let id = image_key(imtype, path);
            let data = ImageData {
                path: path.to_string(),
                params: String::new(),
            };
            self.kv
                .store(&id, &serde_json::to_string(&data).expect("ImageData always serialises"))
                .await?;
            Ok(id)
        }
        .await;

        self.kv.dist_unlock(handle).await?;
        result
    }

    /// Reads through a cache that is invalidated on delete only.
    pub async fn get_image(&self, id: &str) -> Result<ImageData, BootstoreError> {
        if let Some(cached) = self.cache.get(id) {
            return Ok(cached.clone());
        }
        let raw = self
            .kv
            .get(id)
            .await?
            .ok_or_else(|| BootstoreError::ImageNotFound(id.to_string()))?;
        let data: ImageData =
            serde_json::from_str(&raw).map_err(|e| BootstoreError::Corrupt(id.to_string(), e.to_string()))?;
        self.cache.insert(id.to_string(), data.clone());
        Ok(data)
    }

    /// Overwrites an existing image's own `params` fragment.
    pub async fn set_image_params(&self, id: &str, params: &str) -> Result<(), BootstoreError> {
        let mut data = self.get_image(id).await?;
        data.params = params.to_string();
        self.kv
            .store(id, &serde_json::to_string(&data).expect("ImageData always serialises"))
            .await?;
        self.cache.insert(id.to_string(), data);
        Ok(())
    }

    pub async fn list_images(&self, imtype: ImageType) -> Result<Vec<ImageData>, BootstoreError> {
        let prefix = image_type_prefix(imtype);
        let entries = self.kv.get_prefix(&prefix).await?;
        entries
            .into_iter()
            .map(|(key, value)| {
                serde_json::from_str(&value).map_err(|e| BootstoreError::Corrupt(key, e.to_string()))
            })
            .collect()
    }

    /// Deletes the image named by `path`/`imtype` if it exists, invalidates
    /// the cache entry, and clears the reference from every `BootDataStore`
    /// that named it. A no-op (not an error) if no such image exists.
    pub async fn remove_image(&self, path: &str, imtype: ImageType) -> Result<(), BootstoreError> {
        let lease = config::settings().kv.lock_lease();
        let handle = self.kv.dist_lock(IMAGE_LOCK, lease).await?;

        let result = async {
            let Some(id) = self.find_image(path, imtype).await? else {
                return Ok(());
            };
            self.kv.delete(&id).await?;
            self.cache.remove(&id);
            self.clear_references(&id).await
        }
        .await;

        self.kv.dist_unlock(handle).await?;
        result
    }

    /// Scans every `BootDataStore` and nulls out `kernel`/`initrd` fields
    /// that referenced the now-deleted image id. O(bindings); see the
    /// design notes on reverse-index cost for the reasoning behind this scan.
    async fn clear_references(&self, image_id: &str) -> Result<(), BootstoreError> {
        let entries = self.kv.get_prefix(models::binding::PARAMS_PREFIX).await?;
        for (key, value) in entries {
            let mut data: models::BootDataStore = serde_json::from_str(&value)
                .map_err(|e| BootstoreError::Corrupt(key.clone(), e.to_string()))?;

            let mut changed = false;
            if data.kernel == image_id {
                data.kernel.clear();
                changed = true;
            }
            if data.initrd == image_id {
                data.initrd.clear();
                changed = true;
            }
            if changed {
                self.kv
                    .store(&key, &serde_json::to_string(&data).expect("BootDataStore always serialises"))
                    .await?;
            }
        }
        Ok(())
    }
}
