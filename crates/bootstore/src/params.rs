//! C3: the mapping `binding -> BootDataStore`. All mutations serialise MAC
//! and NID identities down to a binding key before touching the KV store.

use std::sync::Arc;

use collaborators::StateManagerClient;
use kvstore::KvStore;
use models::{
    binding::{nid_binding, params_key, PARAMS_PREFIX},
    BootDataStore, BootParams, BootParamsEntry, ImageType, Selector,
};

use crate::{cloud_init::merge_cloud_init, error::BootstoreError, images::ImageRegistry};

pub struct ParamStore {
    kv: Arc<dyn KvStore>,
    images: Arc<ImageRegistry>,
    state_manager: Arc<dyn StateManagerClient>,
}

impl ParamStore {
    pub fn new(
        kv: Arc<dyn KvStore>,
        images: Arc<ImageRegistry>,
        state_manager: Arc<dyn StateManagerClient>,
    ) -> Self {
        Self {
            kv,
            images,
            state_manager,
        }
    }

    /// Expands a request's selector into concrete binding keys. MACs/NIDs
    /// that the inventory cannot resolve fall back to their raw/`nid<N>`
    /// form so the record survives until inventory catches up.
    async fn resolve_bindings(&self, selector: &Selector<'_>) -> Result<Vec<String>, BootstoreError> {
        match selector {
            Selector::Hosts(hosts) => Ok(hosts.iter().map(|h| h.to_string()).collect()),
            Selector::Macs(macs) => {
                let mut bindings = Vec::with_capacity(macs.len());
                for mac in macs.iter() {
                    let binding = match self.state_manager.get_by_mac(mac).await? {
                        Some(component) => component.id,
                        None => mac.to_string(),
                    };
                    bindings.push(binding);
                }
                Ok(bindings)
            }
            Selector::Nids(nids) => {
                let mut bindings = Vec::with_capacity(nids.len());
                for nid in nids.iter() {
                    let nid = *nid as u32;
                    let binding = match self.state_manager.get_by_nid(nid).await? {
                        Some(component) => component.id,
                        None => nid_binding(nid),
                    };
                    bindings.push(binding);
                }
                Ok(bindings)
            }
            Selector::ImageOnly => Ok(Vec::new()),
        }
    }

    /// First-wins mutual exclusion for POST semantics: rejects if any
    /// binding or image in `req` already exists.
    pub async fn store_new(&self, req: &BootParams) -> Result<(), BootstoreError> {
        let selector = req.selector();
        let bindings = self.resolve_bindings(&selector).await?;

        for binding in &bindings {
            if self.kv.get(&params_key(binding)).await?.is_some() {
                return Err(BootstoreError::Conflict(binding.clone()));
            }
        }

        if bindings.is_empty() && req.has_kernel_or_initrd() {
            if !req.kernel.is_empty() && self.images.find_image(&req.kernel, ImageType::Kernel).await?.is_some() {
                return Err(BootstoreError::Conflict(req.kernel.clone()));
            }
            if !req.initrd.is_empty() && self.images.find_image(&req.initrd, ImageType::Initrd).await?.is_some() {
                return Err(BootstoreError::Conflict(req.initrd.clone()));
            }
        }

        self.store(req).await
    }

    /// PUT semantics: overwrites bindings; rewrites an image's own `params`
    /// when the request carries no binding selector.
    pub async fn store(&self, req: &BootParams) -> Result<(), BootstoreError> {
        let selector = req.selector();
        let bindings = self.resolve_bindings(&selector).await?;

        if bindings.is_empty() {
            return self.store_image_only(req).await;
        }

        let kernel_id = self.allocate_image(&req.kernel, ImageType::Kernel).await?;
        let initrd_id = self.allocate_image(&req.initrd, ImageType::Initrd).await?;

        for binding in &bindings {
            let data = BootDataStore {
                params: req.params.clone(),
                kernel: kernel_id.clone().unwrap_or_default(),
                initrd: initrd_id.clone().unwrap_or_default(),
                cloud_init: req.cloud_init.clone(),
            };
            self.kv
                .store(&params_key(binding), &serde_json::to_string(&data).expect("BootDataStore always serialises"))
                .await?;
        }
        Ok(())
    }

    async fn store_image_only(&self, req: &BootParams) -> Result<(), BootstoreError> {
        if !req.kernel.is_empty() {
            let id = self.images.store_image(&req.kernel, ImageType::Kernel).await?;
            self.images.set_image_params(&id, &req.params).await?;
        }
        if !req.initrd.is_empty() {
            let id = self.images.store_image(&req.initrd, ImageType::Initrd).await?;
            self.images.set_image_params(&id, &req.params).await?;
        }
        Ok(())
    }

    async fn allocate_image(&self, path: &str, imtype: ImageType) -> Result<Option<String>, BootstoreError> {
        if path.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.images.store_image(path, imtype).await?))
    }

    /// PATCH semantics. Bindings are processed independently: one binding's
    /// not-found error does not stop the others, but the first error
    /// encountered is what the caller ultimately sees.
    pub async fn update(&self, req: &BootParams) -> Result<(), BootstoreError> {
        let selector = req.selector();
        let bindings = self.resolve_bindings(&selector).await?;

        let mut first_error = None;
        for binding in &bindings {
            if let Err(e) = self.update_one(binding, req).await {
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Stores any non-empty kernel/initrd *before* checking that `binding`
    /// exists, so a PATCH against a binding that turns out not to exist
    /// still leaves the image registered -- an orphan, tolerated rather
    /// than rolled back (matching the reference behaviour).
    async fn update_one(&self, binding: &str, req: &BootParams) -> Result<(), BootstoreError> {
        let kernel_id = if !req.kernel.is_empty() {
            Some(self.images.store_image(&req.kernel, ImageType::Kernel).await?)
        } else {
            None
        };
        let initrd_id = if !req.initrd.is_empty() {
            Some(self.images.store_image(&req.initrd, ImageType::Initrd).await?)
        } else {
            None
        };

        let key = params_key(binding);
        let raw = self
            .kv
            .get(&key)
            .await?
            .ok_or_else(|| BootstoreError::BindingNotFound(binding.to_string()))?;
        let mut data: BootDataStore =
            serde_json::from_str(&raw).map_err(|e| BootstoreError::Corrupt(key.clone(), e.to_string()))?;

        let mut changed = false;

        if !req.params.is_empty() && req.params != data.params {
            data.params = req.params.clone();
            changed = true;
        }
        if let Some(id) = kernel_id {
            if id != data.kernel {
                data.kernel = id;
                changed = true;
            }
        }
        if let Some(id) = initrd_id {
            if id != data.initrd {
                data.initrd = id;
                changed = true;
            }
        }
        if merge_cloud_init(&mut data.cloud_init, &req.cloud_init) {
            changed = true;
        }

        if changed {
            self.kv
                .store(&key, &serde_json::to_string(&data).expect("BootDataStore always serialises"))
                .await?;
        }
        Ok(())
    }

    /// Deletes every named binding and every named image. Errors accumulate
    /// but do not stop the walk; the first is surfaced.
    pub async fn remove(&self, req: &BootParams) -> Result<(), BootstoreError> {
        let selector = req.selector();
        let bindings = self.resolve_bindings(&selector).await?;

        let mut first_error = None;

        for binding in &bindings {
            if let Err(e) = self.kv.delete(&params_key(binding)).await {
                first_error.get_or_insert(BootstoreError::from(e));
            }
        }

        if !req.kernel.is_empty() {
            if let Err(e) = self.images.remove_image(&req.kernel, ImageType::Kernel).await {
                first_error.get_or_insert(e);
            }
        }
        if !req.initrd.is_empty() {
            if let Err(e) = self.images.remove_image(&req.initrd, ImageType::Initrd).await {
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub async fn list_names(&self) -> Result<Vec<String>, BootstoreError> {
        let entries = self.kv.get_prefix(PARAMS_PREFIX).await?;
        Ok(entries
            .into_iter()
            .map(|(key, _)| key.trim_start_matches(PARAMS_PREFIX).to_string())
            .collect())
    }

    pub async fn get_all(&self) -> Result<Vec<BootParamsEntry>, BootstoreError> {
        let entries = self.kv.get_prefix(PARAMS_PREFIX).await?;
        let mut out = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let binding = key.trim_start_matches(PARAMS_PREFIX).to_string();
            out.push(self.entry_for(&binding, &value).await?);
        }
        Ok(out)
    }

    /// Filters by `req`'s selector (hosts/macs/nids), the same precedence
    /// `store`/`update`/`remove` use. Bindings the selector names but that
    /// don't exist are simply omitted rather than erroring.
    pub async fn get_filtered(&self, req: &BootParams) -> Result<Vec<BootParamsEntry>, BootstoreError> {
        let selector = req.selector();
        let bindings = self.resolve_bindings(&selector).await?;
        let mut out = Vec::with_capacity(bindings.len());
        for binding in &bindings {
            if let Some(entry) = self.get_binding(binding).await? {
                out.push(entry);
            }
        }
        Ok(out)
    }

    pub async fn get_binding(&self, binding: &str) -> Result<Option<BootParamsEntry>, BootstoreError> {
        let key = params_key(binding);
        match self.kv.get(&key).await? {
            Some(value) => Ok(Some(self.entry_for(binding, &value).await?)),
            None => Ok(None),
        }
    }

    async fn entry_for(&self, binding: &str, raw: &str) -> Result<BootParamsEntry, BootstoreError> {
        let data: BootDataStore =
            serde_json::from_str(raw).map_err(|e| BootstoreError::Corrupt(binding.to_string(), e.to_string()))?;

        let kernel = self.dereference(&data.kernel).await?;
        let initrd = self.dereference(&data.initrd).await?;

        Ok(BootParamsEntry {
            hosts: vec![binding.to_string()],
            params: data.params,
            kernel,
            initrd,
            cloud_init: data.cloud_init,
        })
    }

    /// A dangling or empty image id resolves to an empty path rather than
    /// an error (see the data model's tolerance for dangling references).
    async fn dereference(&self, image_id: &str) -> Result<String, BootstoreError> {
        if image_id.is_empty() {
            return Ok(String::new());
        }
        match self.images.get_image(image_id).await {
            Ok(data) => Ok(data.path),
            Err(BootstoreError::ImageNotFound(_)) => Ok(String::new()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collaborators::FakeStateManagerClient;
    use kvstore::MemoryKv;
    use models::CloudInit;

    fn store() -> ParamStore {
        let kv: Arc<dyn KvStore> = Arc::new(MemoryKv::new());
        let images = Arc::new(ImageRegistry::new(kv.clone()));
        let sm: Arc<dyn StateManagerClient> = Arc::new(FakeStateManagerClient::new());
        ParamStore::new(kv, images, sm)
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let s = store();
        let req = BootParams {
            hosts: vec!["x0".into()],
            params: "quiet".into(),
            kernel: "http://img/k".into(),
            initrd: "http://img/i".into(),
            ..Default::default()
        };
        s.store(&req).await.unwrap();

        let entry = s.get_binding("x0").await.unwrap().unwrap();
        assert_eq!(entry.params, "quiet");
        assert_eq!(entry.kernel, "http://img/k");
        assert_eq!(entry.initrd, "http://img/i");
    }

    #[tokio::test]
    async fn store_new_rejects_existing_binding() {
        let s = store();
        let req = BootParams {
            hosts: vec!["x0".into()],
            ..Default::default()
        };
        s.store_new(&req).await.unwrap();
        assert!(matches!(s.store_new(&req).await, Err(BootstoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn patch_does_not_null_kernel_when_absent() {
        let s = store();
        s.store(&BootParams {
            hosts: vec!["x0".into()],
            kernel: "http://img/k".into(),
            ..Default::default()
        })
        .await
        .unwrap();

        s.update(&BootParams {
            hosts: vec!["x0".into()],
            params: "console=ttyS0".into(),
            ..Default::default()
        })
        .await
        .unwrap();

        let entry = s.get_binding("x0").await.unwrap().unwrap();
        assert_eq!(entry.kernel, "http://img/k");
        assert_eq!(entry.params, "console=ttyS0");
    }

    #[tokio::test]
    async fn patch_against_unknown_binding_errors() {
        let s = store();
        let res = s
            .update(&BootParams {
                hosts: vec!["does-not-exist".into()],
                params: "x".into(),
                ..Default::default()
            })
            .await;
        assert!(matches!(res, Err(BootstoreError::BindingNotFound(_))));
    }

    #[tokio::test]
    async fn patch_against_unknown_binding_still_registers_the_image() {
        let s = store();
        let res = s
            .update(&BootParams {
                hosts: vec!["does-not-exist".into()],
                kernel: "http://img/orphan".into(),
                ..Default::default()
            })
            .await;
        assert!(matches!(res, Err(BootstoreError::BindingNotFound(_))));

        let id = s.images.find_image("http://img/orphan", ImageType::Kernel).await.unwrap();
        assert!(id.is_some(), "image must be registered even though the binding patch failed");
    }

    #[tokio::test]
    async fn cascading_delete_clears_shared_kernel() {
        let s = store();
        s.store(&BootParams {
            hosts: vec!["x0".into()],
            kernel: "http://img/shared".into(),
            ..Default::default()
        })
        .await
        .unwrap();
        s.store(&BootParams {
            hosts: vec!["x1".into()],
            kernel: "http://img/shared".into(),
            ..Default::default()
        })
        .await
        .unwrap();

        s.remove(&BootParams {
            kernel: "http://img/shared".into(),
            ..Default::default()
        })
        .await
        .unwrap();

        assert_eq!(s.get_binding("x0").await.unwrap().unwrap().kernel, "");
        assert_eq!(s.get_binding("x1").await.unwrap().unwrap().kernel, "");
    }

    #[tokio::test]
    async fn get_filtered_selects_by_hosts_selector() {
        let s = store();
        s.store(&BootParams {
            hosts: vec!["x0".into()],
            params: "quiet".into(),
            ..Default::default()
        })
        .await
        .unwrap();
        s.store(&BootParams {
            hosts: vec!["x1".into()],
            params: "noisy".into(),
            ..Default::default()
        })
        .await
        .unwrap();

        let filtered = s
            .get_filtered(&BootParams {
                hosts: vec!["x0".into()],
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].params, "quiet");
    }

    #[tokio::test]
    async fn mac_resolves_through_state_manager_falls_back_to_raw() {
        let s = store();
        s.store(&BootParams {
            macs: vec!["aa:bb:cc".into()],
            params: "p".into(),
            ..Default::default()
        })
        .await
        .unwrap();

        let entry = s.get_binding("aa:bb:cc").await.unwrap().unwrap();
        assert_eq!(entry.params, "p");
    }

    #[tokio::test]
    async fn cloud_init_merge_via_patch() {
        let s = store();
        s.store(&BootParams {
            hosts: vec!["x0".into()],
            cloud_init: CloudInit {
                user_data: Some(serde_json::json!({"a": 1, "b": 2})),
                ..Default::default()
            },
            ..Default::default()
        })
        .await
        .unwrap();

        s.update(&BootParams {
            hosts: vec!["x0".into()],
            cloud_init: CloudInit {
                user_data: Some(serde_json::json!({"b": null, "c": 3})),
                ..Default::default()
            },
            ..Default::default()
        })
        .await
        .unwrap();

        let entry = s.get_binding("x0").await.unwrap().unwrap();
        assert_eq!(
            entry.cloud_init.user_data,
            Some(serde_json::json!({"a": 1, "c": 3}))
        );
    }
}
