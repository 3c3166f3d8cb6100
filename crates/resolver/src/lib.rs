//! C5: given any node identity, walks an ordered fallback chain of bindings
//! to locate the most specific `BootData` applicable to it.

pub mod error;

use std::sync::Arc;

use bootstore::ImageRegistry;
use collaborators::StateManagerClient;
use kvstore::KvStore;
use models::{
    binding::{params_key, DEFAULT_TAG, GLOBAL_TAG},
    BootData, BootDataStore, ComponentRecord, ImageData,
};

pub use error::ResolverError;

/// The identity a bootscript or bootparameters lookup is keyed by. The HTTP
/// layer decides which variant applies from its query parameters.
#[derive(Debug, Clone)]
pub enum Identity {
    Xname(String),
    Mac(String),
    Nid(u32),
}

impl Identity {
    fn raw(&self) -> String {
        match self {
            Identity::Xname(x) => x.clone(),
            Identity::Mac(m) => m.clone(),
            Identity::Nid(n) => models::binding::nid_binding(*n),
        }
    }

    /// The query-string `(key, value)` pair this identity was supplied as,
    /// used to rebuild a self-chaining URL back to the bootscript endpoint.
    pub fn query_param(&self) -> (&'static str, String) {
        match self {
            Identity::Xname(x) => ("name", x.clone()),
            Identity::Mac(m) => ("mac", m.clone()),
            Identity::Nid(n) => ("nid", n.to_string()),
        }
    }
}

pub struct Resolver {
    kv: Arc<dyn KvStore>,
    images: Arc<ImageRegistry>,
    state_manager: Arc<dyn StateManagerClient>,
}

impl Resolver {
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

    async fn lookup_component(&self, identity: &Identity) -> Result<Option<ComponentRecord>, ResolverError> {
        let record = match identity {
            Identity::Xname(x) => self.state_manager.get_by_id(x).await?,
            Identity::Mac(m) => self.state_manager.get_by_mac(m).await?,
            Identity::Nid(n) => self.state_manager.get_by_nid(*n).await?,
        };
        Ok(record)
    }

    /// Ordered probe list, earliest-wins: primary xname, the raw identity
    /// (if distinct), role tag, then `Default`. Empty entries are dropped so
    /// an unset role never causes an accidental lookup on tag `""`.
    fn probe_list(identity: &Identity, component: Option<&ComponentRecord>) -> Vec<String> {
        let raw = identity.raw();
        let primary = component.map(|c| c.id.clone()).unwrap_or_else(|| raw.clone());

        let mut probes = vec![primary.clone()];
        if raw != primary {
            probes.push(raw);
        }
        if let Some(role) = component.map(|c| c.role.clone()) {
            if !role.is_empty() {
                probes.push(role);
            }
        }
        probes.push(DEFAULT_TAG.to_string());

        probes.into_iter().filter(|p| !p.is_empty()).collect()
    }

    /// Reads a single binding directly, bypassing the fallback chain. Used
    /// by the discovery flow to resolve `Unknown-<arch>` once `arch` is known.
    pub async fn binding(&self, binding: &str) -> Result<Option<BootData>, ResolverError> {
        self.lookup_binding(binding).await
    }

    async fn lookup_binding(&self, binding: &str) -> Result<Option<BootData>, ResolverError> {
        match self.kv.get(&params_key(binding)).await? {
            None => Ok(None),
            Some(raw) => {
                let store: BootDataStore = serde_json::from_str(&raw)
                    .map_err(|e| ResolverError::Corrupt(binding.to_string(), e.to_string()))?;
                Ok(Some(BootData {
                    params: store.params,
                    kernel: self.dereference(&store.kernel).await?,
                    initrd: self.dereference(&store.initrd).await?,
                    cloud_init: store.cloud_init,
                }))
            }
        }
    }

    async fn dereference(&self, image_id: &str) -> Result<ImageData, ResolverError> {
        if image_id.is_empty() {
            return Ok(ImageData::default());
        }
        match self.images.get_image(image_id).await {
            Ok(data) => Ok(data),
            Err(bootstore::BootstoreError::ImageNotFound(_)) => Ok(ImageData::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Walks the fallback chain for `identity`, returning the first binding
    /// hit (or an empty `BootData` on exhaustion) plus the inventory's
    /// component record if one was found.
    pub async fn resolve(
        &self,
        identity: &Identity,
    ) -> Result<(BootData, Option<ComponentRecord>), ResolverError> {
        let component = self.lookup_component(identity).await?;
        let probes = Self::probe_list(identity, component.as_ref());

        for probe in &probes {
            if let Some(boot_data) = self.lookup_binding(probe).await? {
                return Ok((boot_data, component));
            }
        }

        Ok((BootData::default(), component))
    }

    /// Bypasses the fallback chain and reads the `Global` tag directly.
    pub async fn lookup_global_data(&self) -> Result<BootData, ResolverError> {
        Ok(self.lookup_binding(GLOBAL_TAG).await?.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bootstore::ParamStore;
    use collaborators::FakeStateManagerClient;
    use kvstore::MemoryKv;
    use models::{BootParams, ComponentRecord};

    fn setup() -> (Resolver, ParamStore, Arc<FakeStateManagerClient>) {
        let kv: Arc<dyn KvStore> = Arc::new(MemoryKv::new());
        let images = Arc::new(ImageRegistry::new(kv.clone()));
        let sm = Arc::new(FakeStateManagerClient::new());
        let sm_dyn: Arc<dyn StateManagerClient> = sm.clone();
        let params = ParamStore::new(kv.clone(), images.clone(), sm_dyn.clone());
        let resolver = Resolver::new(kv, images, sm_dyn);
        (resolver, params, sm)
    }

    #[tokio::test]
    async fn falls_back_to_default_when_nothing_more_specific_exists() {
        let (resolver, params, sm) = setup();
        sm.seed(ComponentRecord {
            id: "x0".into(),
            role: "Compute".into(),
            mac: Some("aa:bb".into()),
            nid: None,
            endpoint_enabled: true,
            fqdn: None,
        });
        params
            .store(&BootParams {
                hosts: vec!["Default".into()],
                kernel: "http://img/default-kernel".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        let (boot_data, component) = resolver.resolve(&Identity::Mac("aa:bb".into())).await.unwrap();
        assert_eq!(boot_data.kernel.path, "http://img/default-kernel");
        assert_eq!(component.unwrap().id, "x0");
    }

    #[tokio::test]
    async fn prefers_xname_specific_binding_over_role_and_default() {
        let (resolver, params, sm) = setup();
        sm.seed(ComponentRecord {
            id: "x0".into(),
            role: "Compute".into(),
            mac: Some("aa:bb".into()),
            nid: None,
            endpoint_enabled: true,
            fqdn: None,
        });
        params
            .store(&BootParams {
                hosts: vec!["Compute".into()],
                kernel: "http://img/role-kernel".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        params
            .store(&BootParams {
                hosts: vec!["x0".into()],
                kernel: "http://img/host-kernel".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        let (boot_data, _) = resolver.resolve(&Identity::Mac("aa:bb".into())).await.unwrap();
        assert_eq!(boot_data.kernel.path, "http://img/host-kernel");
    }

    #[tokio::test]
    async fn exhaustion_returns_empty_boot_data() {
        let (resolver, _params, _sm) = setup();
        let (boot_data, component) = resolver.resolve(&Identity::Mac("unknown".into())).await.unwrap();
        assert!(boot_data.is_empty());
        assert!(component.is_none());
    }

    #[tokio::test]
    async fn global_tag_read_directly_bypasses_chain() {
        let (resolver, params, _sm) = setup();
        params
            .store(&BootParams {
                hosts: vec!["Global".into()],
                params: "console=ttyS0".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        let global = resolver.lookup_global_data().await.unwrap();
        assert_eq!(global.params, "console=ttyS0");
    }
}
