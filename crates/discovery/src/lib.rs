//! C7: bootscripts for nodes the inventory cannot yet place. Handles the
//! retrieving-state retry, the `${buildarch}` architecture probe, resolution
//! against `Unknown-<arch>`, and the blocklist policy that gates the normal
//! fallback pathway when discovery itself comes up empty.

pub mod error;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use collaborators::StateManagerClient;
use config::{ChainConfig, DiscoveryConfig};
use kvstore::KvStore;
use models::{
    binding::{params_key, unknown_arch_tag},
    BootData, ComponentRecord, RetrievalState,
};
use resolver::{Identity, Resolver};

pub use error::DiscoveryError;

/// What the bootscript endpoint should do for a given request, as decided
/// by the discovery flow.
#[derive(Debug)]
pub enum BootscriptPlan {
    /// Boot data is ready to hand to the script builder, along with the
    /// inventory component resolved for this identity (if any). The
    /// component's `id` is the canonical xname the script builder and
    /// SPIRE token lookup key on.
    Ready(BootData, Option<ComponentRecord>),
    /// Inventory is mid-refresh; sleep and chain back to the same request.
    RetryAfterRefresh { chain_back_url: String, delay_secs: u64 },
    /// No `Unknown-<arch>` binding exists for any architecture at all.
    NoUnknownConfig,
    /// The caller didn't supply `arch`; ask iPXE to resupply the request
    /// with `${buildarch}` filled in.
    RequestArchitecture { chain_back_url: String },
    /// The component's role is blocklisted and no more specific binding exists.
    Blocked,
}

/// A node is unknown when inventory doesn't know it, has it disabled, or
/// the normal fallback chain resolved no kernel for it.
fn is_unknown(component: Option<&ComponentRecord>, boot_data: &BootData) -> bool {
    match component {
        None => true,
        Some(c) => !c.endpoint_enabled || boot_data.kernel.path.is_empty(),
    }
}

pub struct DiscoveryFlow {
    kv: Arc<dyn KvStore>,
    resolver: Arc<Resolver>,
    state_manager: Arc<dyn StateManagerClient>,
    discovery_cfg: DiscoveryConfig,
    chain_cfg: ChainConfig,
}

impl DiscoveryFlow {
    pub fn new(
        kv: Arc<dyn KvStore>,
        resolver: Arc<Resolver>,
        state_manager: Arc<dyn StateManagerClient>,
        discovery_cfg: DiscoveryConfig,
        chain_cfg: ChainConfig,
    ) -> Self {
        Self {
            kv,
            resolver,
            state_manager,
            discovery_cfg,
            chain_cfg,
        }
    }

    fn self_chain_url(&self, identity: &Identity, arch: Option<&str>) -> String {
        let (key, value) = identity.query_param();
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let arch_param = arch.unwrap_or("${buildarch}");
        format!(
            "{}/boot/v1/bootscript?{key}={value}&arch={arch_param}&ts={ts}",
            self.chain_cfg.base_url()
        )
    }

    async fn has_any_unknown_config(&self) -> Result<bool, DiscoveryError> {
        let entries = self.kv.get_prefix("/params/Unknown-").await?;
        Ok(!entries.is_empty())
    }

    async fn has_specific_binding(&self, component: &ComponentRecord) -> Result<bool, DiscoveryError> {
        if self.kv.get(&params_key(&component.id)).await?.is_some() {
            return Ok(true);
        }
        if !component.role.is_empty() && self.kv.get(&params_key(&component.role)).await?.is_some() {
            return Ok(true);
        }
        Ok(false)
    }

    fn is_blocked_role(&self, role: &str) -> bool {
        self.discovery_cfg.blocklist_roles.iter().any(|r| r == role)
    }

    /// Decides how to answer a `GET /bootscript` request for `identity`.
    pub async fn plan(&self, identity: &Identity, arch: Option<&str>) -> Result<BootscriptPlan, DiscoveryError> {
        let (boot_data, component) = self.resolver.resolve(identity).await?;

        if !is_unknown(component.as_ref(), &boot_data) {
            return Ok(BootscriptPlan::Ready(boot_data, component));
        }

        if self.state_manager.check_state().await? == RetrievalState::Retrieving {
            return Ok(BootscriptPlan::RetryAfterRefresh {
                chain_back_url: self.self_chain_url(identity, arch),
                delay_secs: self.discovery_cfg.hsm_retrieval_delay_seconds,
            });
        }

        if !self.has_any_unknown_config().await? {
            return Ok(BootscriptPlan::NoUnknownConfig);
        }

        let Some(arch) = arch else {
            return Ok(BootscriptPlan::RequestArchitecture {
                chain_back_url: self.self_chain_url(identity, None),
            });
        };

        let tag = unknown_arch_tag(arch);
        if let Some(unknown_boot_data) = self.resolver.binding(&tag).await? {
            return Ok(BootscriptPlan::Ready(unknown_boot_data, component));
        }

        // No Unknown-<arch> binding for this specific arch. If the identity
        // names a known component, fall back to the normal pathway (which
        // already resolved `boot_data` above) subject to the blocklist.
        if let Some(component) = component {
            if self.is_blocked_role(&component.role) && !self.has_specific_binding(&component).await? {
                return Ok(BootscriptPlan::Blocked);
            }
            return Ok(BootscriptPlan::Ready(boot_data, Some(component)));
        }

        Ok(BootscriptPlan::NoUnknownConfig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bootstore::{ImageRegistry, ParamStore};
    use collaborators::FakeStateManagerClient;
    use config::{ChainConfig, DiscoveryConfig};
    use kvstore::MemoryKv;
    use models::BootParams;

    fn flow() -> (DiscoveryFlow, ParamStore, Arc<FakeStateManagerClient>) {
        let kv: Arc<dyn KvStore> = Arc::new(MemoryKv::new());
        let images = Arc::new(ImageRegistry::new(kv.clone()));
        let sm = Arc::new(FakeStateManagerClient::new());
        let sm_dyn: Arc<dyn StateManagerClient> = sm.clone();
        let resolver = Arc::new(Resolver::new(kv.clone(), images.clone(), sm_dyn.clone()));
        let params = ParamStore::new(kv.clone(), images, sm_dyn.clone());
        let discovery_cfg = DiscoveryConfig {
            hsm_retrieval_delay_seconds: 10,
            boot_retry_delay_seconds: 30,
            blocklist_roles: vec!["Management".into()],
        };
        let flow = DiscoveryFlow::new(kv, resolver, sm_dyn, discovery_cfg, ChainConfig::default());
        (flow, params, sm)
    }

    #[tokio::test]
    async fn unknown_mac_with_no_unknown_config_fails() {
        let (flow, _params, _sm) = flow();
        let plan = flow
            .plan(&Identity::Mac("de:ad:be:ef:00:01".into()), None)
            .await
            .unwrap();
        assert!(matches!(plan, BootscriptPlan::NoUnknownConfig));
    }

    #[tokio::test]
    async fn unknown_mac_without_arch_asks_for_buildarch() {
        let (flow, params, _sm) = flow();
        params
            .store(&BootParams {
                hosts: vec!["Unknown-x86_64".into()],
                kernel: "http://img/discovery-kernel".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        let plan = flow
            .plan(&Identity::Mac("de:ad:be:ef:00:01".into()), None)
            .await
            .unwrap();
        match plan {
            BootscriptPlan::RequestArchitecture { chain_back_url } => {
                assert!(chain_back_url.contains("arch=${buildarch}"));
                assert!(chain_back_url.contains("mac=de:ad:be:ef:00:01"));
            }
            other => panic!("expected RequestArchitecture, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_mac_with_arch_resolves_against_unknown_arch_binding() {
        let (flow, params, _sm) = flow();
        params
            .store(&BootParams {
                hosts: vec!["Unknown-x86_64".into()],
                kernel: "http://img/discovery-kernel".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        let plan = flow
            .plan(&Identity::Mac("de:ad:be:ef:00:01".into()), Some("x86_64"))
            .await
            .unwrap();
        match plan {
            BootscriptPlan::Ready(boot_data, _) => assert_eq!(boot_data.kernel.path, "http://img/discovery-kernel"),
            other => panic!("expected Ready, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn retrieving_state_asks_to_retry() {
        let (flow, params, sm) = flow();
        params
            .store(&BootParams {
                hosts: vec!["Unknown-x86_64".into()],
                kernel: "http://img/discovery-kernel".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        sm.set_retrieving(true);

        let plan = flow.plan(&Identity::Mac("unknown".into()), None).await.unwrap();
        assert!(matches!(plan, BootscriptPlan::RetryAfterRefresh { .. }));
    }

    #[tokio::test]
    async fn known_component_with_blocklisted_role_and_no_binding_is_blocked() {
        let (flow, params, sm) = flow();
        params
            .store(&BootParams {
                hosts: vec!["Unknown-x86_64".into()],
                kernel: "http://img/discovery-kernel".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        sm.seed(ComponentRecord {
            id: "x0".into(),
            role: "Management".into(),
            mac: Some("aa:bb".into()),
            nid: None,
            endpoint_enabled: true,
            fqdn: None,
        });

        let plan = flow
            .plan(&Identity::Mac("aa:bb".into()), Some("aarch64"))
            .await
            .unwrap();
        assert!(matches!(plan, BootscriptPlan::Blocked));
    }
}
