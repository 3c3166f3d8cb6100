use std::sync::Arc;

use bootstore::{ImageRegistry, ParamStore};
use collaborators::{ObjectStoreClient, SpireClient, StateManagerClient};
use config::{ChainConfig, DiscoveryConfig};
use discovery::DiscoveryFlow;
use kvstore::KvStore;
use resolver::Resolver;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub kv: Arc<dyn KvStore>,
    pub images: Arc<ImageRegistry>,
    pub params: Arc<ParamStore>,
    pub resolver: Arc<Resolver>,
    pub discovery: Arc<DiscoveryFlow>,
    pub state_manager: Arc<dyn StateManagerClient>,
    pub spire: Arc<dyn SpireClient>,
    pub object_store: Arc<dyn ObjectStoreClient>,
    pub chain_cfg: ChainConfig,
    pub discovery_cfg: DiscoveryConfig,
    pub presign_valid_for: Duration,
}
