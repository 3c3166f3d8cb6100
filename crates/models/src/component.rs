use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The shape the `StateManager` (hardware inventory) client decodes
/// responses into. `id` is the xname.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, JsonSchema)]
pub struct ComponentRecord {
    pub id: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(default)]
    pub nid: Option<u32>,
    #[serde(default = "default_true")]
    pub endpoint_enabled: bool,
    #[serde(default)]
    pub fqdn: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Whether the inventory is mid-refresh (`checkState`). Discovery pauses
/// and retries rather than treating a mid-refresh miss as a hard unknown.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalState {
    Ready,
    Retrieving,
}
