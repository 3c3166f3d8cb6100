//! Wire-level DTOs for the `/bootparameters` and `/bootscript` HTTP surface.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::cloud_init::CloudInit;

/// Body of POST/PUT/PATCH/DELETE `/bootparameters`. Selector precedence is
/// `hosts` > `macs` > `nids` > image-only (exactly one branch is honoured).
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema)]
pub struct BootParams {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hosts: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub macs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nids: Vec<i64>,
    #[serde(default)]
    pub params: String,
    #[serde(default)]
    pub kernel: String,
    #[serde(default)]
    pub initrd: String,
    #[serde(default, rename = "cloud-init", skip_serializing_if = "CloudInit::is_empty")]
    pub cloud_init: CloudInit,
}

impl BootParams {
    /// The binding selector this request carries, in precedence order.
    pub fn selector(&self) -> Selector<'_> {
        if !self.hosts.is_empty() {
            Selector::Hosts(&self.hosts)
        } else if !self.macs.is_empty() {
            Selector::Macs(&self.macs)
        } else if !self.nids.is_empty() {
            Selector::Nids(&self.nids)
        } else {
            Selector::ImageOnly
        }
    }

    pub fn has_kernel_or_initrd(&self) -> bool {
        !self.kernel.is_empty() || !self.initrd.is_empty()
    }
}

#[derive(Debug, Clone)]
pub enum Selector<'a> {
    Hosts(&'a [String]),
    Macs(&'a [String]),
    Nids(&'a [i64]),
    ImageOnly,
}

/// One entry of the GET `/bootparameters` response: a binding and its
/// currently-stored boot data, with image ids resolved back to paths.
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema)]
pub struct BootParamsEntry {
    pub hosts: Vec<String>,
    #[serde(default)]
    pub params: String,
    #[serde(default)]
    pub kernel: String,
    #[serde(default)]
    pub initrd: String,
    #[serde(default, rename = "cloud-init", skip_serializing_if = "CloudInit::is_empty")]
    pub cloud_init: CloudInit,
}

/// Query parameters accepted by `GET /bootparameters` and `GET /bootscript`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema)]
pub struct BootFilterQuery {
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub nid: Option<u32>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema)]
pub struct BootScriptQuery {
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub nid: Option<u32>,
    #[serde(default)]
    pub arch: Option<String>,
    #[serde(default)]
    pub retry: Option<u32>,
    #[serde(default)]
    pub ts: Option<i64>,
}
