use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Cloud-init data carried by a binding. `meta_data` and `user_data` are
/// opaque JSON sub-documents merged via RFC 7396 (see `bootstore::cloud_init`).
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct CloudInit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_home: Option<PhoneHome>,
}

impl CloudInit {
    pub fn is_empty(&self) -> bool {
        self.meta_data.is_none() && self.user_data.is_none() && self.phone_home.is_none()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct PhoneHome {
    #[serde(default)]
    pub public_key_dsa: String,
    #[serde(default)]
    pub public_key_rsa: String,
    #[serde(default)]
    pub public_key_ecdsa: String,
    #[serde(default)]
    pub public_key_ed25519: String,
    #[serde(default)]
    pub instance_id: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub fqdn: String,
}

impl PhoneHome {
    /// Any field populated.
    pub fn has_any_field(&self) -> bool {
        !self.public_key_dsa.is_empty()
            || !self.public_key_rsa.is_empty()
            || !self.public_key_ecdsa.is_empty()
            || !self.public_key_ed25519.is_empty()
            || !self.instance_id.is_empty()
            || !self.hostname.is_empty()
            || !self.fqdn.is_empty()
    }
}
