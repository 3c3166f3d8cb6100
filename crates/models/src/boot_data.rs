use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{cloud_init::CloudInit, image::ImageData};

/// Persisted under `/params/<binding>`. `kernel`/`initrd` are image ids
/// (possibly empty, possibly dangling — see `Invariants` in the data model).
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
pub struct BootDataStore {
    #[serde(default)]
    pub params: String,
    #[serde(default)]
    pub kernel: String,
    #[serde(default)]
    pub initrd: String,
    #[serde(default)]
    pub cloud_init: CloudInit,
}

impl BootDataStore {
    pub fn is_default(&self) -> bool {
        self.params.is_empty()
            && self.kernel.is_empty()
            && self.initrd.is_empty()
            && self.cloud_init.is_empty()
    }
}

/// Never persisted: what the resolver hands the script builder, with image
/// ids already dereferenced into `ImageData`. A missing/dangling image
/// reference surfaces here as an `ImageData` with an empty `path`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BootData {
    pub params: String,
    pub kernel: ImageData,
    pub initrd: ImageData,
    pub cloud_init: CloudInit,
}

impl BootData {
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
            && self.kernel.is_empty()
            && self.initrd.is_empty()
            && self.cloud_init.is_empty()
    }
}
