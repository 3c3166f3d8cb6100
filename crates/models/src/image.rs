use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::fnv::fnv1a_64_hex;

#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, Display, EnumString, Eq, PartialEq, Hash, JsonSchema,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ImageType {
    Kernel,
    Initrd,
}

/// `{path, params}`, content-addressed by `fnv1a_64_hex(path)` under `/<imtype>/<digest>`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
pub struct ImageData {
    /// URL or filesystem path this image is served from.
    pub path: String,
    /// Space-separated kernel-arg fragment appended at script-build time.
    #[serde(default)]
    pub params: String,
}

impl ImageData {
    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }
}

/// The key an `ImageData` for `path` under `imtype` is stored at.
pub fn image_key(imtype: ImageType, path: &str) -> String {
    format!("/{imtype}/{}", fnv1a_64_hex(path.as_bytes()))
}

/// The prefix all images of a given type are stored under (for range scans).
pub fn image_type_prefix(imtype: ImageType) -> String {
    format!("/{imtype}/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_suffix_is_the_digest_of_the_path() {
        let path = "http://img/kernel";
        let key = image_key(ImageType::Kernel, path);
        assert_eq!(key, format!("/kernel/{}", fnv1a_64_hex(path.as_bytes())));
    }

    #[test]
    fn different_types_never_share_a_key_even_for_the_same_path() {
        let path = "http://img/shared";
        assert_ne!(
            image_key(ImageType::Kernel, path),
            image_key(ImageType::Initrd, path)
        );
    }
}
