//! Bindings key `BootDataStore` entries under `/params/<binding>`. A binding
//! is just a string; these are the reserved ones the resolver and discovery
//! flow treat specially.

pub const DEFAULT_TAG: &str = "Default";
pub const GLOBAL_TAG: &str = "Global";

/// `Unknown-<arch>`, e.g. `Unknown-x86_64`.
pub fn unknown_arch_tag(arch: &str) -> String {
    format!("Unknown-{arch}")
}

/// `nid<N>`, the binding used for a NID that inventory cannot resolve.
pub fn nid_binding(nid: u32) -> String {
    format!("nid{nid}")
}

/// The KV key a binding's `BootDataStore` lives under.
pub fn params_key(binding: &str) -> String {
    format!("/params/{binding}")
}

/// Prefix all binding keys share, for range scans.
pub const PARAMS_PREFIX: &str = "/params/";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nid_binding_format() {
        assert_eq!(nid_binding(42), "nid42");
    }

    #[test]
    fn unknown_arch_format() {
        assert_eq!(unknown_arch_tag("x86_64"), "Unknown-x86_64");
    }

    #[test]
    fn params_key_format() {
        assert_eq!(params_key("x1000c0s0b0n0"), "/params/x1000c0s0b0n0");
    }
}
