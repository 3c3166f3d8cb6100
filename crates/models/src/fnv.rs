//! FNV-1a-64, hand-rolled: the algorithm is ten lines and fully specified by
//! its published test vectors, and no crate on crates.io exposes the exact
//! "64-bit hex digest of a byte string" shape this store needs without extra
//! ceremony. Chosen for short, stable, deterministic ids — not for security.

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

pub fn fnv1a_64(data: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in data {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Lowercase, zero-padded 16 hex character digest of `data`.
pub fn fnv1a_64_hex(data: &[u8]) -> String {
    format!("{:016x}", fnv1a_64(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_matches_published_vector() {
        // FNV-1a 64-bit test vector for the empty string.
        assert_eq!(fnv1a_64(b""), 0xcbf2_9ce4_8422_2325);
    }

    #[test]
    fn known_vector_for_single_byte() {
        // FNV-1a 64-bit test vector for a single zero byte.
        assert_eq!(fnv1a_64(&[0]), 0xaf63_bd4c_8601_b7be);
    }

    #[test]
    fn hex_digest_is_fixed_width() {
        assert_eq!(fnv1a_64_hex(b"").len(), 16);
        assert_eq!(fnv1a_64_hex(b"http://img/kernel").len(), 16);
    }

    #[test]
    fn distinct_inputs_almost_always_differ() {
        assert_ne!(
            fnv1a_64_hex(b"http://img/k1"),
            fnv1a_64_hex(b"http://img/k2")
        );
    }
}
