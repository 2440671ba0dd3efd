//! Canonical protocol hashing.
//!
//! The protocol's "double SHA-256" is string-domain: the inner digest is
//! re-encoded as its 64-character lowercase hex string before the second
//! hash. An implementation that re-hashes the raw digest bytes produces
//! different values and cannot interoperate.

use sha2::{Digest, Sha256};

use crate::types::Hash256;

/// Lowercase hex SHA-256 of a string.
pub fn sha256_hex(data: &str) -> String {
    hex::encode(Sha256::digest(data.as_bytes()))
}

/// The protocol double hash: `SHA256(hex(SHA256(data)))`.
pub fn dsha256(data: &str) -> Hash256 {
    let inner = hex::encode(Sha256::digest(data.as_bytes()));
    Hash256(Sha256::digest(inner.as_bytes()).into())
}

/// Raw single SHA-256 over bytes (address derivation, RNG seeding).
pub fn sha256_raw(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Merkle root over transaction hashes.
///
/// Adjacent pairs are hashed over their concatenated raw 32-byte digests; an
/// odd trailing node is promoted to the next layer unchanged, so a
/// single-leaf tree roots at the leaf itself. Empty input yields the zero
/// hash (never produced by a well-formed block, which always carries a
/// coinbase).
pub fn merkle_root(leaves: &[Hash256]) -> Hash256 {
    if leaves.is_empty() {
        return Hash256::ZERO;
    }
    let mut layer: Vec<[u8; 32]> = leaves.iter().map(|h| h.0).collect();
    while layer.len() > 1 {
        let mut next = Vec::with_capacity(layer.len().div_ceil(2));
        let mut i = 0;
        while i < layer.len() {
            if i + 1 < layer.len() {
                let mut hasher = Sha256::new();
                hasher.update(layer[i]);
                hasher.update(layer[i + 1]);
                next.push(hasher.finalize().into());
            } else {
                next.push(layer[i]);
            }
            i += 2;
        }
        layer = next;
    }
    Hash256(layer[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_hex_known_vector() {
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad",
        );
    }

    #[test]
    fn dsha256_hashes_the_hex_string() {
        // Second stage must consume the 64-char hex text, not raw digest bytes.
        let inner = sha256_hex("abc");
        let expect = hex::encode(sha256_raw(inner.as_bytes()));
        assert_eq!(dsha256("abc").to_string(), expect);
    }

    #[test]
    fn dsha256_differs_from_byte_double_hash() {
        let byte_double = hex::encode(sha256_raw(&sha256_raw(b"abc")));
        assert_ne!(dsha256("abc").to_string(), byte_double);
    }

    #[test]
    fn merkle_empty_is_zero() {
        assert_eq!(merkle_root(&[]), Hash256::ZERO);
    }

    #[test]
    fn merkle_single_leaf_is_the_leaf() {
        let leaf = dsha256("leaf");
        assert_eq!(merkle_root(&[leaf]), leaf);
    }

    #[test]
    fn merkle_pair_hashes_concatenation() {
        let a = dsha256("a");
        let b = dsha256("b");
        let mut joined = Vec::new();
        joined.extend_from_slice(&a.0);
        joined.extend_from_slice(&b.0);
        assert_eq!(merkle_root(&[a, b]), Hash256(sha256_raw(&joined)));
    }

    #[test]
    fn merkle_odd_node_promoted_unchanged() {
        let a = dsha256("a");
        let b = dsha256("b");
        let c = dsha256("c");
        // Layer 1: H(a||b), c. Root: H(H(a||b) || c).
        let ab = merkle_root(&[a, b]);
        let mut joined = Vec::new();
        joined.extend_from_slice(&ab.0);
        joined.extend_from_slice(&c.0);
        assert_eq!(merkle_root(&[a, b, c]), Hash256(sha256_raw(&joined)));
    }

    #[test]
    fn merkle_is_order_sensitive() {
        let a = dsha256("a");
        let b = dsha256("b");
        assert_ne!(merkle_root(&[a, b]), merkle_root(&[b, a]));
    }
}
