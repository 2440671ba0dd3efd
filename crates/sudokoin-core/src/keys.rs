//! Key pairs, ECDSA signatures, and address encoding.
//!
//! Signatures are raw 64-byte `r ‖ s` over secp256k1 with SHA-256 message
//! digests and a deterministic nonce, normalized to low-s at signing time.
//! Verification accepts either s form so historic wire signatures stay valid.
//!
//! An address string is the Base58Check form of the public key hash; the
//! base64 SEC1 public key is what transactions carry in their `address`
//! fields, since verification needs the full key.

use num_bigint::BigUint;
use num_traits::Zero;
use rand::RngCore;
use rand::rngs::OsRng;
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::constants::{
    ADDRESS_CHECKSUM_LEN, ADDRESS_CHECKSUM_SALT, ADDRESS_VERSION, SIGNATURE_LEN,
};
use crate::curve::{CurvePoint, GENERATOR, ORDER_N, mod_inverse, to_fixed_32};
use crate::error::KeyError;
use crate::hashing::sha256_raw;

/// A secp256k1 private scalar.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey {
    scalar: BigUint,
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKey").finish_non_exhaustive()
    }
}

impl PrivateKey {
    /// Generate a uniformly random key from the OS RNG.
    pub fn generate() -> Self {
        loop {
            let mut bytes = [0u8; 32];
            OsRng.fill_bytes(&mut bytes);
            let scalar = BigUint::from_bytes_be(&bytes) % &*ORDER_N;
            if !scalar.is_zero() {
                return Self { scalar };
            }
        }
    }

    /// Build a key from an explicit scalar, reduced mod the group order.
    pub fn from_scalar(scalar: BigUint) -> Result<Self, KeyError> {
        let scalar = scalar % &*ORDER_N;
        if scalar.is_zero() {
            return Err(KeyError::ZeroScalar);
        }
        Ok(Self { scalar })
    }

    /// Convenience for tests and fixtures.
    pub fn from_scalar_u64(scalar: u64) -> Result<Self, KeyError> {
        Self::from_scalar(BigUint::from(scalar))
    }

    /// Build a key from 32 big-endian bytes.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, KeyError> {
        Self::from_scalar(BigUint::from_bytes_be(bytes))
    }

    /// Parse a hex-encoded scalar (the form wallets export).
    pub fn from_hex(hex_scalar: &str) -> Result<Self, KeyError> {
        let scalar = BigUint::parse_bytes(hex_scalar.trim().as_bytes(), 16)
            .ok_or(KeyError::ZeroScalar)?;
        Self::from_scalar(scalar)
    }

    /// Hex encoding of the scalar.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// The scalar as 32 big-endian bytes.
    pub fn to_bytes(&self) -> [u8; 32] {
        to_fixed_32(&self.scalar)
    }

    /// The public point `k·G`.
    pub fn public_key(&self) -> CurvePoint {
        GENERATOR.mul(&self.scalar)
    }

    /// Base64 of the SEC1 uncompressed public key.
    pub fn public_key_b64(&self) -> String {
        encode_pubkey_b64(&self.public_key())
    }

    /// The Base58Check address for this key.
    pub fn address(&self) -> String {
        address_from_point(&self.public_key())
    }

    /// ECDSA-sign a message, returning the raw 64-byte `r ‖ s` signature.
    ///
    /// The nonce is derived deterministically from the key and the message
    /// digest, so equal inputs produce equal signatures and no RNG failure
    /// can leak the key through nonce reuse.
    pub fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_LEN] {
        let n = &*ORDER_N;
        let z = BigUint::from_bytes_be(&sha256_raw(message)) % n;
        let key_bytes = self.to_bytes();
        let z_bytes = to_fixed_32(&z);

        for counter in 0u32.. {
            let mut seed = Vec::with_capacity(68);
            seed.extend_from_slice(&key_bytes);
            seed.extend_from_slice(&z_bytes);
            seed.extend_from_slice(&counter.to_be_bytes());
            let k = BigUint::from_bytes_be(&sha256_raw(&seed)) % n;
            if k.is_zero() {
                continue;
            }

            let point = GENERATOR.mul(&k);
            let r = point.x() % n;
            if r.is_zero() {
                continue;
            }

            let s = (mod_inverse(&k, n) * (&z + &r * &self.scalar)) % n;
            if s.is_zero() {
                continue;
            }
            let s = if s > (n >> 1) { n - s } else { s };

            let mut signature = [0u8; SIGNATURE_LEN];
            signature[..32].copy_from_slice(&to_fixed_32(&r));
            signature[32..].copy_from_slice(&to_fixed_32(&s));
            return signature;
        }
        unreachable!("nonce derivation terminates")
    }
}

/// Verify a raw 64-byte ECDSA signature against a public point.
pub fn verify(message: &[u8], signature: &[u8; SIGNATURE_LEN], public_key: &CurvePoint) -> bool {
    let n = &*ORDER_N;
    let r = BigUint::from_bytes_be(&signature[..32]);
    let s = BigUint::from_bytes_be(&signature[32..]);
    if r.is_zero() || &r >= n || s.is_zero() || &s >= n {
        return false;
    }
    if !public_key.is_on_curve() {
        return false;
    }

    let z = BigUint::from_bytes_be(&sha256_raw(message)) % n;
    let w = mod_inverse(&s, n);
    let u1 = (&z * &w) % n;
    let u2 = (&r * &w) % n;
    let point = GENERATOR.mul(&u1).add(&public_key.mul(&u2));
    if point.is_infinity() {
        return false;
    }
    point.x() % n == r
}

/// Base64 of a raw signature.
pub fn encode_signature(signature: &[u8; SIGNATURE_LEN]) -> String {
    BASE64.encode(signature)
}

/// Decode a base64 signature string into its raw 64 bytes.
pub fn decode_signature(encoded: &str) -> Result<[u8; SIGNATURE_LEN], KeyError> {
    let bytes = BASE64
        .decode(encoded.trim())
        .map_err(|_| KeyError::InvalidSignature)?;
    bytes.try_into().map_err(|_| KeyError::InvalidSignature)
}

/// Base64 of a SEC1 uncompressed public key.
pub fn encode_pubkey_b64(point: &CurvePoint) -> String {
    BASE64.encode(point.encode())
}

/// Decode a base64 SEC1 public key, checking it lies on the curve.
pub fn decode_pubkey_b64(encoded: &str) -> Result<CurvePoint, KeyError> {
    let bytes = BASE64
        .decode(encoded.trim())
        .map_err(|_| KeyError::InvalidPublicKey)?;
    CurvePoint::decode(&bytes)
}

/// Derive the Base58Check address of a public point.
///
/// Payload: `0x02 0xe4 ‖ RIPEMD160(SHA256(pubkey)) ‖ checksum[0..4]` where
/// the checksum preimage prefixes the digest with 0x69 rather than the
/// version bytes. That quirk is load-bearing: every address on the network
/// was derived this way.
pub fn address_from_point(point: &CurvePoint) -> String {
    let digest: [u8; 20] = Ripemd160::digest(Sha256::digest(point.encode())).into();

    let mut checksum_preimage = Vec::with_capacity(1 + digest.len());
    checksum_preimage.push(ADDRESS_CHECKSUM_SALT);
    checksum_preimage.extend_from_slice(&digest);
    let checksum = sha256_raw(&sha256_raw(&checksum_preimage));

    let mut payload = Vec::with_capacity(ADDRESS_VERSION.len() + digest.len() + ADDRESS_CHECKSUM_LEN);
    payload.extend_from_slice(&ADDRESS_VERSION);
    payload.extend_from_slice(&digest);
    payload.extend_from_slice(&checksum[..ADDRESS_CHECKSUM_LEN]);
    bs58::encode(payload).into_string()
}
