//! secp256k1 group arithmetic over arbitrary-precision integers.
//!
//! The curve is y² = x³ + 7 over the field of size
//! p = 2²⁵⁶ − 2³² − 977. The point at infinity is the (0, 0) sentinel —
//! off-curve, used only as the additive identity.

use num_bigint::BigUint;
use num_traits::Zero;
use once_cell::sync::Lazy;

use crate::constants::PUBKEY_ENCODED_LEN;
use crate::error::KeyError;

/// The prime field size p.
pub static FIELD_P: Lazy<BigUint> = Lazy::new(|| {
    BigUint::parse_bytes(
        b"fffffffffffffffffffffffffffffffffffffffffffffffffffffffefffffc2f",
        16,
    )
    .expect("field prime parses")
});

/// The group order n (order of the generator).
pub static ORDER_N: Lazy<BigUint> = Lazy::new(|| {
    BigUint::parse_bytes(
        b"fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141",
        16,
    )
    .expect("group order parses")
});

/// The standard generator point G.
pub static GENERATOR: Lazy<CurvePoint> = Lazy::new(|| CurvePoint {
    x: BigUint::parse_bytes(
        b"79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798",
        16,
    )
    .expect("generator x parses"),
    y: BigUint::parse_bytes(
        b"483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8",
        16,
    )
    .expect("generator y parses"),
});

/// Curve coefficient b (a is zero).
const CURVE_B: u8 = 7;

/// `(a - b) mod m` without unsigned underflow.
fn sub_mod(a: &BigUint, b: &BigUint, m: &BigUint) -> BigUint {
    ((a % m) + m - (b % m)) % m
}

/// Modular inverse by Fermat's little theorem; `m` must be prime.
pub(crate) fn mod_inverse(value: &BigUint, m: &BigUint) -> BigUint {
    value.modpow(&(m - 2u8), m)
}

/// A point on secp256k1, or the (0, 0) infinity sentinel. Immutable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CurvePoint {
    x: BigUint,
    y: BigUint,
}

impl CurvePoint {
    pub fn new(x: BigUint, y: BigUint) -> Self {
        Self { x, y }
    }

    /// The additive identity.
    pub fn infinity() -> Self {
        Self {
            x: BigUint::zero(),
            y: BigUint::zero(),
        }
    }

    pub fn x(&self) -> &BigUint {
        &self.x
    }

    pub fn y(&self) -> &BigUint {
        &self.y
    }

    pub fn is_infinity(&self) -> bool {
        self.x.is_zero() && self.y.is_zero()
    }

    /// Whether the point satisfies y² = x³ + 7 (mod p). The infinity
    /// sentinel does not.
    pub fn is_on_curve(&self) -> bool {
        let p = &*FIELD_P;
        let lhs = (&self.y * &self.y) % p;
        let rhs = (&self.x * &self.x * &self.x + BigUint::from(CURVE_B)) % p;
        lhs == rhs
    }

    /// Point addition with the three cases: identity, vertical pair, and the
    /// chord/tangent rule.
    pub fn add(&self, other: &CurvePoint) -> CurvePoint {
        let p = &*FIELD_P;
        if self.is_infinity() {
            return other.clone();
        }
        if other.is_infinity() {
            return self.clone();
        }
        if self.x == other.x && self.y != other.y {
            // Same x, opposite y: the chord is vertical.
            return CurvePoint::infinity();
        }

        let slope = if self == other {
            if self.y.is_zero() {
                return CurvePoint::infinity();
            }
            // Tangent: (3x² + a) / 2y with a = 0.
            let numerator = (BigUint::from(3u8) * &self.x * &self.x) % p;
            let denominator = mod_inverse(&((BigUint::from(2u8) * &self.y) % p), p);
            (numerator * denominator) % p
        } else {
            let numerator = sub_mod(&self.y, &other.y, p);
            let denominator = mod_inverse(&sub_mod(&self.x, &other.x, p), p);
            (numerator * denominator) % p
        };

        let x3 = sub_mod(&sub_mod(&((&slope * &slope) % p), &self.x, p), &other.x, p);
        let y3 = sub_mod(&((slope * sub_mod(&self.x, &x3, p)) % p), &self.y, p);
        CurvePoint { x: x3, y: y3 }
    }

    /// Scalar multiplication by double-and-add.
    pub fn mul(&self, scalar: &BigUint) -> CurvePoint {
        let mut result = CurvePoint::infinity();
        let mut addend = self.clone();
        let mut bits = scalar.clone();
        while !bits.is_zero() {
            if bits.bit(0) {
                result = result.add(&addend);
            }
            addend = addend.add(&addend);
            bits >>= 1;
        }
        result
    }

    /// SEC1 uncompressed encoding: `0x04 ‖ X(32) ‖ Y(32)`.
    pub fn encode(&self) -> [u8; PUBKEY_ENCODED_LEN] {
        let mut out = [0u8; PUBKEY_ENCODED_LEN];
        out[0] = 0x04;
        out[1..33].copy_from_slice(&to_fixed_32(&self.x));
        out[33..65].copy_from_slice(&to_fixed_32(&self.y));
        out
    }

    /// Decode a SEC1 uncompressed point and check it lies on the curve.
    pub fn decode(data: &[u8]) -> Result<Self, KeyError> {
        if data.len() != PUBKEY_ENCODED_LEN || data[0] != 0x04 {
            return Err(KeyError::InvalidPublicKey);
        }
        let point = Self {
            x: BigUint::from_bytes_be(&data[1..33]),
            y: BigUint::from_bytes_be(&data[33..65]),
        };
        if !point.is_on_curve() {
            return Err(KeyError::PointNotOnCurve);
        }
        Ok(point)
    }
}

/// Big-endian bytes left-padded to 32.
pub(crate) fn to_fixed_32(value: &BigUint) -> [u8; 32] {
    let bytes = value.to_bytes_be();
    let mut out = [0u8; 32];
    out[32 - bytes.len()..].copy_from_slice(&bytes);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_g() -> CurvePoint {
        CurvePoint::new(
            BigUint::parse_bytes(
                b"c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5",
                16,
            )
            .unwrap(),
            BigUint::parse_bytes(
                b"1ae168fea63dc339a3c58419466ceaeef7f632653266d0e1236431a950cfe52a",
                16,
            )
            .unwrap(),
        )
    }

    #[test]
    fn generator_is_on_curve() {
        assert!(GENERATOR.is_on_curve());
    }

    #[test]
    fn infinity_is_not_on_curve() {
        assert!(!CurvePoint::infinity().is_on_curve());
        assert!(CurvePoint::infinity().is_infinity());
    }

    #[test]
    fn adding_identity_is_noop() {
        let g = GENERATOR.clone();
        assert_eq!(g.add(&CurvePoint::infinity()), g);
        assert_eq!(CurvePoint::infinity().add(&g), g);
    }

    #[test]
    fn doubling_matches_known_vector() {
        assert_eq!(GENERATOR.add(&GENERATOR), two_g());
        assert_eq!(GENERATOR.mul(&BigUint::from(2u8)), two_g());
    }

    #[test]
    fn vertical_pair_sums_to_identity() {
        let neg_g = CurvePoint::new(GENERATOR.x().clone(), &*FIELD_P - GENERATOR.y());
        assert!(neg_g.is_on_curve());
        assert!(GENERATOR.add(&neg_g).is_infinity());
    }

    #[test]
    fn scalar_mul_is_repeated_addition() {
        let by_mul = GENERATOR.mul(&BigUint::from(5u8));
        let mut by_add = CurvePoint::infinity();
        for _ in 0..5 {
            by_add = by_add.add(&GENERATOR);
        }
        assert_eq!(by_mul, by_add);
        assert!(by_mul.is_on_curve());
    }

    #[test]
    fn scalar_mul_zero_is_identity() {
        assert!(GENERATOR.mul(&BigUint::zero()).is_infinity());
    }

    #[test]
    fn order_times_generator_is_identity() {
        assert!(GENERATOR.mul(&ORDER_N).is_infinity());
    }

    #[test]
    fn encode_decode_round_trip() {
        let point = GENERATOR.mul(&BigUint::from(12_345u32));
        let decoded = CurvePoint::decode(&point.encode()).unwrap();
        assert_eq!(decoded, point);
    }

    #[test]
    fn decode_rejects_bad_input() {
        let mut encoded = GENERATOR.encode();
        encoded[0] = 0x02;
        assert_eq!(CurvePoint::decode(&encoded), Err(KeyError::InvalidPublicKey));
        assert_eq!(CurvePoint::decode(&[0x04; 10]), Err(KeyError::InvalidPublicKey));

        let mut off_curve = GENERATOR.encode();
        off_curve[64] ^= 1;
        assert_eq!(CurvePoint::decode(&off_curve), Err(KeyError::PointNotOnCurve));
    }

    #[test]
    fn encoding_is_65_bytes_with_tag() {
        let encoded = GENERATOR.encode();
        assert_eq!(encoded.len(), 65);
        assert_eq!(encoded[0], 0x04);
    }
}
