use core::mem;

use num::bigint::{BigInt, BigUint, Sign};
use num::{Integer, One, Zero};

/// Errors for modular arithmetic
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("{a} has no inverse modulo {m}")]
    NotInvertible { a: BigUint, m: BigUint },
}

/// Extended Euclidean algorithm
///
/// Returns (g, x, y) such that a*x + b*y = g, with g = gcd(a, b) non-negative
pub fn egcd(a: &BigInt, b: &BigInt) -> (BigInt, BigInt, BigInt) {
    let (mut old_r, mut r) = (a.clone(), b.clone());
    let (mut old_x, mut x) = (BigInt::one(), BigInt::zero());
    let (mut old_y, mut y) = (BigInt::zero(), BigInt::one());

    while !r.is_zero() {
        let q = old_r.div_floor(&r);

        let next_r = &old_r - &q * &r;
        old_r = mem::replace(&mut r, next_r);

        let next_x = &old_x - &q * &x;
        old_x = mem::replace(&mut x, next_x);

        let next_y = &old_y - &q * &y;
        old_y = mem::replace(&mut y, next_y);
    }

    if old_r.sign() == Sign::Minus {
        (-old_r, -old_x, -old_y)
    } else {
        (old_r, old_x, old_y)
    }
}

/// Modular inverse of a modulo m
pub fn modinv(a: &BigUint, m: &BigUint) -> Result<BigUint, Error> {
    let not_invertible = || Error::NotInvertible {
        a: a.clone(),
        m: m.clone(),
    };

    if m.is_zero() {
        return Err(not_invertible());
    }

    let m_int = BigInt::from(m.clone());
    let (g, x, _) = egcd(&BigInt::from(a.clone()), &m_int);
    if !g.is_one() {
        return Err(not_invertible());
    }

    // x mod m is in [0, m), so the conversion cannot fail
    x.mod_floor(&m_int).to_biguint().ok_or_else(not_invertible)
}

/// Least common multiple
pub fn lcm(a: &BigUint, b: &BigUint) -> BigUint {
    if a.is_zero() || b.is_zero() {
        return BigUint::zero();
    }

    let (g, _, _) = egcd(&BigInt::from(a.clone()), &BigInt::from(b.clone()));
    // gcd of two positive values is positive
    let g = g.magnitude();

    (a / g) * b
}

/// Ceiling division ⌈x / y⌉
///
/// Panics if y is zero
pub fn divup(x: &BigUint, y: &BigUint) -> BigUint {
    let (q, r) = x.div_rem(y);
    if r.is_zero() {
        q
    } else {
        q + 1_u32
    }
}

/// Floor division ⌊x / y⌋
///
/// Panics if y is zero
pub fn divdn(x: &BigUint, y: &BigUint) -> BigUint {
    x / y
}

/// Byte length of a modulus
pub fn byte_len(n: &BigUint) -> usize {
    ((n.bits() + 7) / 8) as usize
}

/// PKCS#1 v1.5 bound B = 2**(8*(k-2)) for a k-byte modulus
///
/// Panics if k < 2
pub fn bound(k: usize) -> BigUint {
    BigUint::one() << (8 * (k - 2))
}

/// Big-endian encoding of x, left-padded with zeros to k bytes
///
/// Values wider than k bytes are returned unpadded
pub fn to_fixed_bytes(x: &BigUint, k: usize) -> Vec<u8> {
    let bytes = x.to_bytes_be();
    // BigUint encodes zero as a single zero byte
    let bytes = if x.is_zero() { Vec::new() } else { bytes };

    if bytes.len() >= k {
        return bytes;
    }

    let mut res = vec![0_u8; k - bytes.len()];
    res.extend_from_slice(&bytes);
    res
}
