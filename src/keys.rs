//! RSA key material consumed by the attack
//!
//! Key construction, validation, generation and PKCS#1 v1.5 encryption are
//! delegated to the `rsa` crate. The attack itself works on `num` integers,
//! so values are converted at this boundary.

use num::bigint::BigUint;
use rand::{CryptoRng, RngCore};
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};

use crate::arith::{self, byte_len, lcm, modinv, to_fixed_bytes};

/// Smallest modulus (in bytes) with room for the PKCS#1 v1.5 header,
/// eight padding bytes and the delimiter
pub const MIN_MODULUS_LEN: usize = 11;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("modulus of {0} bytes is too short for PKCS#1 v1.5")]
    ModulusTooShort(usize),
    #[error(transparent)]
    Arith(#[from] arith::Error),
    #[error("rsa: {0}")]
    Rsa(#[from] rsa::Error),
}

fn to_rsa(x: &BigUint) -> rsa::BigUint {
    rsa::BigUint::from_bytes_be(&x.to_bytes_be())
}

fn from_rsa(x: &rsa::BigUint) -> BigUint {
    BigUint::from_bytes_be(&x.to_bytes_be())
}

/// RSA public key (n, e)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey {
    n: BigUint,
    e: BigUint,
    k: usize,
}

impl PublicKey {
    /// Construct a public key from its modulus and exponent
    pub fn new(n: BigUint, e: BigUint) -> Result<Self, Error> {
        let k = byte_len(&n);
        if k < MIN_MODULUS_LEN {
            return Err(Error::ModulusTooShort(k));
        }

        RsaPublicKey::new(to_rsa(&n), to_rsa(&e))?;

        Ok(Self { n, e, k })
    }

    pub fn n(&self) -> &BigUint {
        &self.n
    }

    pub fn e(&self) -> &BigUint {
        &self.e
    }

    /// Modulus length in bytes
    pub fn byte_len(&self) -> usize {
        self.k
    }

    /// Encrypt a message with PKCS#1 v1.5 padding
    pub fn encrypt<R: RngCore + CryptoRng>(&self, rng: &mut R, msg: &[u8]) -> Result<BigUint, Error> {
        let key = RsaPublicKey::new(to_rsa(&self.n), to_rsa(&self.e))?;
        let ciphertext = key.encrypt(rng, Pkcs1v15Encrypt, msg)?;
        Ok(BigUint::from_bytes_be(&ciphertext))
    }
}

/// RSA private key, kept only by local oracles and test fixtures
#[derive(Clone, Debug)]
pub struct PrivateKey {
    public: PublicKey,
    d: BigUint,
}

impl PrivateKey {
    /// Construct a private key from the public exponent and the two primes
    ///
    /// d = e**-1 mod lcm(p - 1, q - 1)
    pub fn from_primes(e: BigUint, p: BigUint, q: BigUint) -> Result<Self, Error> {
        let n = &p * &q;
        let lambda = lcm(&(&p - 1_u32), &(&q - 1_u32));
        let d = modinv(&e, &lambda)?;

        let key = RsaPrivateKey::from_components(
            to_rsa(&n),
            to_rsa(&e),
            to_rsa(&d),
            vec![to_rsa(&p), to_rsa(&q)],
        )?;
        key.validate()?;

        Ok(Self {
            public: PublicKey::new(n, e)?,
            d,
        })
    }

    /// Generate a fresh key with the given modulus size and public exponent
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R, bits: usize, e: u64) -> Result<Self, Error> {
        let key = RsaPrivateKey::new_with_exp(rng, bits, &rsa::BigUint::from(e))?;

        Ok(Self {
            public: PublicKey::new(from_rsa(key.n()), from_rsa(key.e()))?,
            d: from_rsa(key.d()),
        })
    }

    pub fn public(&self) -> &PublicKey {
        &self.public
    }

    /// Textbook RSA decryption, c**d mod n
    pub fn decrypt_raw(&self, c: &BigUint) -> BigUint {
        c.modpow(&self.d, &self.public.n)
    }

    /// Decrypt without removing padding, as a k-byte block
    pub fn decrypt_block(&self, c: &BigUint) -> Vec<u8> {
        to_fixed_bytes(&self.decrypt_raw(c), self.public.k)
    }
}
