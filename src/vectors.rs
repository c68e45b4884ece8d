//! Fixed attack targets
//!
//! All local targets use e = 3 and encrypt `plaintext || SHA-1(plaintext)`.

use hex_literal::hex;
use num::bigint::BigUint;
use rand::{CryptoRng, RngCore};

use crate::keys::{self, PrivateKey, PublicKey};
use crate::message::append_digest;

pub const E: u64 = 3;

const FIXED_P: [u8; 24] = hex!("7eb7d5aa696ed1c3f83a0f46cfc1cf258589336316fd90ab");
const FIXED_Q: [u8; 24] = hex!("287f3b31edd80aced49994ebd65c1b5e7e3c53ebab5b42e7");
const FIXED_CIPHERTEXT: [u8; 48] = hex!(
    "0525a87ddb66bd47b4366a272b34543e5758f745a96b5f7cddf774be48d0167a"
    "9f07877995cbf4ffd42e6de5e7e078f5"
);
const FIXED_PADDED: [u8; 48] = hex!(
    "00022d8f12ebc27ebec644f6377cee7dee00616161616161616161613495ff69"
    "d34671d1e15b33a63c1379fdedd3a32a"
);
pub const FIXED_PLAINTEXT: &[u8] = b"aaaaaaaaaa";

const LOCAL_P: [u8; 24] = hex!("71d776b185e15c61e5c4d1b226ee6a23903492db1025be45");
const LOCAL_Q: [u8; 24] = hex!("d9b7ec220c2a2bfc9c5ff3756692602f7e19ab5e03fa5ed7");
pub const LOCAL_PLAINTEXT: &[u8] = b"bbbbbbbbbb";

const REMOTE_N: [u8; 48] = hex!(
    "4c81390477e071a7a9afd85eeb93f3596cf69fb8e7fadf422f22c68891586611"
    "af5e74aa8b4df9a585486898f632ae63"
);
const REMOTE_CIPHERTEXT: [u8; 48] = hex!(
    "1cb75d15d80c8bd7572281de5da592a428db429870b4a654b8722f98acc220b6"
    "701f6c0b7313fb9ef4ca15a87d9273bb"
);

/// A local target: key pair, ciphertext, and its expected decryption
#[derive(Clone, Debug)]
pub struct Fixture {
    pub key: PrivateKey,
    pub ciphertext: BigUint,
    /// The raw k-byte decryption of the ciphertext
    pub padded: Vec<u8>,
    pub plaintext: &'static [u8],
}

impl Fixture {
    /// Whether decrypting the ciphertext reproduces the padded block
    pub fn verify(&self) -> bool {
        self.key.decrypt_block(&self.ciphertext) == self.padded
    }

    fn encrypt<R: RngCore + CryptoRng>(
        rng: &mut R,
        key: PrivateKey,
        plaintext: &'static [u8],
    ) -> Result<Self, keys::Error> {
        let ciphertext = key.public().encrypt(rng, &append_digest(plaintext))?;
        let padded = key.decrypt_block(&ciphertext);

        Ok(Self {
            key,
            ciphertext,
            padded,
            plaintext,
        })
    }
}

fn from_primes(p: &[u8], q: &[u8]) -> Result<PrivateKey, keys::Error> {
    PrivateKey::from_primes(
        BigUint::from(E),
        BigUint::from_bytes_be(p),
        BigUint::from_bytes_be(q),
    )
}

/// Key of the recorded test vector
pub fn fixed_key() -> Result<PrivateKey, keys::Error> {
    from_primes(&FIXED_P, &FIXED_Q)
}

/// Recorded ciphertext of "aaaaaaaaaa" with its padded decryption
pub fn fixed() -> Result<Fixture, keys::Error> {
    Ok(Fixture {
        key: fixed_key()?,
        ciphertext: BigUint::from_bytes_be(&FIXED_CIPHERTEXT),
        padded: FIXED_PADDED.to_vec(),
        plaintext: FIXED_PLAINTEXT,
    })
}

/// Fixed key, freshly padded encryption of "bbbbbbbbbb"
pub fn local<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Fixture, keys::Error> {
    Fixture::encrypt(rng, from_primes(&LOCAL_P, &LOCAL_Q)?, LOCAL_PLAINTEXT)
}

/// Newly generated key of the given size, encrypting "aaaaaaaaaa"
pub fn generated<R: RngCore + CryptoRng>(rng: &mut R, bits: usize) -> Result<Fixture, keys::Error> {
    let key = PrivateKey::generate(rng, bits, E)?;
    Fixture::encrypt(rng, key, FIXED_PLAINTEXT)
}

/// Public key and captured ciphertext of the remote target
pub fn remote() -> Result<(PublicKey, BigUint), keys::Error> {
    let key = PublicKey::new(BigUint::from_bytes_be(&REMOTE_N), BigUint::from(E))?;
    Ok((key, BigUint::from_bytes_be(&REMOTE_CIPHERTEXT)))
}
