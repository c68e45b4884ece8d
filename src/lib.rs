//! Bleichenbacher's attack on RSA PKCS#1 v1.5 encryption
//!
//! Recovers the plaintext of a ciphertext using only an oracle that reports
//! whether a chosen ciphertext decrypts to conforming padding.

pub mod arith;
pub mod attack;
pub mod cache;
pub mod diagnostics;
pub mod interval;
pub mod keys;
pub mod message;
pub mod oracle;
pub mod search;
pub mod vectors;

pub use attack::{Attack, Config, Recovery, Round};
pub use oracle::{LocalOracle, Oracle, RemoteOracle};
