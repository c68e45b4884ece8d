use num::bigint::BigUint;

use crate::keys::PrivateKey;

use super::{Error, Oracle};

// Index of the first byte allowed to be the zero delimiter
const DELIM_START: usize = 10;

/// Which PKCS#1 v1.5 conformance checks a local oracle performs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Checks {
    /// Block starts with 0x00 0x02
    pub header: bool,
    /// Padding bytes 2..10 are non-zero
    pub valid_pad: bool,
    /// A zero delimiter exists at index 10 or later
    pub null_delim: bool,
}

impl Default for Checks {
    fn default() -> Self {
        Self {
            header: true,
            valid_pad: true,
            null_delim: true,
        }
    }
}

impl Checks {
    /// Inspect a decrypted k-byte block
    pub fn accepts(&self, block: &[u8]) -> bool {
        if block.len() <= DELIM_START {
            return false;
        }

        if self.header && block[..2] != [0x00, 0x02] {
            return false;
        }

        if self.valid_pad && block[2..DELIM_START].contains(&0x00) {
            return false;
        }

        if self.null_delim && !block[DELIM_START..].contains(&0x00) {
            return false;
        }

        true
    }
}

/// Padding oracle holding the private key
///
/// Decrypts each query and inspects the padding directly
pub struct LocalOracle {
    key: PrivateKey,
    checks: Checks,
}

impl LocalOracle {
    pub fn new(key: PrivateKey) -> Self {
        Self {
            key,
            checks: Checks::default(),
        }
    }

    pub fn with_checks(mut self, checks: Checks) -> Self {
        self.checks = checks;
        self
    }

    pub fn key(&self) -> &PrivateKey {
        &self.key
    }
}

impl Oracle for LocalOracle {
    fn conforming(&mut self, c: &BigUint) -> Result<bool, Error> {
        Ok(self.checks.accepts(&self.key.decrypt_block(c)))
    }
}
