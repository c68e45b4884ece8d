//! Bleichenbacher's adaptive chosen-ciphertext attack on PKCS#1 v1.5
//!
//! Reference: D. Bleichenbacher, "Chosen Ciphertext Attacks Against Protocols
//! Based on the RSA Encryption Standard PKCS #1", CRYPTO '98.
//!
//! The driver keeps an append-only list of rounds. Round zero holds the
//! initial interval [2B, 3B - 1] with multiplier 1. Each later round finds a
//! conforming multiplier, narrows the previous interval set with it, and
//! stops once some interval has collapsed to a single value.

use num::bigint::BigUint;
use num::One;

use crate::arith::{self, modinv, to_fixed_bytes};
use crate::diagnostics::{IntervalSummary, QueryCounter};
use crate::interval::{Bounds, IntervalSet};
use crate::keys::PublicKey;
use crate::message;
use crate::oracle::{self, Oracle, Probe};
use crate::search::{self, Step};

/// Errors that end an attack
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Oracle(#[from] oracle::Error),
    #[error("invalid key parameters: {0}")]
    Arith(#[from] arith::Error),
    #[error("ciphertext is not reduced modulo n")]
    CiphertextRange,
    #[error("oracle self-test failed: conforming({s}) returned {answer}")]
    SelfTest { s: u32, answer: bool },
    #[error("interval narrowing came up empty {0} times, the oracle is inconsistent")]
    Stalled(u32),
    #[error("recovered block is not PKCS#1 v1.5 padded: {0}")]
    Unpad(#[from] message::Error),
}

/// Attack parameters
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Empty narrowings tolerated before giving up
    pub max_empty_rounds: u32,
    /// Total oracle queries allowed, including the self-test
    pub query_limit: Option<u64>,
    /// Check conforming(1) and !conforming(0) before searching
    pub self_test: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_empty_rounds: 2,
            query_limit: None,
            self_test: true,
        }
    }
}

/// One completed round of the attack
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Round {
    pub index: usize,
    /// None for round zero
    pub step: Option<Step>,
    pub s: BigUint,
    /// c0 * s**e mod n
    pub c: BigUint,
    pub intervals: IntervalSet,
    /// Narrowing produced nothing and the previous intervals were reused
    pub stale: bool,
}

/// Result of a successful attack
#[derive(Clone, Debug)]
pub struct Recovery {
    /// The recovered plaintext integer m
    pub value: BigUint,
    /// m as a k-byte PKCS#1 v1.5 block
    pub block: Vec<u8>,
    /// The block with its padding removed
    pub message: Vec<u8>,
    pub rounds: Vec<Round>,
    pub queries: u64,
}

/// Attack state for one target ciphertext
pub struct Attack<O> {
    probe: Probe<O>,
    bounds: Bounds,
    config: Config,
    // s0**e mod n inverted, applied to the converged value
    base: BigUint,
    rounds: Vec<Round>,
    empty_rounds: u32,
}

impl<O: Oracle> Attack<O> {
    /// Set up an attack on c0 under key
    ///
    /// Fails before any query if c0 is not below n, or if the blinding
    /// factor is not invertible mod n
    pub fn new(oracle: O, key: PublicKey, c0: BigUint, config: Config) -> Result<Self, Error> {
        let n = key.n().clone();
        if c0 >= n {
            return Err(Error::CiphertextRange);
        }
        let bounds = Bounds::new(key.byte_len());

        let s0 = BigUint::one();
        let base = modinv(&s0.modpow(key.e(), &n), &n)?;

        let probe = Probe::new(oracle, key, c0).with_limit(config.query_limit);
        let c = probe.mult(&s0);

        let rounds = vec![Round {
            index: 0,
            step: None,
            s: s0,
            c,
            intervals: IntervalSet::initial(&bounds),
            stale: false,
        }];

        Ok(Self {
            probe,
            bounds,
            config,
            base,
            rounds,
            empty_rounds: 0,
        })
    }

    /// Handle to the query counter, valid after the attack is consumed
    pub fn counter(&self) -> QueryCounter {
        self.probe.counter().clone()
    }

    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Confirm the oracle accepts the target itself and rejects zero
    pub fn self_test(&mut self) -> Result<(), Error> {
        for &(s, expected) in [(1_u32, true), (0_u32, false)].iter() {
            let answer = self.probe.conforming(&BigUint::from(s))?;
            if answer != expected {
                return Err(Error::SelfTest { s, answer });
            }
        }
        Ok(())
    }

    /// Run rounds until an interval collapses, then decode the plaintext
    pub fn run(mut self) -> Result<Recovery, Error> {
        let key = self.probe.key();
        tracing::info!(
            modulus_bits = key.n().bits(),
            k = key.byte_len(),
            "starting attack"
        );

        if self.config.self_test {
            self.self_test()?;
        }

        loop {
            let (s, step) = self.next_multiplier()?;
            if let Some(value) = self.advance(s, step)? {
                return self.finish(value);
            }
        }
    }

    // Pick the search for the next round from the latest interval set
    fn next_multiplier(&mut self) -> Result<(BigUint, Step), Error> {
        let last = self.latest();

        let step = if self.rounds.len() == 1 {
            Step::Initial
        } else if last.intervals.len() >= 2 {
            Step::Multi
        } else {
            Step::Single
        };

        if last.step != Some(step) {
            tracing::info!(round = self.rounds.len(), %step, "switching search strategy");
        }

        let s_prev = last.s.clone();
        let single = last.intervals.single().cloned();
        let s = match (step, single) {
            (Step::Initial, _) => search::initial(&mut self.probe, &self.bounds)?,
            (Step::Single, Some(interval)) => {
                search::single(&mut self.probe, &interval, &s_prev, &self.bounds)?
            }
            _ => search::multi(&mut self.probe, &s_prev)?,
        };

        Ok((s, step))
    }

    /// Narrow with multiplier s and record the round
    ///
    /// Returns the recovered value (m * s0 mod n) once an interval is a point
    fn advance(&mut self, s: BigUint, step: Step) -> Result<Option<BigUint>, Error> {
        let narrowed = {
            let n = self.probe.key().n();
            self.latest().intervals.narrow(&s, n, &self.bounds)
        };

        let (intervals, stale) = match narrowed {
            Some(next) => (next, false),
            None => {
                self.empty_rounds += 1;
                tracing::warn!(
                    round = self.rounds.len(),
                    s = %s,
                    empty_rounds = self.empty_rounds,
                    "no interval survived narrowing, reusing previous set"
                );
                if self.empty_rounds > self.config.max_empty_rounds {
                    return Err(Error::Stalled(self.empty_rounds));
                }
                (self.latest().intervals.clone(), true)
            }
        };

        let round = Round {
            index: self.rounds.len(),
            step: Some(step),
            c: self.probe.mult(&s),
            s,
            intervals,
            stale,
        };

        tracing::debug!(
            round = round.index,
            %step,
            s_bits = round.s.bits(),
            intervals = %IntervalSummary::from(&round.intervals),
            queries = self.probe.queries(),
            "round complete"
        );

        let value = round.intervals.point().cloned();
        self.rounds.push(round);

        Ok(value)
    }

    fn latest(&self) -> &Round {
        // round zero is created in new() and rounds are never removed
        &self.rounds[self.rounds.len() - 1]
    }

    // m = (s0**e)**-1 * value mod n
    fn finish(self, value: BigUint) -> Result<Recovery, Error> {
        let key = self.probe.key();
        let m = (&self.base * &value) % key.n();
        let block = to_fixed_bytes(&m, key.byte_len());
        let message = message::unpad(&block)?.to_vec();
        let queries = self.probe.queries();

        tracing::info!(rounds = self.rounds.len() - 1, queries, "attack converged");

        Ok(Recovery {
            value: m,
            block,
            message,
            rounds: self.rounds,
            queries,
        })
    }
}
