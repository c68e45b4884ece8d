use core::fmt;

use num::bigint::BigUint;
use num::One;

use crate::arith::divup;
use crate::interval::{Bounds, Interval};
use crate::oracle::{Error, Oracle, Probe};

/// How a round's multiplier was found
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// Round one: linear scan from ⌈n / 3B⌉
    Initial,
    /// Several intervals left: linear scan from the previous multiplier
    Multi,
    /// One interval left: scan the windows bounded by the interval
    Single,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Initial => "initial",
            Step::Multi => "multi",
            Step::Single => "single",
        };
        f.write_str(name)
    }
}

/// Find the first conforming multiplier s1 >= ⌈n / 3B⌉
pub fn initial<O: Oracle>(probe: &mut Probe<O>, bounds: &Bounds) -> Result<BigUint, Error> {
    let start = divup(probe.key().n(), &bounds.three_b);
    probe.find_conforming(start)
}

/// Find the next conforming multiplier after s_prev by linear scan
pub fn multi<O: Oracle>(probe: &mut Probe<O>, s_prev: &BigUint) -> Result<BigUint, Error> {
    probe.find_conforming(s_prev + BigUint::one())
}

/// Find the next conforming multiplier when a single interval [a, b] remains
///
/// Starting at r = ⌈2(b*s_prev - 2B) / n⌉, tries every s in
/// [⌈(2B + rn) / b⌉, ⌈(3B + rn) / a⌉) before moving to the next r
pub fn single<O: Oracle>(
    probe: &mut Probe<O>,
    interval: &Interval,
    s_prev: &BigUint,
    bounds: &Bounds,
) -> Result<BigUint, Error> {
    let n = probe.key().n().clone();
    let (a, b) = (interval.lo(), interval.hi());

    // b >= 2B and s_prev >= 1, so the numerator is never negative
    let mut r = divup(&((b * s_prev - &bounds.two_b) << 1), &n);

    loop {
        let rn = &r * &n;
        let mut s = divup(&(&bounds.two_b + &rn), b);
        let s_hi = divup(&(&bounds.three_b + &rn), a);

        while s < s_hi {
            if probe.conforming(&s)? {
                return Ok(s);
            }
            s += BigUint::one();
        }

        r += BigUint::one();
    }
}
