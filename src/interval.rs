use core::cmp;

use num::bigint::BigUint;
use num::{One, Zero};

use crate::arith::{bound, divdn, divup};

/// PKCS#1 v1.5 conformance bounds for a k-byte modulus
///
/// A conforming plaintext m satisfies 2B <= m < 3B
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bounds {
    pub b: BigUint,
    pub two_b: BigUint,
    pub three_b: BigUint,
}

impl Bounds {
    /// Create bounds for a modulus of k bytes
    pub fn new(k: usize) -> Self {
        let b = bound(k);
        let two_b = &b << 1;
        let three_b = &two_b + &b;
        Self { b, two_b, three_b }
    }

    /// Largest conforming value, 3B - 1
    pub fn top(&self) -> BigUint {
        &self.three_b - 1_u32
    }
}

/// Closed range [lo, hi] of plaintext candidates
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Interval {
    lo: BigUint,
    hi: BigUint,
}

impl Interval {
    /// Create a new interval, returns None if lo > hi
    pub fn new(lo: BigUint, hi: BigUint) -> Option<Self> {
        if lo > hi {
            None
        } else {
            Some(Self { lo, hi })
        }
    }

    pub fn lo(&self) -> &BigUint {
        &self.lo
    }

    pub fn hi(&self) -> &BigUint {
        &self.hi
    }

    /// Whether the interval has collapsed to a single value
    pub fn is_point(&self) -> bool {
        self.lo == self.hi
    }

    pub fn contains(&self, value: &BigUint) -> bool {
        &self.lo <= value && value <= &self.hi
    }

    /// Number of integers in the interval, hi - lo + 1
    pub fn width(&self) -> BigUint {
        &self.hi - &self.lo + 1_u32
    }
}

/// Non-empty collection of candidate intervals for one round
///
/// Intervals keep the order they were produced in, and may overlap when
/// produced from different source intervals
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntervalSet(Vec<Interval>);

impl IntervalSet {
    /// The round zero set: [2B, 3B - 1]
    pub fn initial(bounds: &Bounds) -> Self {
        Self(vec![Interval {
            lo: bounds.two_b.clone(),
            hi: bounds.top(),
        }])
    }

    /// Create a set from intervals, returns None for an empty collection
    pub fn from_intervals(intervals: Vec<Interval>) -> Option<Self> {
        if intervals.is_empty() {
            None
        } else {
            Some(Self(intervals))
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Interval> {
        self.0.iter()
    }

    /// The only interval, if exactly one remains
    pub fn single(&self) -> Option<&Interval> {
        match self.0.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    /// The first degenerate interval's value, if any interval collapsed
    pub fn point(&self) -> Option<&BigUint> {
        self.0.iter().find(|iv| iv.is_point()).map(|iv| iv.lo())
    }

    pub fn contains(&self, value: &BigUint) -> bool {
        self.0.iter().any(|iv| iv.contains(value))
    }

    /// Total candidate count, summed over all intervals (overlaps counted twice)
    pub fn size(&self) -> BigUint {
        self.0
            .iter()
            .fold(BigUint::zero(), |acc, iv| acc + iv.width())
    }

    /// Narrow the set with a newly found conforming multiplier s
    ///
    /// For each [a, b] and each r with (a*s - 3B + 1)/n <= r <= (b*s - 2B)/n,
    /// keeps [max(a, ⌈(2B + rn)/s⌉), min(b, ⌊(3B - 1 + rn)/s⌋)] when non-empty.
    ///
    /// Returns None when no interval survives
    pub fn narrow(&self, s: &BigUint, n: &BigUint, bounds: &Bounds) -> Option<Self> {
        let top = bounds.top();
        let mut res = Vec::new();

        for iv in self.0.iter() {
            let a_s = &iv.lo * s;
            let b_s = &iv.hi * s;

            // negative lower r values never produce a candidate
            let mut r = if a_s > top {
                divdn(&(&a_s - &top), n)
            } else {
                BigUint::zero()
            };
            let r_hi = if b_s > bounds.two_b {
                divup(&(&b_s - &bounds.two_b), n)
            } else {
                BigUint::zero()
            };

            while r <= r_hi {
                let rn = &r * n;
                let lower = cmp::max(iv.lo.clone(), divup(&(&rn + &bounds.two_b), s));
                let upper = cmp::min(iv.hi.clone(), divdn(&(&rn + &top), s));

                if let Some(next) = Interval::new(lower, upper) {
                    tracing::trace!(r = %r, lo = %next.lo, hi = %next.hi, "candidate interval");
                    res.push(next);
                }

                r += BigUint::one();
            }
        }

        Self::from_intervals(res)
    }
}

impl<'a> IntoIterator for &'a IntervalSet {
    type Item = &'a Interval;
    type IntoIter = core::slice::Iter<'a, Interval>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
