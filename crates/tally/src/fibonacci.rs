use std::collections::HashSet;

use num_bigint::BigInt;
use num_traits::{One, Zero};

pub const DEFAULT_FIBONACCI_TERMS: usize = 1000;
/// Upper bound on terms; larger requests are capped here.
pub const MAX_FIBONACCI_TERMS: usize = 10_000;

/// The first N Fibonacci numbers (starting at 0), held exactly.
#[derive(Debug, Clone, Default)]
pub struct FibonacciSet {
    values: HashSet<BigInt>,
}

impl FibonacciSet {
    /// Holds the first `terms` numbers, capped at [`MAX_FIBONACCI_TERMS`].
    pub fn with_terms(terms: usize) -> Self {
        let terms = terms.min(MAX_FIBONACCI_TERMS);
        let mut values = HashSet::new();
        if terms == 0 {
            return Self { values };
        }

        let mut prev = BigInt::zero();
        values.insert(prev.clone());
        if terms == 1 {
            return Self { values };
        }

        let mut curr = BigInt::one();
        values.insert(curr.clone());
        for _ in 2..terms {
            let next = &prev + &curr;
            values.insert(next.clone());
            prev = std::mem::replace(&mut curr, next);
        }

        Self { values }
    }

    pub fn contains(&self, value: &BigInt) -> bool {
        self.values.contains(value)
    }

    /// Distinct values held; one less than the term count once 1 repeats.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Builds the set from a possibly untrusted term count. Non-finite or
/// non-positive counts give an empty set; fractions are floored and huge
/// counts are capped at [`MAX_FIBONACCI_TERMS`].
pub fn make_fibonacci_set(count: f64) -> FibonacciSet {
    if !count.is_finite() || count <= 0.0 {
        return FibonacciSet::default();
    }
    FibonacciSet::with_terms(count.min(MAX_FIBONACCI_TERMS as f64).floor() as usize)
}
