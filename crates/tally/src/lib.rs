//! Value tallies and Fibonacci membership used by the counter worker.

mod counter;
mod fibonacci;

pub use counter::FrequencyCounter;
pub use fibonacci::{
    make_fibonacci_set, FibonacciSet, DEFAULT_FIBONACCI_TERMS, MAX_FIBONACCI_TERMS,
};
