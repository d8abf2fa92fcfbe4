//! Shared helpers used across the crate.

mod math;
mod random;

pub(crate) use math::{check_fraction, checked_size, round_count, to_u32};
pub use random::{Random, RandomSource};
