//! Mathematical utility functions.

use crate::{Error, Result};

/// Converts a `usize` to `u32`, returning an error if the value exceeds `u32::MAX`.
/// Cell indices are stored as `u32`, so every node size is bounded by this limit.
///
/// # Errors
///
/// Returns [`Error::InvalidValue`] if `value` exceeds `u32::MAX`.
pub fn to_u32(value: usize) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| Error::InvalidValue(format!("{value} exceeds the u32 index range")))
}

/// Returns the product of all dimensions, or `None` on overflow.
///
/// The product of an empty list is 1.
#[must_use]
pub fn checked_size(dimensions: &[u32]) -> Option<usize> {
    dimensions
        .iter()
        .try_fold(1usize, |acc, &dim| acc.checked_mul(dim as usize))
}

/// Returns `round(fraction * total)`, rounding halves away from zero.
///
/// `fraction` must already be validated to lie in `[0, 1]`, which keeps the
/// result within `0..=total`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn round_count(fraction: f64, total: usize) -> usize {
    let count = (fraction * total as f64).round() as usize;
    count.min(total)
}

/// Validates that `value` is a finite fraction in `[0, 1]`.
///
/// # Errors
///
/// Returns [`Error::InvalidValue`] naming `what` otherwise.
pub fn check_fraction(what: &str, value: f64) -> Result<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::InvalidValue(format!(
            "{what} must be within [0, 1], got {value}"
        )))
    }
}
