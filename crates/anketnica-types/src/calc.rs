//! Float-to-integer conversions used by the game formulas.
//!
//! The formulas work in `f64` and floor their results into quantities and
//! credit values. These helpers clamp into the target range first, so a
//! NaN or negative intermediate becomes zero instead of wrapping.

/// Floor `value` into a `u32`, clamping to `0..=u32::MAX`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn floor_u32(value: f64) -> u32 {
    if value.is_nan() || value <= 0.0 {
        return 0;
    }
    value.floor().min(f64::from(u32::MAX)) as u32
}

/// Floor `value` into a `u64`, clamping to `0..=u64::MAX`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn floor_u64(value: f64) -> u64 {
    if value.is_nan() || value <= 0.0 {
        return 0;
    }
    value.floor() as u64
}

/// Lossy `u64` to `f64` for credit sums.
#[allow(clippy::cast_precision_loss)]
pub const fn u64_to_f64(value: u64) -> f64 {
    value as f64
}

/// Clamp `value` into `[min, max]`, mapping NaN to `min`.
pub fn clamp_f64(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        return min;
    }
    value.clamp(min, max)
}
