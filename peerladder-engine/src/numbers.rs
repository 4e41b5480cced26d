//! Numeric conversion helpers centralizing the rating math's lossy casts.

use num_traits::cast::cast;

/// Floor a f64 and clamp it to the i32 range, returning 0 for NaN values.
#[must_use]
pub fn floor_f64_to_i32(value: f64) -> i32 {
    if value.is_nan() {
        return 0;
    }
    let min = cast::<i32, f64>(i32::MIN).unwrap_or(f64::MIN);
    let max = cast::<i32, f64>(i32::MAX).unwrap_or(f64::MAX);
    let clamped = value.floor().clamp(min, max);
    cast::<f64, i32>(clamped).unwrap_or(0)
}

/// Convert a seat index or field size to f64.
#[must_use]
pub fn usize_to_f64(value: usize) -> f64 {
    cast::<usize, f64>(value).unwrap_or(0.0)
}

/// Convert a rank or count to i64, saturating at `i64::MAX`.
#[must_use]
pub fn usize_to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_rounds_toward_negative_infinity() {
        assert_eq!(floor_f64_to_i32(1.9), 1);
        assert_eq!(floor_f64_to_i32(-1.1), -2);
        assert_eq!(floor_f64_to_i32(f64::NAN), 0);
        assert_eq!(floor_f64_to_i32(f64::from(i32::MAX) * 2.0), i32::MAX);
    }

    #[test]
    fn counts_convert() {
        assert!((usize_to_f64(20) - 20.0).abs() < f64::EPSILON);
        assert_eq!(usize_to_i64(19), 19);
    }
}
