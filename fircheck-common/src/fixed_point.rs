//! Q1.31 fixed-point conversions
//!
//! A Q1.31 sample is a signed 32-bit integer representing a real value in [-1, 1):
//! `integer = round(real * 2^31)`.
//!
//! Rounding is half away from zero (`f64::round`) everywhere a real value is
//! quantized, so the generator and the reference filter agree bit for bit.

/// 2^31 as a float
pub const Q31_SCALE: f64 = 2_147_483_648.0;

/// Quantize a real value to Q1.31, rounding half away from zero and clamping
/// to the `i32` range. NaN maps to zero.
pub fn to_q31(value: f64) -> i32 {
    let scaled = (value * Q31_SCALE).round();
    if scaled.is_nan() {
        return 0;
    }
    scaled.clamp(i32::MIN as f64, i32::MAX as f64) as i32
}

/// Convert a Q1.31 sample to its real value (exact)
pub fn from_q31(sample: i32) -> f64 {
    sample as f64 / Q31_SCALE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_q31_rounds_half_away_from_zero() {
        // 0.5 LSB above/below zero
        let half_lsb = 0.5 / Q31_SCALE;
        assert_eq!(to_q31(half_lsb), 1);
        assert_eq!(to_q31(-half_lsb), -1);
        assert_eq!(to_q31(0.25), 536_870_912);
    }

    #[test]
    fn test_to_q31_clamps() {
        assert_eq!(to_q31(1.0), i32::MAX);
        assert_eq!(to_q31(3.5), i32::MAX);
        assert_eq!(to_q31(-1.0), i32::MIN);
        assert_eq!(to_q31(-7.0), i32::MIN);
        assert_eq!(to_q31(f64::NAN), 0);
    }

    #[test]
    fn test_from_q31_is_exact() {
        assert_eq!(from_q31(0), 0.0);
        assert_eq!(from_q31(i32::MIN), -1.0);
        assert_eq!(from_q31(1 << 30), 0.5);
        assert_eq!(to_q31(from_q31(-123_456_789)), -123_456_789);
    }
}
