use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
pub type Fixed64 = I32F32;

/// Build an exact `num / den` constant. Usable in `const` position.
#[inline]
pub const fn ratio(num: i64, den: i64) -> Fixed64 {
    Fixed64::from_bits((num << 32) / den)
}

/// Tolerance for "construction complete" and "has activity" comparisons.
pub const EPSILON: Fixed64 = ratio(1, 100);

/// Convert an f64 to Fixed64. Use only for initialization, never in sim loop.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// Convert Fixed64 to f64. Use only for display and tests, never in sim loop.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// `0.5^exp`, exact for every exponent the engine can produce.
#[inline]
pub fn half_pow(exp: u32) -> Fixed64 {
    if exp >= 32 {
        Fixed64::ZERO
    } else {
        Fixed64::ONE >> exp
    }
}

/// Division that yields `None` on a zero divisor instead of panicking.
#[inline]
pub fn checked_div_64(a: Fixed64, b: Fixed64) -> Option<Fixed64> {
    a.checked_div(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_is_exact_for_powers_of_two() {
        assert_eq!(ratio(1, 2), f64_to_fixed64(0.5));
        assert_eq!(ratio(1, 4), f64_to_fixed64(0.25));
        assert_eq!(ratio(3, 1), f64_to_fixed64(3.0));
    }

    #[test]
    fn ratio_matches_float_conversion_closely() {
        let a = fixed64_to_f64(ratio(1, 20));
        assert!((a - 0.05).abs() < 1e-9);
        let b = fixed64_to_f64(EPSILON);
        assert!((b - 0.01).abs() < 1e-9);
    }

    #[test]
    fn half_pow_sequence() {
        assert_eq!(half_pow(0), Fixed64::ONE);
        assert_eq!(half_pow(1), f64_to_fixed64(0.5));
        assert_eq!(half_pow(2), f64_to_fixed64(0.25));
        assert_eq!(half_pow(40), Fixed64::ZERO);
    }

    #[test]
    fn checked_div_by_zero() {
        assert!(checked_div_64(Fixed64::ONE, Fixed64::ZERO).is_none());
        assert_eq!(
            checked_div_64(Fixed64::ONE, f64_to_fixed64(2.0)),
            Some(f64_to_fixed64(0.5))
        );
    }

    #[test]
    fn fixed64_determinism() {
        let a = f64_to_fixed64(1.0 / 3.0);
        let b = f64_to_fixed64(1.0 / 3.0);
        assert_eq!(a, b);
        assert_eq!(a * f64_to_fixed64(3.0), b * f64_to_fixed64(3.0));
    }
}
