//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where 
    T: Float 
{
    target_range.0 
        + ((value - source_range.0) 
        * (target_range.1 - target_range.0) 
        / (source_range.1 - source_range.0))
}

/// Limit a value to the range `[min, max]`.
pub fn clamp<T>(value: T, min: T, max: T) -> T 
where
    T: Float
{
    let mut ret = value;

    if ret > max {
        ret = max
    }
    if ret < min {
        ret = min
    }

    ret
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
/// 
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()` if `lhs` is much smaller than `rhs.abs()` in
/// magnitude and `lhs < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}

/// Wrap an angle into the range `[-pi, pi)`.
pub fn wrap_pi<T>(angle: T) -> T
where
    T: Float
{
    let pi_t: T = T::from(std::f64::consts::PI).unwrap_or_else(T::zero);
    let tau_t: T = pi_t + pi_t;

    rem_euclid(angle + pi_t, tau_t) - pi_t
}

#[cfg(test)]
mod test {
    use super::*;

    const PI: f64 = std::f64::consts::PI;

    #[test]
    fn test_lin_map() {
        assert_eq!(lin_map((-200f64, 200f64), (-1f64, 1f64), 100f64), 0.5);
        assert_eq!(lin_map((0f64, 10f64), (0f64, 1f64), 0f64), 0.0);
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(2f64, -1f64, 1f64), 1f64);
        assert_eq!(clamp(-2f64, -1f64, 1f64), -1f64);
        assert_eq!(clamp(0.5f64, -1f64, 1f64), 0.5f64);
    }

    #[test]
    fn test_rem_euclid() {
        assert_eq!(rem_euclid(-1f64, 4f64), 3f64);
        assert_eq!(rem_euclid(5f64, 4f64), 1f64);
    }

    #[test]
    fn test_wrap_pi() {
        assert!((wrap_pi(0f64)).abs() < 1e-12);
        assert!((wrap_pi(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-12);
        assert!((wrap_pi(-3.0 * PI / 2.0) - PI / 2.0).abs() < 1e-12);
        assert!((wrap_pi(PI / 4.0 + 4.0 * PI) - PI / 4.0).abs() < 1e-12);
    }
}
