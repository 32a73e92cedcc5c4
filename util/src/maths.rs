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

/// Clamp a value into the inclusive range [min, max].
pub fn clamp<T>(value: &T, min: &T, max: &T) -> T 
where
    T: PartialOrd + Copy
{
    let mut ret = *value;

    if ret > *max {
        ret = *max
    }
    if ret < *min {
        ret = *min
    }

    ret
}

/// Get the signed angular distance from `from_deg` to `to_deg` in degrees.
///
/// The result is the shortest path between the two headings, in the range
/// (-180, 180]. A positive distance is a clockwise turn on a compass.
pub fn get_ang_dist_deg<T>(from_deg: T, to_deg: T) -> T
where
    T: Float
{
    let full: T = T::from(360.0).unwrap_or_else(T::zero);
    let half: T = T::from(180.0).unwrap_or_else(T::zero);

    let d = rem_euclid(to_deg - from_deg, full);

    if d > half {
        d - full
    }
    else {
        d
    }
}

/// Wrap a heading in degrees into the range [0, 360).
pub fn wrap_deg<T>(value: T) -> T
where
    T: Float
{
    let full: T = T::from(360.0).unwrap_or_else(T::zero);
    let r = rem_euclid(value, full);

    // Round off can leave r == 360 for tiny negative inputs
    if r >= full {
        T::zero()
    }
    else {
        r
    }
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
/// 
/// This function is taken from the std library as num is missing it.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_lin_map() {
        assert_eq!(lin_map((0f64, 255f64), (-45f64, 45f64), 0f64), -45f64);
        assert_eq!(lin_map((0f64, 255f64), (-45f64, 45f64), 255f64), 45f64);
        assert_eq!(lin_map((0f64, 10f64), (0f64, 1f64), 5f64), 0.5f64);
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(&7i32, &-3, &3), 3);
        assert_eq!(clamp(&-0.5f64, &0.0, &1.0), 0.0);
        assert_eq!(clamp(&0.25f64, &0.0, &1.0), 0.25);
    }

    #[test]
    fn test_get_ang_dist_deg() {
        assert_eq!(get_ang_dist_deg(10f64, 90f64), 80f64);
        assert_eq!(get_ang_dist_deg(90f64, 10f64), -80f64);
        assert_eq!(get_ang_dist_deg(350f64, 10f64), 20f64);
        assert_eq!(get_ang_dist_deg(10f64, 350f64), -20f64);
        assert_eq!(get_ang_dist_deg(0f64, 180f64), 180f64);
        assert_eq!(get_ang_dist_deg(0f64, 360f64), 0f64);
    }

    #[test]
    fn test_wrap_deg() {
        assert_eq!(wrap_deg(370f64), 10f64);
        assert_eq!(wrap_deg(-90f64), 270f64);
        assert_eq!(wrap_deg(0f64), 0f64);
    }
}
