//! AFRS steering geometry calculations

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use super::{Params, TRANSLATION_RANGE_DEG};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Geometry of an AFRS turn for one inner angle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AfrsTurn {
    /// Absolute steering angle of the outer wheels.
    ///
    /// Units: degrees
    pub outer_angle_deg: f64,

    /// Turn radius of the inner wheels.
    ///
    /// Units: millimeters
    pub inner_radius_mm: f64,

    /// Turn radius of the outer wheels.
    ///
    /// Units: millimeters
    pub outer_radius_mm: f64,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Calculate the AFRS turn for an absolute inner steering angle in degrees.
///
/// The inner and outer wheels share a centre of rotation on the line through
/// the middle of the wheelbase. The outer wheels sit a full track further
/// from it so they turn through a smaller angle on a larger radius.
///
/// An inner angle of zero is a straight line and returns `None`. Callers must
/// clamp the inner angle to the configured maximum before calling.
pub fn calc_afrs_turn(params: &Params, inner_angle_deg: f64) -> Option<AfrsTurn> {
    if inner_angle_deg == 0.0 {
        return None;
    }

    let half_length = params.half_length_mm();
    let half_width = params.half_width_mm();

    // Inside radius
    let inside_distance = half_length / inner_angle_deg.to_radians().tan();
    let inside_hyp = (half_length.powi(2) + inside_distance.powi(2)).sqrt();
    let inner_radius_mm = inside_hyp - params.wheel_offset_mm;

    // Outside radius
    let outside_distance = inside_distance + 2.0 * half_width;
    let outside_hyp = (outside_distance.powi(2) + half_length.powi(2)).sqrt();
    let outer_radius_mm = outside_hyp + params.wheel_offset_mm;

    let outer_angle_deg = half_length.atan2(outside_distance).to_degrees();

    Some(AfrsTurn {
        outer_angle_deg,
        inner_radius_mm,
        outer_radius_mm,
    })
}

/// Absolute outer steering angle for an absolute inner angle, zero for a
/// straight line.
///
/// Units: degrees
pub fn calc_outer_angle(params: &Params, inner_angle_deg: f64) -> f64 {
    calc_afrs_turn(params, inner_angle_deg)
        .map(|t| t.outer_angle_deg)
        .unwrap_or(0.0)
}

/// Map an absolute inner angle in [0, 45] onto the inner motor speed ratio,
/// 1.0 at zero and `afrs_max_ratio` at 45°.
pub fn steering_translation(params: &Params, inner_angle_deg: f64) -> f64 {
    1.0 + inner_angle_deg / TRANSLATION_RANGE_DEG * (params.afrs_max_ratio - 1.0)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_straight_is_zero() {
        let p = Params::default();
        assert_eq!(calc_outer_angle(&p, 0.0), 0.0);
        assert!(calc_afrs_turn(&p, 0.0).is_none());
    }

    #[test]
    fn test_outer_wheel_on_wider_arc() {
        let p = Params::default();

        for i in 1..90 {
            let inner = i as f64;
            let turn = calc_afrs_turn(&p, inner).unwrap();

            assert!(turn.outer_radius_mm > turn.inner_radius_mm, "inner {}", inner);
            assert!(turn.outer_angle_deg > 0.0, "inner {}", inner);
            assert!(turn.outer_angle_deg < inner, "inner {}", inner);
        }
    }

    #[test]
    fn test_known_angle() {
        let p = Params::default();

        // half length 90, half width 100: d = 90/tan(20°), outer = atan(90/(d+200))
        let d = 90.0 / 20f64.to_radians().tan();
        let expected = 90f64.atan2(d + 200.0).to_degrees();

        assert!((calc_outer_angle(&p, 20.0) - expected).abs() < 1e-9);
        assert_eq!(calc_outer_angle(&p, 20.0).trunc(), 11.0);
    }

    #[test]
    fn test_steering_translation() {
        let p = Params::default();

        assert_eq!(steering_translation(&p, 0.0), 1.0);
        assert!((steering_translation(&p, 45.0) - p.afrs_max_ratio).abs() < 1e-12);

        // Moves monotonically from 1.0 towards the max ratio
        let mut last = steering_translation(&p, 0.0);
        for i in 1..=45 {
            let r = steering_translation(&p, i as f64);
            assert!((last - 1.0).abs() <= (r - 1.0).abs());
            assert!(r <= 1.0 && r >= p.afrs_max_ratio);
            last = r;
        }
    }
}
