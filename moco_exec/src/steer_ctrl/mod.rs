//! Steering control module
//!
//! Owns the steering mode state machine. Mode changes which alter the
//! mechanical position of the servos run the reposition protocol: the motors
//! ramp gently up and back down on a background thread while the servos move,
//! so the wheels never drag under zero or full load.
//!
//! In AFRS mode the inner steering angle is applied to the servos along with
//! the outer angle from the steering geometry, and the inner side's motors are
//! slowed through the `port_ratio`/`stbd_ratio` speed multipliers.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod calc_afrs;
mod params;
mod reposition;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use comms_if::eqpt::SteeringMode;

// Internal
use crate::MotionError;

pub use calc_afrs::*;
pub use params::*;
pub use reposition::*;
pub use state::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Inner angle at which `steering_translation` reaches the maximum ratio.
///
/// Units: degrees
pub const TRANSLATION_RANGE_DEG: f64 = 45.0;

/// Raw analog steering axis range.
pub const RAW_AXIS_RANGE: (f64, f64) = (0.0, 255.0);

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Parse a steering mode name from a parameter file, case insensitive.
pub fn parse_steering_mode(name: &str) -> Result<SteeringMode, MotionError> {
    match name.trim().to_ascii_lowercase().as_str() {
        "afrs" => Ok(SteeringMode::Afrs),
        "rotate" => Ok(SteeringMode::Rotate),
        "skid" => Ok(SteeringMode::Skid),
        _ => Err(MotionError::InvalidConfiguration(format!(
            "unsupported steering mode \"{}\"", name
        )))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_steering_mode() {
        assert_eq!(parse_steering_mode("AFRS").unwrap(), SteeringMode::Afrs);
        assert_eq!(parse_steering_mode(" rotate ").unwrap(), SteeringMode::Rotate);
        assert!(matches!(
            parse_steering_mode("crab"),
            Err(MotionError::InvalidConfiguration(_))
        ));
    }
}
