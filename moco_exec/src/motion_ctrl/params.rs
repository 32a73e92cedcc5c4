//! Motion control parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use crate::MotionError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the motion controller
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    /// Speed used by `set_manual_speed` when there is no manual speed source.
    pub default_manual_speed: f64,

    /// Halt before disabling the motors.
    pub slow_to_stop: bool,

    /// Wait for the push button and calibrate the IMU when enabling.
    pub initial_calibration: bool,

    /// Rate at which the IMU calibration verdict is polled.
    ///
    /// Units: Hertz
    pub calibration_poll_hz: f64,

    /// Give up waiting for the calibration verdict after this long. Waits
    /// forever if not set.
    ///
    /// Units: seconds
    #[serde(default)]
    pub calibration_timeout_s: Option<f64>,

    /// Speed change per analog stick increment.
    pub speed_nudge_scale: f64,

    /// Wait after the push button is released.
    ///
    /// Units: seconds
    pub push_button_debounce_s: f64,

    /// Steering mode set at construction, one of "afrs", "rotate" or "skid".
    #[serde(default)]
    pub initial_steering_mode: Option<String>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    pub fn validate(&self) -> Result<(), MotionError> {
        if !(0.0..=1.0).contains(&self.default_manual_speed) {
            return Err(MotionError::InvalidConfiguration(format!(
                "default manual speed must be in [0, 1], got {}", 
                self.default_manual_speed
            )));
        }

        if !(self.calibration_poll_hz > 0.0) {
            return Err(MotionError::InvalidConfiguration(format!(
                "calibration poll rate must be positive, got {}", 
                self.calibration_poll_hz
            )));
        }

        if let Some(t) = self.calibration_timeout_s {
            if !(t > 0.0) {
                return Err(MotionError::InvalidConfiguration(format!(
                    "calibration timeout must be positive, got {}", t
                )));
            }
        }

        if self.speed_nudge_scale < 0.0 || self.push_button_debounce_s < 0.0 {
            return Err(MotionError::InvalidConfiguration(
                "speed nudge scale and push button debounce cannot be negative".into()
            ));
        }

        Ok(())
    }
}

impl Default for Params {
    fn default() -> Self {
        Self {
            default_manual_speed: 0.5,
            slow_to_stop: true,
            initial_calibration: false,
            calibration_poll_hz: 10.0,
            calibration_timeout_s: None,
            speed_nudge_scale: 0.01428 / 5.0,
            push_button_debounce_s: 1.0,
            initial_steering_mode: None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_load_params() {
        let params: Params = util::params::from_str(
            r#"
            default_manual_speed = 0.3
            slow_to_stop = false
            initial_calibration = true
            calibration_poll_hz = 10.0
            speed_nudge_scale = 0.002856
            push_button_debounce_s = 1.0
            initial_steering_mode = "afrs"
            "#
        ).unwrap();

        assert!(params.validate().is_ok());
        assert_eq!(params.calibration_timeout_s, None);
        assert_eq!(params.initial_steering_mode.as_deref(), Some("afrs"));

        let bad = Params { calibration_timeout_s: Some(0.0), ..params };
        assert!(bad.validate().is_err());
    }
}
