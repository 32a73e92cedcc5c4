//! Parameters structure for SteerCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use crate::MotionError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for steering control.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {

    // ---- GEOMETRY ----

    /// Distance between the fore and aft axles.
    ///
    /// Units: millimeters
    pub wheel_base_mm: f64,

    /// Distance between the port and starboard wheels.
    ///
    /// Units: millimeters
    pub wheel_track_mm: f64,

    /// Offset of the wheel contact patch from the steering pivot.
    ///
    /// Units: millimeters
    pub wheel_offset_mm: f64,

    // ---- AFRS ----

    /// Maximum inner steering angle, applied symmetrically about zero.
    ///
    /// Units: degrees
    pub afrs_max_angle_deg: f64,

    /// Speed ratio of the inner motors at the maximum turn.
    pub afrs_max_ratio: f64,

    // ---- REPOSITION ----

    /// Delay between starting the motor ramp and commanding the servos.
    ///
    /// Units: seconds
    pub initial_reposition_delay_s: f64,

    /// Total duration of the motor ramp, up and back down.
    ///
    /// Units: seconds
    pub reposition_duration_s: f64,

    /// Number of speed steps in each half of the ramp.
    pub reposition_steps: usize,

    /// Speed at the bottom of the ramp, the least speed that moves the
    /// wheels.
    pub reposition_min_speed: f64,

    /// Speed at the top of the ramp.
    pub reposition_max_speed: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Check the parameters describe a usable vehicle.
    pub fn validate(&self) -> Result<(), MotionError> {
        let invalid = |msg: &str| Err(MotionError::InvalidConfiguration(msg.to_string()));

        if !(self.wheel_base_mm > 0.0) || !(self.wheel_track_mm > 0.0) {
            return invalid("wheel base and wheel track must be positive");
        }
        if !(self.wheel_offset_mm >= 0.0) {
            return invalid("wheel offset must not be negative");
        }
        if !(self.afrs_max_angle_deg > 0.0 && self.afrs_max_angle_deg < 90.0) {
            return invalid("AFRS max angle must be in (0, 90) degrees");
        }
        if !(self.afrs_max_ratio > 0.0) {
            return invalid("AFRS max ratio must be positive");
        }
        if self.reposition_steps == 0 {
            return invalid("reposition step count must be at least one");
        }
        if !(self.reposition_duration_s >= 0.0) || !(self.initial_reposition_delay_s >= 0.0) {
            return invalid("reposition timings must not be negative");
        }
        if !(self.reposition_min_speed >= 0.0 && self.reposition_min_speed <= self.reposition_max_speed)
            || self.reposition_max_speed > 1.0
        {
            return invalid("reposition speeds must satisfy 0 <= min <= max <= 1");
        }

        Ok(())
    }

    /// Half the wheel base
    pub fn half_length_mm(&self) -> f64 {
        self.wheel_base_mm / 2.0
    }

    /// Half the wheel track
    pub fn half_width_mm(&self) -> f64 {
        self.wheel_track_mm / 2.0
    }
}

impl Default for Params {
    fn default() -> Self {
        Self {
            wheel_base_mm: 180.0,
            wheel_track_mm: 200.0,
            wheel_offset_mm: 30.0,
            afrs_max_angle_deg: 45.0,
            afrs_max_ratio: 0.36016,
            initial_reposition_delay_s: 0.2,
            reposition_duration_s: 3.4,
            reposition_steps: 10,
            reposition_min_speed: 0.09,
            reposition_max_speed: 0.21,
        }
    }
}
