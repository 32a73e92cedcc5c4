//! Heading control parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use crate::MotionError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for heading control
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    /// Time to wait after each steering mode change before driving.
    ///
    /// Units: seconds
    pub settle_delay_s: f64,

    /// Control loop rate.
    ///
    /// Units: Hertz
    pub loop_rate_hz: f64,

    /// The loop ends once the heading error is smaller than this.
    ///
    /// Units: degrees
    pub tolerance_deg: f64,

    /// Commanded speeds smaller than this are sent as zero.
    pub zero_speed_tol: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    pub fn validate(&self) -> Result<(), MotionError> {
        if !(self.loop_rate_hz > 0.0) {
            return Err(MotionError::InvalidConfiguration(format!(
                "heading loop rate must be positive, got {}", self.loop_rate_hz
            )));
        }

        if !(self.tolerance_deg > 0.0) || self.tolerance_deg >= 180.0 {
            return Err(MotionError::InvalidConfiguration(format!(
                "heading tolerance must be in (0, 180), got {}", self.tolerance_deg
            )));
        }

        if self.settle_delay_s < 0.0 || self.zero_speed_tol < 0.0 {
            return Err(MotionError::InvalidConfiguration(
                "heading settle delay and zero speed tolerance cannot be negative".into()
            ));
        }

        Ok(())
    }
}

impl Default for Params {
    fn default() -> Self {
        Self {
            settle_delay_s: 3.0,
            loop_rate_hz: 20.0,
            tolerance_deg: 1.0,
            zero_speed_tol: 1e-4,
        }
    }
}
