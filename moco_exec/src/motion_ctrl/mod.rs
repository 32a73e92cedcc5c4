//! # Motion control module
//!
//! The motion controller is the top level of the motion core. It owns the
//! steering and heading controllers and the speed ladder, and routes every
//! inbound message to exactly one handler through `dispatch`. Once a message
//! has been handled it is passed on to the message forwarder, if one is
//! attached.
//!
//! Lifecycle is `new` -> `enable` -> (`dispatch`)* -> `disable` -> `close`.
//! Enabling optionally waits for the push button and calibrates the IMU.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod dispatch;
mod params;
mod speed;
mod state;
mod tasks;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::time::Duration;

pub use params::Params;
pub use state::*;
pub use tasks::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Name of the motion controller's state change callback.
pub const STATE_CHANGE_CALLBACK: &str = "motion_ctrl";

/// Speed deltas from the analog stick smaller than this are ignored.
pub const SPEED_DELTA_TOL: f64 = 1e-2;

/// Raw analog stick value at rest.
pub const RAW_AXIS_CENTRE: i32 = 127;

/// Raw analog stick units per speed increment.
pub const RAW_AXIS_PER_INCREMENT: f64 = 16.0;

/// Largest speed increment from the analog stick.
pub const MAX_SPEED_INCREMENT: f64 = 7.0;

/// Push button poll period while waiting for a press.
const PUSH_BUTTON_PRESS_POLL: Duration = Duration::from_millis(100);

/// Push button poll period while waiting for the release.
const PUSH_BUTTON_RELEASE_POLL: Duration = Duration::from_millis(50);

// ---------------------------------------------------------------------------
// TEST SUPPORT
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod test_util {
    use super::*;
    use crate::head_ctrl;
    use crate::sim::{self, SimEquipment};
    use crate::steer_ctrl;

    /// Parameters with every delay cut down.
    pub fn fast_params() -> (Params, steer_ctrl::Params, head_ctrl::Params) {
        (
            Params {
                push_button_debounce_s: 0.0,
                calibration_poll_hz: 1000.0,
                ..Default::default()
            },
            steer_ctrl::Params {
                initial_reposition_delay_s: 0.0,
                reposition_duration_s: 0.01,
                reposition_steps: 2,
                ..Default::default()
            },
            head_ctrl::Params {
                settle_delay_s: 0.0,
                loop_rate_hz: 500.0,
                ..Default::default()
            }
        )
    }

    pub fn build(sim_params: sim::Params) -> (SimEquipment, MotionCtrl) {
        let sim = SimEquipment::new(&sim_params);
        let (params, steer_params, head_params) = fast_params();
        let ctrl = MotionCtrl::new(params, steer_params, head_params, sim.equipment())
            .unwrap();

        (sim, ctrl)
    }
}
