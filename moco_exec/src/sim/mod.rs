//! # Simulated equipment
//!
//! In-process implementations of every equipment trait, used by the
//! executable when no hardware is present and by the unit tests.
//!
//! The drivetrain holds four motors, port and starboard, fore and aft. The
//! IMU heading integrates the difference between the port and starboard
//! output speeds each time it is polled, so rotating the robot through the
//! drivetrain moves the simulated heading.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod drivetrain;
mod imu;
mod periph;
mod servos;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::Arc;

use serde::Deserialize;

use crate::eqpt::Equipment;
use crate::motion_ctrl::Task;

pub use drivetrain::*;
pub use imu::*;
pub use periph::*;
pub use servos::*;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Simulated equipment parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Units: degrees
    pub imu_initial_heading_deg: f64,

    /// Heading rate when the port side runs at full speed forward and the
    /// starboard side at full speed backward.
    ///
    /// Units: degrees/second
    pub imu_rotation_rate_deg_s: f64,

    /// Simulated time between two IMU polls.
    ///
    /// Units: seconds
    pub imu_poll_dt_s: f64,

    /// Verdict reached by calibration
    pub imu_calibrates: bool,

    /// Number of calibration state queries before the verdict is reached
    pub imu_calibration_polls: usize,

    /// Value of the manual speed source, [0, 1]
    pub manual_speed: f64,

    /// Number of push button polls before the button is pressed
    pub button_press_after_polls: usize,

    /// Number of polls the button stays pressed for
    pub button_hold_polls: usize,

    /// Task selected on the task selector
    pub selected_task: Task,
}

/// Every simulated collaborator, wired together.
pub struct SimEquipment {
    pub drivetrain: Arc<SimDrivetrain>,
    pub servos: Arc<SimServos>,
    pub imu: Arc<SimImu>,
    pub manual_speed: Arc<FixedManualSpeed>,
    pub stop_handler: Arc<SimStopHandler>,
    pub push_button: Arc<SimPushButton>,
    pub task_selector: Arc<FixedTaskSelector>,
    pub forwarder: Arc<RecordingForwarder>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            imu_initial_heading_deg: 0.0,
            imu_rotation_rate_deg_s: 90.0,
            imu_poll_dt_s: 0.05,
            imu_calibrates: true,
            imu_calibration_polls: 0,
            manual_speed: 0.5,
            button_press_after_polls: 0,
            button_hold_polls: 1,
            selected_task: Task::Announce,
        }
    }
}

impl SimEquipment {
    pub fn new(params: &Params) -> Self {
        let drivetrain = Arc::new(SimDrivetrain::new());

        Self {
            servos: Arc::new(SimServos::new()),
            imu: Arc::new(SimImu::new(params, drivetrain.clone())),
            manual_speed: Arc::new(FixedManualSpeed::new(params.manual_speed)),
            stop_handler: Arc::new(SimStopHandler::new(drivetrain.clone())),
            push_button: Arc::new(SimPushButton::new(
                params.button_press_after_polls, 
                params.button_hold_polls
            )),
            task_selector: Arc::new(FixedTaskSelector::new(params.selected_task)),
            forwarder: Arc::new(RecordingForwarder::default()),
            drivetrain,
        }
    }

    /// The collaborator set handed to the motion controller.
    pub fn equipment(&self) -> Equipment {
        Equipment {
            motors: self.drivetrain.clone(),
            servos: self.servos.clone(),
            stop_handler: self.stop_handler.clone(),
            imu: Some(self.imu.clone()),
            manual_speed: Some(self.manual_speed.clone()),
            push_button: Some(self.push_button.clone()),
            task_selector: Some(self.task_selector.clone()),
            forwarder: Some(self.forwarder.clone()),
        }
    }
}
